//! Line-level predicates over announcement text.
//!
//! Every predicate is a [`RuleTable`]: a list of accepting patterns and a
//! list of rejecting ones, built from the static word tables below. The
//! predicates are independent filters, not a state machine; the parser
//! combines them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

// ── Word tables ──────────────────────────────────────────────────────

pub const MONTHS: &[&str] = &[
    "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
    "settembre", "ottobre", "novembre", "dicembre",
];

/// Two-letter stroke codes as they appear in programs.
pub const STYLE_CODES: &[&str] = &["sl", "do", "ra", "fa", "df", "dl", "mi", "mx"];

/// Full Italian stroke names.
pub const STYLE_WORDS: &[&str] = &[
    "stile libero", "stile", "dorso", "rana", "farfalla", "delfino", "misti", "misto", "mista",
];

/// Optional distance unit between a distance and its stroke ("50 m.", "100mt", "200 metri").
pub const DISTANCE_UNIT: &str = r"(?:metri|mt|m)?\.?";

/// Relay word prefixes ("staff", "staffetta", "mistaffetta").
const RELAY_PREFIX: &str = r"(?:mi)?staff(?:etta|\.)?";

const RECURRING_RELAY_LEGS: &str = "[48]";

/// Nouns introducing a facility. Weak ones ("vasca", "impianto") are also used
/// for course descriptions and only count when a proper name follows.
const POOL_KEYWORDS: &[(&str, KeywordStrength)] = &[
    ("piscina", KeywordStrength::Strong),
    ("piscine", KeywordStrength::Strong),
    ("stadio del nuoto", KeywordStrength::Strong),
    ("polo natatorio", KeywordStrength::Strong),
    ("centro natatorio", KeywordStrength::Strong),
    ("palazzetto del nuoto", KeywordStrength::Strong),
    ("centro sportivo", KeywordStrength::Strong),
    ("complesso", KeywordStrength::Strong),
    ("vasca", KeywordStrength::Weak),
    ("impianto", KeywordStrength::Weak),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordStrength {
    Strong,
    Weak,
}

/// Build a regex alternation, longest entry first so longer words win.
pub fn alternation(words: &[&str]) -> String {
    let mut all: Vec<String> = words
        .iter()
        .map(|w| regex::escape(w).replace(' ', r"\s+"))
        .collect();
    all.sort_by_key(|w| std::cmp::Reverse(w.len()));
    all.dedup();
    all.join("|")
}

/// Alternation of every accepted stroke spelling (names and codes).
pub fn style_alternation() -> String {
    let mut all: Vec<&str> = STYLE_WORDS.to_vec();
    all.extend_from_slice(STYLE_CODES);
    alternation(&all)
}

// ── Rule tables ──────────────────────────────────────────────────────

/// A predicate expressed as data: true when any `accept` pattern matches
/// and no `reject` pattern does.
pub struct RuleTable {
    accept: Vec<Regex>,
    reject: Vec<Regex>,
}

impl RuleTable {
    fn build(accept: &[String], reject: &[String]) -> Self {
        let compile = |p: &String| Regex::new(p).expect("classifier rule");
        RuleTable {
            accept: accept.iter().map(compile).collect(),
            reject: reject.iter().map(compile).collect(),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.accept.iter().any(|re| re.is_match(line))
            && !self.reject.iter().any(|re| re.is_match(line))
    }

    /// First capture set produced by an accepting pattern.
    fn captures<'h>(&self, line: &'h str) -> Option<regex::Captures<'h>> {
        if self.reject.iter().any(|re| re.is_match(line)) {
            return None;
        }
        self.accept.iter().find_map(|re| re.captures(line))
    }
}

static DATE_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    RuleTable::build(
        &[format!(
            r"(?i)\b(\d{{1,2}})\s*(?:°|º)?\s*({})\b",
            alternation(MONTHS)
        )],
        &[],
    )
});

static TIME_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    RuleTable::build(&[r"(?i)\bore\s*:?\s*(\d{1,2})[.:\s](\d{2})\b".to_string()], &[])
});

static STYLE_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    let styles = style_alternation();
    RuleTable::build(
        &[
            format!(r"(?i)(?:^|[^\d])\d{{2,4}}\s*{DISTANCE_UNIT}\s*(?:{styles})\b"),
            format!(r"(?i)(?:^|[^\d])\d{{2,4}}(?:{})\b", alternation(STYLE_CODES)),
        ],
        &[],
    )
});

static RELAY_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    let styles = style_alternation();
    RuleTable::build(
        &[
            format!(
                r"(?i){RELAY_PREFIX}\s*\d{{1,2}}\s*[x×]\s*\d{{2,4}}\s*{DISTANCE_UNIT}\s*(?:{styles})\b"
            ),
            format!(
                r"(?i)(?:^|[^\d]){RECURRING_RELAY_LEGS}\s*[x×]\s*\d{{2,4}}\s*{DISTANCE_UNIT}\s*(?:{styles})\b"
            ),
        ],
        &[],
    )
});

static FOOTNOTE_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    RuleTable::build(
        &[r"^\s*(?:\*{1,3}|\(\s*(?:[a-zA-Z]|\d{1,2}|[ivxIVX]{1,4}|\*{1,3})\s*\))".to_string()],
        &[],
    )
});

static WARMUP_RULES: LazyLock<RuleTable> =
    LazyLock::new(|| RuleTable::build(&[r"(?i)\briscaldamento\b".to_string()], &[]));

static SKIPPABLE_RULES: LazyLock<RuleTable> = LazyLock::new(|| {
    RuleTable::build(
        &[
            r"(?i)cronometraggio\s+(?:semi-?)?(?:automatico|manuale|elettronico)".to_string(),
            r"(?i)\b\d{1,2}\s+corsie\b".to_string(),
            r"(?i)\bpiastre\b".to_string(),
            r"(?i)\btemp[oi]\s+limite\b".to_string(),
        ],
        &[],
    )
});

struct PoolKeyword {
    re: Regex,
    strength: KeywordStrength,
}

static POOL_KEYWORD_RULES: LazyLock<Vec<PoolKeyword>> = LazyLock::new(|| {
    POOL_KEYWORDS
        .iter()
        .map(|(word, strength)| PoolKeyword {
            re: Regex::new(&format!(r"(?i)\b{}\b", alternation(&[*word]))).expect("pool keyword"),
            strength: *strength,
        })
        .collect()
});

/// "da 50 metri", "coperta 25 mt": a course length, not a facility.
static MEASUREMENT_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:coperta|scoperta|olimpionica|esterna|interna|corta|lunga)\s+)?(?:da\s+)?\d{2}\s*(?:metri|mt|m)\b",
    )
    .expect("measurement tail")
});

/// A proper name after a weak keyword ("Impianto Sportivo Felice Pirola").
static NAMING_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:[:\-–,]\s*)?(?:(?i:sportivo|natatorio|comunale|polivalente|di|del|della|dello|dei|degli)\s+)*["“«]?\p{Lu}"#,
    )
    .expect("naming tail")
});

// ── Predicates ───────────────────────────────────────────────────────

/// A 1–2 digit day followed by an Italian month name.
pub fn contains_date(line: &str) -> bool {
    DATE_RULES.matches(line)
}

/// "ore" followed by H.MM, H:MM or H MM.
pub fn contains_time(line: &str) -> bool {
    TIME_RULES.matches(line)
}

/// A distance followed by a stroke code or name.
pub fn contains_style(line: &str) -> bool {
    STYLE_RULES.matches(line)
}

/// A leg-count marker (`4x50`) followed by distance and stroke. Bare leg
/// counts without a relay word only count for 4 or 8 legs.
pub fn contains_relay_event(line: &str) -> bool {
    RELAY_RULES.matches(line)
}

pub fn contains_individual_event(line: &str) -> bool {
    contains_style(line) && !contains_relay_event(line)
}

/// A facility noun that is not just introducing a course length.
pub fn contains_pool(line: &str) -> bool {
    POOL_KEYWORD_RULES.iter().any(|kw| {
        kw.re.find_iter(line).any(|m| {
            let tail = &line[m.end()..];
            if MEASUREMENT_TAIL.is_match(tail) {
                return false;
            }
            match kw.strength {
                KeywordStrength::Strong => true,
                KeywordStrength::Weak => NAMING_TAIL.is_match(tail),
            }
        })
    })
}

/// A leading footnote marker: `*`, `**`, `(a)`, `(1)`, `(i)`, `(*)`.
pub fn contains_footnote(line: &str) -> bool {
    FOOTNOTE_RULES.matches(line)
}

pub fn contains_warmup(line: &str) -> bool {
    WARMUP_RULES.matches(line)
}

/// Timing and logistics boilerplate that may carry digits looking like events.
pub fn contains_skippable_text(line: &str) -> bool {
    SKIPPABLE_RULES.matches(line)
}

// ── Token extraction shared with the parser ──────────────────────────

/// Day and month tokens of the first date on the line, as written.
pub fn find_date(line: &str) -> Option<(String, String)> {
    let caps = DATE_RULES.captures(line)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

/// Hour and minute of the first "ore H.MM" marker on the line.
pub fn find_time(line: &str) -> Option<(u32, u32)> {
    let caps = TIME_RULES.captures(line)?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    Some((hour, minute))
}

/// 1-based month number for an Italian month name.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

// ── Program filter ───────────────────────────────────────────────────

/// All predicate results for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LineClass {
    pub date: bool,
    pub time: bool,
    pub style: bool,
    pub relay: bool,
    pub pool: bool,
    pub footnote: bool,
    pub warmup: bool,
    pub skippable: bool,
}

impl LineClass {
    pub fn of(line: &str) -> Self {
        LineClass {
            date: contains_date(line),
            time: contains_time(line),
            style: contains_style(line),
            relay: contains_relay_event(line),
            pool: contains_pool(line),
            footnote: contains_footnote(line),
            warmup: contains_warmup(line),
            skippable: contains_skippable_text(line),
        }
    }

    pub fn has_event(&self) -> bool {
        (self.style || self.relay) && !self.skippable
    }

    /// Whether the line survives the noise-reduction pass.
    pub fn is_program_line(&self) -> bool {
        self.pool || self.date || self.time || self.has_event() || self.footnote
    }
}

/// Lines of the announcement worth handing to the parser, trimmed, in order.
pub fn get_filtered_program_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| LineClass::of(l).is_program_line())
}
