//! Pool description extraction and decomposition.

use std::sync::LazyLock;

use meet_types::{PoolDescriptor, PoolType};
use regex::Regex;

use crate::classifier::{LineClass, contains_pool};
use crate::splitter::split_words;
use crate::subtract::subtract_set_behaviour;

pub const DEFAULT_LANES: u32 = 8;

// ── Patterns ─────────────────────────────────────────────────────────
//
// Real program examples:
//   Piscina Comunale "Darsena", via Pirandello 13 - Ravenna
//   presso la Piscina Comunale G. Facci di Ravenna, via Staffoli,16. Caratteristiche dell'impianto: vasca coperta da 25 mt, 8 corsie
//   Stadio del Nuoto di Riccione, viale Monteverdi n° 4
//   Piscina:
//   Centro Sportivo Record, via dei Sabbioni 8 - Bologna

/// Generic nouns that introduce the facility name but are not part of it.
static LEADING_NOUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:piscin[ae]|vasca|impianto)\b").expect("leading noun"));

static PRESSO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpresso\b").expect("presso"));

static LEADING_CONNECTIVES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[\s:,\-–]|(?:presso|di|del|della|dello|dei|degli|sit[ao]\s+in|in|denominat[ao])(?:\s+|$))*",
    )
    .expect("leading connectives")
});

/// Start of the trailing characteristics boilerplate.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)caratteristiche|\bvasca\b|\b\d{1,2}\s*corsie\b|cronometraggio|\bpiastre\b",
    )
    .expect("boilerplate")
});

static STREET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s,])(?:via|viale|v\.le|piazza|p\.zza|p\.za|piazzale|corso|c\.so|contrada|c\.da|lungarno|lungomare|circonvallazione|largo|vicolo|strada|località|localita|loc\.)(?:\s|$)",
    )
    .expect("street marker")
});

/// " - Ravenna" after the address.
static TRAILING_PLACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[-–]\s").expect("trailing place"));

/// "n°", "n.", "numero" before a house number, with the punctuation preceding it.
static NUMERO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(,\s*|\s+)(?:n°|nº|n\.|nr\.?|numero)\s*(\d+)").expect("numero")
});

/// A street name ending in a bare house number ("n. 4" is not a street).
static STREET_WITH_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\p{L}{2}.*?)\s+(\d+[a-zA-Z]?(?:/\w+)?)$").expect("street with number")
});

static POOL_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:vasca|piscina)\s+(?:(?:coperta|scoperta|olimpionica|esterna|interna)\s+)?(?:da\s+)?(\d{2})\s*(?:mt|metri|m)\b",
    )
    .expect("pool type")
});

static LANES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*corsie\b").expect("lanes"));

/// Words dropped from facility names before the city is subtracted.
const NAME_STOP_WORDS: &[&str] = &[
    "di", "del", "della", "dello", "dei", "degli", "delle", "presso", "sito", "sita", "in",
    "denominata", "denominato", "la", "il", "lo",
];

const MIN_NAME_CHARS: usize = 3;

// ── Fragment detection ───────────────────────────────────────────────

/// Decide whether `line` introduces the pool and return the fragment describing it.
///
/// A facility-keyword line is returned as is, or joined with the following
/// line when it holds nothing but the keyword ("Piscina:"). A line without
/// keywords qualifies only as the single street-address line preceding the
/// first date, time or event line.
pub fn extract_possible_pool_definition(full_text: &str, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if contains_pool(line) {
        if get_filtered_pool_data_text(line).chars().count() >= MIN_NAME_CHARS {
            return Some(line.to_string());
        }
        let next = full_text
            .lines()
            .map(str::trim)
            .skip_while(|l| *l != line)
            .skip(1)
            .find(|l| !l.is_empty())?;
        return Some(format!("{line} {next}"));
    }

    let preamble: Vec<&str> = full_text
        .lines()
        .map(str::trim)
        .take_while(|l| {
            let class = LineClass::of(l);
            !(class.date || class.time || class.has_event())
        })
        .filter(|l| STREET_MARKER.is_match(l))
        .collect();
    (preamble.len() == 1 && preamble[0] == line).then(|| line.to_string())
}

// ── Decomposition ────────────────────────────────────────────────────

/// Cut a facility sentence down to the pool clause: from the first name
/// component up to the characteristics boilerplate.
pub fn get_filtered_pool_data_text(text: &str) -> String {
    let start = LEADING_NOUN
        .find(text)
        .or_else(|| PRESSO.find(text))
        .map(|m| m.end())
        .unwrap_or(0);
    let rest = &text[start..];
    let rest = &rest[LEADING_CONNECTIVES.find(rest).map(|m| m.end()).unwrap_or(0)..];

    let mut end = BOILERPLATE.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    if let Some(open) = unmatched_open_paren(&rest[..end]) {
        end = open;
    }

    rest[..end]
        .trim_end_matches(|c: char| c.is_whitespace() || ",.;:-–(".contains(c))
        .trim()
        .to_string()
}

/// Byte offset of the first '(' never closed afterwards.
fn unmatched_open_paren(text: &str) -> Option<usize> {
    let mut open: Vec<usize> = Vec::new();
    for (idx, c) in text.char_indices() {
        match c {
            '(' => open.push(idx),
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }
    open.first().copied()
}

fn split_name_and_address(filtered: &str) -> (&str, &str) {
    match STREET_MARKER.find(filtered) {
        Some(m) => {
            let marker = m.as_str();
            let leading = marker.len()
                - marker
                    .trim_start_matches(|c: char| c.is_whitespace() || c == ',')
                    .len();
            let boundary = m.start() + leading;
            (&filtered[..boundary], &filtered[boundary..])
        }
        None => (filtered, ""),
    }
}

/// Facility-name words, generic connectives and the city removed.
pub fn parse_pool_name_tokens(filtered: &str, city: &str) -> Vec<String> {
    let (name, _) = split_name_and_address(filtered);
    let words: Vec<String> = split_words(name)
        .into_iter()
        .filter(|w| !NAME_STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    if city.trim().is_empty() {
        return words;
    }
    subtract_set_behaviour(&words, &[city])
}

/// Street and house-number components: "Via Pirandello 13" → `["Via Pirandello", "13"]`.
///
/// "n°"/"n."/"numero" become "n. N" after a comma and a bare number otherwise.
pub fn parse_pool_address_tokens(filtered: &str) -> Vec<String> {
    let (_, address) = split_name_and_address(filtered);
    let address = match TRAILING_PLACE.find(address) {
        Some(m) => &address[..m.start()],
        None => address,
    };
    let address = NUMERO.replace_all(address, |caps: &regex::Captures| {
        if caps[1].contains(',') {
            format!(", n. {}", &caps[2])
        } else {
            format!(" {}", &caps[2])
        }
    });

    let mut tokens = Vec::new();
    for segment in address.split(',') {
        let segment = segment.trim().trim_end_matches(['.', ';', ':']).trim();
        if segment.is_empty() {
            continue;
        }
        match STREET_WITH_NUMBER.captures(segment) {
            Some(caps) => {
                tokens.push(caps[1].trim().to_string());
                tokens.push(caps[2].to_string());
            }
            None => tokens.push(segment.to_string()),
        }
    }
    tokens
}

/// Course length from "vasca [coperta] [da] NN mt"; unknown lengths yield `None`.
pub fn parse_pool_type(program_text: &str) -> Option<PoolType> {
    let caps = POOL_TYPE.captures(program_text)?;
    PoolType::from_length(caps[1].parse().ok()?)
}

fn lanes_in(text: &str) -> Option<u32> {
    LANES.captures(text)?[1].parse().ok()
}

/// "NN corsie", 8 when absent.
pub fn parse_pool_lanes_number(program_text: &str) -> u32 {
    lanes_in(program_text).unwrap_or(DEFAULT_LANES)
}

/// Decompose a pool fragment. Course length and lanes fall back to the whole program text.
pub fn parse_pool_descriptor(
    fragment: &str,
    city: &str,
    program_text: &str,
    default_lanes: u32,
) -> PoolDescriptor {
    let filtered = get_filtered_pool_data_text(fragment);
    PoolDescriptor {
        name_tokens: parse_pool_name_tokens(&filtered, city),
        address_tokens: parse_pool_address_tokens(&filtered),
        pool_type: parse_pool_type(fragment).or_else(|| parse_pool_type(program_text)),
        lanes_number: lanes_in(fragment)
            .or_else(|| lanes_in(program_text))
            .unwrap_or(default_lanes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACCI: &str = "presso la Piscina Comunale G. Facci di Ravenna, via Staffoli,16. Caratteristiche dell'impianto: vasca coperta da 25 mt, 8 corsie";

    #[test]
    fn test_filtered_pool_data_text() {
        assert_eq!(
            get_filtered_pool_data_text(FACCI),
            "Comunale G. Facci di Ravenna, via Staffoli,16"
        );
        assert_eq!(
            get_filtered_pool_data_text("Piscina di Cervia (vasca scoperta"),
            "Cervia"
        );
        assert_eq!(
            get_filtered_pool_data_text("Piscina (ex Bagni) Savio, via Sacca 2"),
            "(ex Bagni) Savio, via Sacca 2"
        );
    }

    #[test]
    fn test_name_tokens_subtract_city() {
        let filtered = get_filtered_pool_data_text(FACCI);
        assert_eq!(
            parse_pool_name_tokens(&filtered, "Ravenna"),
            vec!["Comunale", "G.", "Facci"]
        );
        assert_eq!(
            parse_pool_name_tokens("Comunale \"Darsena\", via Pirandello 13 - Ravenna", "Ravenna"),
            vec!["Comunale", "Darsena"]
        );
    }

    #[test]
    fn test_address_tokens() {
        assert_eq!(
            parse_pool_address_tokens("Comunale \"Darsena\", via Pirandello 13 - Ravenna"),
            vec!["via Pirandello", "13"]
        );
        assert_eq!(
            parse_pool_address_tokens("Comunale G. Facci, via Staffoli,16"),
            vec!["via Staffoli", "16"]
        );
        assert_eq!(
            parse_pool_address_tokens("Stadio del Nuoto, viale Monteverdi, n° 4"),
            vec!["viale Monteverdi", "n. 4"]
        );
        assert_eq!(
            parse_pool_address_tokens("Stadio del Nuoto, viale Monteverdi numero 4"),
            vec!["viale Monteverdi", "4"]
        );
        assert!(parse_pool_address_tokens("Stadio del Nuoto").is_empty());
    }

    #[test]
    fn test_pool_type_and_lanes() {
        assert_eq!(parse_pool_type(FACCI), Some(PoolType::Metres25));
        assert_eq!(parse_pool_type("Vasca 50 metri"), Some(PoolType::Metres50));
        assert_eq!(parse_pool_type("vasca da 40 metri"), None);
        assert_eq!(parse_pool_type("nessuna indicazione"), None);
        assert_eq!(parse_pool_lanes_number(FACCI), 8);
        assert_eq!(parse_pool_lanes_number("vasca da 50 m, 10 corsie"), 10);
        assert_eq!(parse_pool_lanes_number("nessuna indicazione"), DEFAULT_LANES);
    }

    #[test]
    fn test_extract_possible_pool_definition() {
        let text = "Piscina:\nCentro Sportivo Record, via dei Sabbioni 8 - Bologna\nSabato 12 marzo\n400 SL";
        assert_eq!(
            extract_possible_pool_definition(text, "Piscina:").as_deref(),
            Some("Piscina: Centro Sportivo Record, via dei Sabbioni 8 - Bologna")
        );

        let bare = "Trofeo dei Colli\nVia Roma 5, Cervia\nSabato 12 marzo\n400 SL";
        assert_eq!(
            extract_possible_pool_definition(bare, "Via Roma 5, Cervia").as_deref(),
            Some("Via Roma 5, Cervia")
        );

        let ambiguous = "Via Roma 5, Cervia\nVia Milano 3, Cesena\nSabato 12 marzo";
        assert_eq!(extract_possible_pool_definition(ambiguous, "Via Roma 5, Cervia"), None);
        assert_eq!(extract_possible_pool_definition(bare, "Trofeo dei Colli"), None);
    }

    #[test]
    fn test_pool_descriptor() {
        let pool = parse_pool_descriptor(FACCI, "Ravenna", "", DEFAULT_LANES);
        assert_eq!(pool.name(), "Comunale G. Facci");
        assert_eq!(pool.address(), "via Staffoli, 16");
        assert_eq!(pool.pool_type, Some(PoolType::Metres25));
        assert_eq!(pool.lanes_number, 8);
    }
}
