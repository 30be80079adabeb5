//! Event line tokenization and decoding.
//!
//! A program line such as
//! `ore 15.00 riscaldamento - ore 15.30 400 SL - staff 4x50 MI fuori gara`
//! is split into atomic tokens (time markers, warmups, events), and each
//! event token is decoded into an [`EventDescriptor`].

use std::sync::LazyLock;

use meet_types::{EventDescriptor, HeatType, StyleCode};
use regex::Regex;
use tracing::debug;

use crate::classifier::{DISTANCE_UNIT, contains_relay_event, style_alternation};

const WARMUP_TOKEN: &str = "Riscaldamento";

// ── Patterns ─────────────────────────────────────────────────────────

/// Capacity asides that are never tokens: "( Massimo 64 iscritti )", "max 88 partecipanti".
static CAPACITY_ASIDES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\(\s*[^()]*?\b(?:iscritti|partecipanti|atleti)\b[^()]*\)",
        r"(?i)\b(?:max\.?|massimo)\s*\d+\s*(?:iscritti|partecipanti|atleti)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("capacity aside"))
    .collect()
});

const OUT_OF_RACE_SUFFIX: &str = r"(?:\s*\(?\s*(?:fuori\s+gara|f\.\s?g\.?)\s*\)?)?";

/// One alternation per token kind, tried leftmost-first.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let styles = style_alternation();
    let pattern = format!(
        concat!(
            r"(?i)(?P<time>\bore\s*:?\s*\d{{1,2}}[.:\s]\d{{2}}\b)",
            r"|(?P<warmup>\briscaldamento\b)",
            r"|(?P<relay>(?:\b(?:mi)?staff(?:etta|\.)?\s*\d{{1,2}}|\b[48])\s*[x×]\s*\d{{2,4}}\s*{unit}\s*(?:{styles})\b{oor})",
            r"|(?P<event>\b\d{{2,4}}\s*{unit}\s*(?:{styles})\b{oor})",
        ),
        unit = DISTANCE_UNIT,
        styles = styles,
        oor = OUT_OF_RACE_SUFFIX,
    );
    Regex::new(&pattern).expect("event token")
});

static STYLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|[^\d])\d{{2,4}}\s*{DISTANCE_UNIT}\s*({})\b",
        style_alternation()
    ))
    .expect("style token")
});

static BARE_STYLE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", style_alternation())).expect("bare style word")
});

/// Everything up to and including the leg-count marker of a relay.
static RELAY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.*?\d+\s*[x×]\s*").expect("relay prefix"));

static RELAY_LEGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[xX×]\s*\d").expect("relay legs"));

static LEADING_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("leading int"));

static OUT_OF_RACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfuori\s+gara\b|\bf\.\s?g\b").expect("out of race")
});

static FINALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfinal[ei]\b").expect("finals"));

// ── Tokenizer ────────────────────────────────────────────────────────

/// Split one program line into its atomic tokens, in source order.
///
/// Time markers are returned as written ("ore 15.30"), warmups as
/// `"Riscaldamento"`, events with any trailing out-of-race marker attached.
/// Separators (` - `, whitespace runs) and capacity asides are dropped.
pub fn event_line_token_splitter(line: &str) -> Vec<String> {
    let mut cleaned = line.to_string();
    for aside in CAPACITY_ASIDES.iter() {
        cleaned = aside.replace_all(&cleaned, " ").into_owned();
    }

    TOKEN
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            if caps.name("warmup").is_some() {
                return Some(WARMUP_TOKEN.to_string());
            }
            let m = caps
                .name("time")
                .or_else(|| caps.name("relay"))
                .or_else(|| caps.name("event"))?;
            Some(collapse_whitespace(m.as_str()))
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_warmup_token(token: &str) -> bool {
    token == WARMUP_TOKEN
}

// ── Field extraction ─────────────────────────────────────────────────

/// Two-letter style token with the casing of the source word.
///
/// "50 SL" → "SL", "100 stile" → "st", "200 Dorso" → "Do".
pub fn extract_style_token(event_text: &str) -> Option<String> {
    let caps = STYLE_TOKEN
        .captures(event_text)
        .or_else(|| BARE_STYLE_WORD.captures(event_text))?;
    let word = caps.get(1)?.as_str();
    Some(word.chars().take(2).collect())
}

/// Leading distance of the event once the relay prefix and the style token are removed.
pub fn parse_event_length_in_meters(event_text: &str, style_token: &str) -> Option<u32> {
    let rest = RELAY_PREFIX.replace(event_text, "");
    let head = match rest.find(style_token) {
        Some(idx) => &rest[..idx],
        None => &rest[..],
    };
    LEADING_INT.find(head)?.as_str().parse().ok()
}

/// Legs of a relay, 1 for individual events. Relays with no readable leg count get 4.
pub fn parse_event_relay_phases(event_text: &str, is_relay: bool) -> u32 {
    if !is_relay {
        return 1;
    }
    RELAY_LEGS
        .captures(event_text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(4)
}

pub fn is_out_of_race(event_text: &str) -> bool {
    OUT_OF_RACE.is_match(event_text)
}

/// Heat type announced on a line: finals when "finali"/"finale" appears.
pub fn heat_type_of_line(line: &str) -> HeatType {
    if FINALS.is_match(line) {
        HeatType::Finals
    } else {
        HeatType::Heats
    }
}

/// Decode an event token. Tokens without a readable stroke or distance yield `None`.
pub fn decode_event(token: &str, heat_type: HeatType) -> Option<EventDescriptor> {
    let is_relay = contains_relay_event(token);
    let style_token = extract_style_token(token)?;
    let Some(style) = StyleCode::from_token(&style_token) else {
        debug!(token, style_token, "unknown style token");
        return None;
    };
    let length_in_meters = parse_event_length_in_meters(token, &style_token)?;

    Some(EventDescriptor {
        style,
        length_in_meters,
        is_relay,
        relay_phases: parse_event_relay_phases(token, is_relay),
        heat_type,
        out_of_race: is_out_of_race(token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_splitter_mixed_line() {
        let line = "ore 15.00 riscaldamento - ore 15.30 400 SL - 100 DO ( Massimo 64 iscritti ) - staff 4x50 MI fuori gara";
        assert_eq!(
            event_line_token_splitter(line),
            vec![
                "ore 15.00",
                "Riscaldamento",
                "ore 15.30",
                "400 SL",
                "100 DO",
                "staff 4x50 MI fuori gara",
            ]
        );
    }

    #[test]
    fn test_token_splitter_whitespace_runs_and_asides() {
        let line = "50 farfalla      200 misti    max 88 partecipanti   8x50 sl";
        assert_eq!(
            event_line_token_splitter(line),
            vec!["50 farfalla", "200 misti", "8x50 sl"]
        );
    }

    #[test]
    fn test_token_splitter_empty() {
        assert!(event_line_token_splitter("Iscrizioni entro il 10").is_empty());
    }

    #[test]
    fn test_extract_style_token_case() {
        assert_eq!(extract_style_token("50 SL").as_deref(), Some("SL"));
        assert_eq!(extract_style_token("100 stile").as_deref(), Some("st"));
        assert_eq!(extract_style_token("staff 4x50 MI").as_deref(), Some("MI"));
        assert_eq!(extract_style_token("200 Dorso").as_deref(), Some("Do"));
        assert_eq!(extract_style_token("100 m. rana").as_deref(), Some("ra"));
        assert_eq!(extract_style_token("1500mt Stile Libero").as_deref(), Some("St"));
        assert_eq!(extract_style_token("ore 9.30"), None);
    }

    #[test]
    fn test_parse_event_length_in_meters() {
        assert_eq!(parse_event_length_in_meters("400 SL", "SL"), Some(400));
        assert_eq!(parse_event_length_in_meters("staff 4x50 MI", "MI"), Some(50));
        assert_eq!(parse_event_length_in_meters("8 x 100 sl", "sl"), Some(100));
        assert_eq!(parse_event_length_in_meters("100 m. dorso", "do"), Some(100));
        assert_eq!(parse_event_length_in_meters("dorso", "do"), None);
    }

    #[test]
    fn test_parse_event_relay_phases() {
        assert_eq!(parse_event_relay_phases("staff 4x50 sl", true), 4);
        assert_eq!(parse_event_relay_phases("50 SL", false), 1);
        assert_eq!(parse_event_relay_phases("8x50 sl", true), 8);
        assert_eq!(parse_event_relay_phases("staff 10 X 100 sl", true), 10);
    }

    #[test]
    fn test_decode_event() {
        let relay = decode_event("staff 4x50 MI f.g.", HeatType::Heats).unwrap();
        assert_eq!(relay.style, StyleCode::Medley);
        assert_eq!(relay.length_in_meters, 50);
        assert!(relay.is_relay);
        assert_eq!(relay.relay_phases, 4);
        assert!(relay.out_of_race);

        let single = decode_event("200 farfalla", HeatType::Finals).unwrap();
        assert_eq!(single.style, StyleCode::Butterfly);
        assert_eq!(single.length_in_meters, 200);
        assert!(!single.is_relay);
        assert_eq!(single.relay_phases, 1);
        assert_eq!(single.heat_type, HeatType::Finals);
        assert!(!single.out_of_race);
    }

    #[test]
    fn test_heat_type_of_line() {
        assert_eq!(heat_type_of_line("ore 17.00 Finali 100 SL"), HeatType::Finals);
        assert_eq!(heat_type_of_line("ore 9.00 batterie 100 SL"), HeatType::Heats);
    }
}
