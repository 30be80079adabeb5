//! Canonical comparison keys for meeting titles, cities and pools.

use std::sync::LazyLock;

use meet_types::PoolType;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::classifier::alternation;

/// Words that carry no identity in a meeting title.
const TITLE_STOP_WORDS: &[&str] = &[
    "citta di", "citta", "meeting", "mtng", "trofeo", "tr", "memorial", "mem", "edizione",
];

/// Title words that turn a meeting into a territorial championship, with the
/// abbreviation that stands in for the city.
const SCOPE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("interregionali", "interreg"),
    ("regionali", "reg"),
    ("regionale", "reg"),
    ("provinciali", "prov"),
    ("provinciale", "prov"),
    ("distanze", "dist"),
];

const CHAMPIONSHIP_WORDS: &[&str] = &["campionati", "campionato"];

/// Italian regions as they appear in normalized titles.
const REGIONS: &[&str] = &[
    "abruzzo", "basilicata", "calabria", "campania", "emilia", "romagna", "friuli", "lazio",
    "liguria", "lombardia", "marche", "molise", "piemonte", "puglia", "sardegna", "sicilia",
    "toscana", "trentino", "umbria", "veneto", "aosta",
];

/// Facility types shortened in pool nicknames; an empty abbreviation drops the words.
const FACILITY_ABBREVIATIONS: &[(&str, &str)] = &[
    ("centro sportivo", "cs"),
    ("villaggio sportivo", "vs"),
    ("sport center", "sc"),
    ("circolo", ""),
];

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(?:\s*(?:°|º|ª|\^[ao]?)|[ao]\b)").expect("ordinal")
});

static ROMAN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ivx]{1,5}\s+\S").expect("roman prefix"));

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+").expect("leading integer"));

static STOP_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:{})\b\.?", alternation(TITLE_STOP_WORDS))).expect("stop words")
});

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\s*$").expect("trailing year"));

static ELIDED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"['’.]").expect("elided"));

static FACILITY_WORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    FACILITY_ABBREVIATIONS
        .iter()
        .map(|(words, abbr)| {
            let re = Regex::new(&format!(r"\b{}\b", alternation(&[*words]))).expect("facility");
            (re, *abbr)
        })
        .collect()
});

/// Lowercase and drop diacritics ("Città" → "citta").
pub fn fold(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded, alphanumeric-only key with no further stripping.
pub fn fold_key(s: &str) -> String {
    fold(s).chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Normalized form of a free-text name, words separated by single spaces.
///
/// "9° Trofeo Il Gabbiano" → "il gabbiano".
pub fn get_normalized_string(name: &str) -> String {
    let folded = fold(name);
    let without_ordinals = ORDINAL.replace_all(&folded, " ");
    let mut s = collapse_whitespace(&without_ordinals);

    if ROMAN_PREFIX.is_match(&s)
        && let Some((_, rest)) = s.split_once(' ')
    {
        s = rest.to_string();
    }
    s = LEADING_INT.replace(&s, "").into_owned();
    s = STOP_WORDS.replace_all(&s, " ").into_owned();
    s = TRAILING_YEAR.replace(s.trim_end(), "").into_owned();
    s = ELIDED.replace_all(&s, "").into_owned();

    let spaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&spaced)
}

/// [`get_normalized_string`] without spaces, used as a dictionary key.
pub fn get_normalized_name(name: &str) -> String {
    get_normalized_string(name).replace(' ', "")
}

fn is_region(token: &str) -> bool {
    REGIONS.contains(&token)
}

/// Composite meeting code: normalized city followed by normalized title.
///
/// Territorial championships ("Campionati Regionali Puglia") replace the
/// city with the scope abbreviation, and any title naming a region ignores
/// the city argument. A title already led by the city is not prefixed twice.
pub fn get_meeting_code(title: &str, city: &str) -> String {
    let normalized = get_normalized_string(title);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let names_region = tokens.iter().any(|t| is_region(t));
    let city_normalized = if names_region {
        String::new()
    } else {
        get_normalized_string(city)
    };
    let city_tokens: Vec<&str> = city_normalized.split_whitespace().collect();
    let city_key = city_tokens.concat();

    let scope = tokens.iter().find_map(|t| {
        SCOPE_ABBREVIATIONS
            .iter()
            .find(|(word, _)| word == t)
            .map(|(word, abbr)| (*word, *abbr))
    });

    match scope {
        Some((scope_word, abbr)) => {
            let rest: String = tokens
                .iter()
                .filter(|t| **t != scope_word && !CHAMPIONSHIP_WORDS.contains(*t))
                .copied()
                .collect();
            format!("{abbr}{city_key}{rest}")
        }
        None => {
            let title_key = tokens.concat();
            if tokens.starts_with(&city_tokens) {
                title_key
            } else {
                format!("{city_key}{title_key}")
            }
        }
    }
}

/// Pool nickname: city + abbreviated facility name + course length.
///
/// The city always leads, even when the name repeats it.
pub fn get_swimming_pool_nickname<S: AsRef<str>>(
    city: &str,
    name_tokens: &[S],
    pool_type: Option<PoolType>,
) -> String {
    let name = name_tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    let mut name = fold(&name);
    for (re, abbr) in FACILITY_WORDS.iter() {
        name = re.replace_all(&name, *abbr).into_owned();
    }

    format!(
        "{}{}{}",
        fold_key(city),
        fold_key(&name),
        pool_type.map(|p| p.code()).unwrap_or_default()
    )
}
