//! Place-name equivalence on top of the fuzzy matcher.

use crate::fuzzy::{BIAS_SCORE_BEST, FuzzyStringMatcher, MatchThresholds, similarity};
use crate::normalize::fold;
use crate::splitter::split_words;

/// Connectors of composed place names ("Reggio nell'Emilia").
const CITY_CONNECTORS: &[&str] = &[
    "nell", "nella", "nel", "dell", "della", "del", "di", "de", "in", "sul", "sulla", "al",
];

/// Words of team and facility names that never belong to a place name.
const GENERIC_TEAM_WORDS: &[&str] = &[
    "nuoto", "sport", "sports", "club", "asd", "ssd", "team", "swim", "swimming", "piscina",
    "piscine", "centro", "sportivo", "comunale", "rari", "nantes", "polisportiva", "aquatic",
];

const MAX_WINDOW_WORDS: usize = 3;

fn is_connector(token: &str) -> bool {
    let folded = fold(token);
    CITY_CONNECTORS.contains(&folded.as_str()) || folded.chars().count() == 1
}

/// Member tokens of a place name, connectors and elided articles removed.
///
/// "REGGIO NELL'EMILIA" → `["REGGIO", "EMILIA"]`, "Ravenna" → `["Ravenna"]`.
pub fn get_token_array_from_city_member_name(name: &str) -> Vec<String> {
    let tokens: Vec<&str> = name
        .split(|c: char| c.is_whitespace() || matches!(c, '\'' | '’' | '-'))
        .filter(|t| !t.is_empty())
        .collect();
    let members: Vec<String> = tokens
        .iter()
        .filter(|t| !is_connector(t))
        .map(|t| t.to_string())
        .collect();
    if members.is_empty() {
        tokens.into_iter().map(String::from).collect()
    } else {
        members
    }
}

/// Same place under elision variants and small typos.
///
/// Member tokens must pair up one to one, each pair equal or at least
/// [`BIAS_SCORE_BEST`] similar; "Borzano" and "Bolzano" stay apart.
pub fn compare_city_member_strings(a: &str, b: &str) -> bool {
    let left: Vec<String> = get_token_array_from_city_member_name(a)
        .iter()
        .map(|t| fold(t))
        .collect();
    let right: Vec<String> = get_token_array_from_city_member_name(b)
        .iter()
        .map(|t| fold(t))
        .collect();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    if left.concat() == right.concat() {
        return true;
    }
    left.len() == right.len()
        && left
            .iter()
            .zip(&right)
            .all(|(l, r)| l == r || similarity(l, r) >= BIAS_SCORE_BEST)
}

fn same_code(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Same city name, same area code and same country code.
pub fn seems_the_same(
    city1: &str,
    city2: &str,
    area1: &str,
    area2: &str,
    country1: &str,
    country2: &str,
) -> bool {
    compare_city_member_strings(city1, city2) && same_code(area1, area2) && same_code(country1, country2)
}

/// Resolve a place embedded in a team or facility name.
///
/// Tries trailing words, then the whole name, then sliding windows of up to
/// three words, returning the first row the matcher accepts.
pub fn search_composed_name<'a, T, F>(
    name: &str,
    rows: &'a [T],
    label: F,
    thresholds: MatchThresholds,
) -> Option<&'a T>
where
    F: Fn(&T) -> String,
{
    let matcher = FuzzyStringMatcher::new(rows, label).with_thresholds(thresholds);
    let words: Vec<String> = split_words(name)
        .into_iter()
        .filter(|w| {
            let folded = fold(w);
            !GENERIC_TEAM_WORDS.contains(&folded.as_str()) && !is_connector(w)
        })
        .collect();

    let longest = words.len().min(MAX_WINDOW_WORDS);
    for size in (1..=longest).rev() {
        let tail = words[words.len() - size..].join(" ");
        if let Some(found) = matcher.find(&tail) {
            return Some(found);
        }
    }

    if let Some(found) = matcher.find(name) {
        return Some(found);
    }

    for size in (1..=longest).rev() {
        for window in words.windows(size) {
            let candidate = window.join(" ");
            if candidate.chars().count() < 3 {
                continue;
            }
            if let Some(found) = matcher.find(&candidate) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_array() {
        assert_eq!(
            get_token_array_from_city_member_name("REGGIO NELL'EMILIA"),
            vec!["REGGIO", "EMILIA"]
        );
        assert_eq!(get_token_array_from_city_member_name("Ravenna"), vec!["Ravenna"]);
        assert_eq!(get_token_array_from_city_member_name("L'Aquila"), vec!["Aquila"]);
        assert_eq!(
            get_token_array_from_city_member_name("Castelnuovo-Rangone"),
            vec!["Castelnuovo", "Rangone"]
        );
    }

    #[test]
    fn test_compare_city_member_strings() {
        assert!(compare_city_member_strings("Reggio Emilia", "Reggio nell'Emilia"));
        assert!(compare_city_member_strings("Forlì", "FORLI"));
        assert!(compare_city_member_strings("Riccionne", "Riccione"));
        assert!(!compare_city_member_strings("Rome", "New York"));
        assert!(!compare_city_member_strings("Borzano", "Bolzano"));
        assert!(!compare_city_member_strings("Parto", "Prato"));
        assert!(!compare_city_member_strings("Reggio Emilia", "Reggio Calabria"));
    }

    #[test]
    fn test_seems_the_same_requires_area_and_country() {
        assert!(seems_the_same("Reggio Emilia", "Reggio nell'Emilia", "RE", "re", "IT", "IT"));
        assert!(!seems_the_same("Reggio Emilia", "Reggio nell'Emilia", "RE", "RC", "IT", "IT"));
        assert!(!seems_the_same("Reggio Emilia", "Reggio nell'Emilia", "RE", "RE", "IT", "SM"));
    }

    #[test]
    fn test_search_composed_name() {
        let cities = ["Ravenna", "Reggio nell'Emilia", "Modena", "Forlì"];
        let find = |name: &str| {
            search_composed_name(name, &cities[..], |c| c.to_string(), MatchThresholds::default())
                .copied()
        };
        assert_eq!(find("Nuoto Club Ravenna"), Some("Ravenna"));
        assert_eq!(find("Piscina Comunale di Reggio Emilia"), Some("Reggio nell'Emilia"));
        assert_eq!(find("Rari Nantes Forli Team"), Some("Forlì"));
        assert_eq!(find("Modena Nuoto ASD"), Some("Modena"));
        assert_eq!(find("Nuoto Club Milano"), None);
    }
}
