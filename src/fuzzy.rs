//! Best-match search over any labeled collection.
//!
//! Scores are Jaro-Winkler similarities between folded strings (lowercase,
//! no diacritics, single spaces). Jaro-Winkler forgives transpositions and
//! single substitutions but punishes a short query against a much longer
//! label: "club modena" never reaches "modena" through [`FuzzyStringMatcher::find`].
//! [`FuzzyStringMatcher::seek_deep_match`] recovers some of those cases by
//! retrying with word subsets of the query.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::error::ConfigError;
use crate::normalize::fold;

/// Near-exact acceptance.
pub const BIAS_SCORE_BEST: f64 = 0.97;
/// Default acceptance for `find` and the deep-match retry trigger.
pub const BIAS_SCORE_GOOD: f64 = 0.90;
/// Below this a score is noise.
pub const BIAS_SCORE_MIN: f64 = 0.80;

/// Variants shorter than this are not worth scoring.
const MIN_VARIANT_LEN: usize = 3;
/// Queries up to this many words are retried with every word arrangement.
const MAX_PERMUTED_WORDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    #[serde(rename = "bias_best")]
    pub best: f64,
    #[serde(rename = "bias_good")]
    pub good: f64,
    #[serde(rename = "bias_min")]
    pub min: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        MatchThresholds {
            best: BIAS_SCORE_BEST,
            good: BIAS_SCORE_GOOD,
            min: BIAS_SCORE_MIN,
        }
    }
}

impl MatchThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("best", self.best), ("good", self.good), ("min", self.min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        Ok(())
    }
}

/// A scored reference into the matcher's collection.
#[derive(Debug)]
pub struct MatchCandidate<'a, T> {
    pub score: f64,
    pub row: &'a T,
}

impl<T> Clone for MatchCandidate<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MatchCandidate<'_, T> {}

fn comparable(s: &str) -> String {
    fold(s).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity in [0, 1] between two free-text labels.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(&comparable(a), &comparable(b))
}

/// Matcher over `rows`, compared through the label an accessor reads from each row.
pub struct FuzzyStringMatcher<'a, T> {
    rows: &'a [T],
    labels: Vec<String>,
    thresholds: MatchThresholds,
}

impl<'a, T> FuzzyStringMatcher<'a, T> {
    /// Labels are read once through `accessor` and kept folded.
    pub fn new<F>(rows: &'a [T], accessor: F) -> Self
    where
        F: Fn(&T) -> String,
    {
        let labels = rows.iter().map(|r| comparable(&accessor(r))).collect();
        FuzzyStringMatcher {
            rows,
            labels,
            thresholds: MatchThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    fn score_all(&self, query: &str) -> Vec<(usize, f64)> {
        let query = comparable(query);
        if query.is_empty() {
            return Vec::new();
        }
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx, jaro_winkler(&query, label)))
            .filter(|(_, score)| *score >= self.thresholds.min)
            .collect()
    }

    fn ranked(&self, mut scored: Vec<(usize, f64)>) -> Vec<MatchCandidate<'a, T>> {
        // Stable sort keeps collection order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .map(|(idx, score)| MatchCandidate {
                score,
                row: &self.rows[idx],
            })
            .collect()
    }

    /// Every candidate scoring at least the noise floor, best first.
    pub fn collect_matches(&self, query: &str) -> Vec<MatchCandidate<'a, T>> {
        self.ranked(self.score_all(query))
    }

    /// Top candidate when it reaches the "good" threshold.
    pub fn find(&self, query: &str) -> Option<&'a T> {
        self.find_with_bias(query, self.thresholds.good)
    }

    /// Top candidate when it reaches `bias`.
    pub fn find_with_bias(&self, query: &str, bias: f64) -> Option<&'a T> {
        self.collect_matches(query)
            .into_iter()
            .next()
            .filter(|c| c.score >= bias)
            .map(|c| c.row)
    }

    /// Literal match first; below the "good" threshold, retry with word
    /// variants of the query and keep each candidate's best score.
    ///
    /// Returns the best score and the ranked candidates, `(0.0, [])` when
    /// nothing clears the noise floor.
    pub fn seek_deep_match(&self, query: &str) -> (f64, Vec<MatchCandidate<'a, T>>) {
        let literal = self.score_all(query);
        let literal_best = literal.iter().map(|(_, s)| *s).fold(0.0, f64::max);
        if literal_best >= self.thresholds.good {
            return (literal_best, self.ranked(literal));
        }

        let mut best_by_row: HashMap<usize, f64> = literal.into_iter().collect();
        for variant in query_variants(query) {
            if variant.chars().count() < MIN_VARIANT_LEN {
                continue;
            }
            for (idx, score) in self.score_all(&variant) {
                let entry = best_by_row.entry(idx).or_insert(score);
                if score > *entry {
                    *entry = score;
                }
            }
        }

        let mut scored: Vec<(usize, f64)> = best_by_row.into_iter().collect();
        scored.sort_by_key(|(idx, _)| *idx);
        let best = scored.iter().map(|(_, s)| *s).fold(0.0, f64::max);
        (best, self.ranked(scored))
    }
}

/// Word-level rewrites of a query other than the query itself.
///
/// Short queries yield every ordered arrangement of every word subset;
/// longer ones yield their contiguous word windows.
fn query_variants(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let original = words.join(" ");
    let mut out = Vec::new();

    if words.len() <= MAX_PERMUTED_WORDS {
        let mut current = Vec::new();
        let mut used = vec![false; words.len()];
        arrangements(&words, &mut current, &mut used, &mut out);
    } else {
        for size in 1..words.len() {
            for window in words.windows(size) {
                out.push(window.join(" "));
            }
        }
    }

    out.retain(|v| *v != original);
    out.sort();
    out.dedup();
    out
}

fn arrangements<'w>(
    words: &[&'w str],
    current: &mut Vec<&'w str>,
    used: &mut [bool],
    out: &mut Vec<String>,
) {
    for i in 0..words.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        current.push(words[i]);
        out.push(current.join(" "));
        arrangements(words, current, used, out);
        current.pop();
        used[i] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITIES: &[&str] = &[
        "PARMA",
        "REGGIO NELL'EMILIA",
        "MODENA",
        "REGGIO CALABRIA",
        "BOLOGNA",
    ];

    fn matcher() -> FuzzyStringMatcher<'static, &'static str> {
        FuzzyStringMatcher::new(CITIES, |c| c.to_string())
    }

    #[test]
    fn test_find_accepts_elided_variant() {
        assert_eq!(matcher().find("Reggio Emilia"), Some(&"REGGIO NELL'EMILIA"));
    }

    #[test]
    fn test_find_rejects_unrelated() {
        assert_eq!(matcher().find("This will fail"), None);
    }

    #[test]
    fn test_collect_matches_sorted_descending() {
        let m = matcher();
        let matches = m.collect_matches("reggio");
        assert!(!matches.is_empty());
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(matches.iter().all(|c| c.score >= BIAS_SCORE_MIN));
    }

    #[test]
    fn test_find_with_bias_best_is_strict() {
        let m = matcher();
        assert_eq!(m.find_with_bias("modena", BIAS_SCORE_BEST), Some(&"MODENA"));
        assert_eq!(m.find_with_bias("Reggio Emilia", BIAS_SCORE_BEST), None);
    }

    #[test]
    fn test_length_mismatch_is_a_known_miss() {
        assert_eq!(matcher().find("Nuoto Club Modena"), None);
    }

    #[test]
    fn test_seek_deep_match_uses_word_variants() {
        let m = matcher();
        let (best, ranked) = m.seek_deep_match("Nuoto Club Modena");
        assert_eq!(best, 1.0);
        assert_eq!(ranked.first().map(|c| *c.row), Some("MODENA"));
    }

    #[test]
    fn test_seek_deep_match_unmatched() {
        let (best, ranked) = matcher().seek_deep_match("zzzz qqqq");
        assert_eq!(best, 0.0);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_query_variants() {
        let variants = query_variants("a b");
        assert_eq!(variants, vec!["a", "b", "b a"]);
        let long = query_variants("uno due tre quattro cinque");
        assert!(long.contains(&"due tre".to_string()));
        assert!(!long.contains(&"tre due".to_string()));
    }

    #[test]
    fn test_similarity_ignores_case_accents_and_spacing() {
        assert_eq!(similarity("Forlì", "  FORLI "), 1.0);
        assert!(similarity("Bolzano", "Borzano") < BIAS_SCORE_BEST);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(MatchThresholds::default().validate().is_ok());
        let bad = MatchThresholds {
            min: 1.5,
            ..MatchThresholds::default()
        };
        assert!(bad.validate().is_err());
    }
}
