use regex::Regex;

/// Remove from every `left` element each case-insensitive substring
/// occurrence of every `right` element.
///
/// This is not a set difference: "Comunale G. Facci" minus
/// `["comunale", "facci"]` leaves "G.". Each `right` element contributes its
/// alphanumeric runs ("Staffoli,16" → "Staffoli", "16"), removed longest
/// first. Residues are whitespace-collapsed and dropped when empty.
pub fn subtract_set_behaviour<L, R>(left: &[L], right: &[R]) -> Vec<String>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let mut patterns: Vec<&str> = right
        .iter()
        .flat_map(|r| r.as_ref().split(|c: char| !c.is_alphanumeric()))
        .filter(|r| !r.is_empty())
        .collect();
    patterns.dedup();
    patterns.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
    let patterns: Vec<Regex> = patterns
        .into_iter()
        .filter_map(|p| Regex::new(&format!("(?i){}", regex::escape(p))).ok())
        .collect();

    left.iter()
        .filter_map(|item| {
            let mut residue = item.as_ref().to_string();
            for re in &patterns {
                residue = re.replace_all(&residue, "").into_owned();
            }
            let residue = residue.split_whitespace().collect::<Vec<_>>().join(" ");
            (!residue.is_empty()).then_some(residue)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_not_token_removal() {
        assert_eq!(
            subtract_set_behaviour(&["via Staffoli,16"], &["via", "Staffoli,16"]),
            vec![","]
        );
        assert_eq!(
            subtract_set_behaviour(&["Comunale G. Facci"], &["comunale", "facci"]),
            vec!["G."]
        );
    }

    #[test]
    fn test_untouched_and_dropped_elements() {
        assert_eq!(
            subtract_set_behaviour(&["Piscina", "Ravenna", "Darsena"], &["ravenna"]),
            vec!["Piscina", "Darsena"]
        );
        let empty: [&str; 0] = [];
        assert_eq!(subtract_set_behaviour(&["Darsena"], &empty), vec!["Darsena"]);
    }

    #[test]
    fn test_longest_run_first() {
        assert_eq!(
            subtract_set_behaviour(&["Sanremo Nuoto"], &["san", "Sanremo"]),
            vec!["Nuoto"]
        );
    }
}
