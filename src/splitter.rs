//! Sentence and word segmentation for announcement text.
//!
//! Separators are `, . ; :`. Text inside double quotes (straight, curly or
//! guillemets) is never split and the quotes themselves are dropped.
//! Apostrophes are plain characters, so elisions like "l'Aquila" survive.

/// How finely [`split_sentences`] cuts its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Sentence-level units (split on punctuation only)
    #[default]
    Sentence,
    /// Word-level units (punctuation and whitespace)
    Word,
}

const SEPARATORS: &[char] = &[',', '.', ';', ':'];

/// Closing quote for an opening one.
fn closing_quote(c: char) -> Option<char> {
    match c {
        '"' => Some('"'),
        '“' => Some('”'),
        '«' => Some('»'),
        _ => None,
    }
}

/// A dot stays inside the current unit when it follows a short abbreviation
/// (`Km.`, `S.`, `C.da`): one token of at most 3 chars with no digits.
/// A dot that ends the text always separates.
fn is_abbreviation_dot(current: &str, next: Option<&char>) -> bool {
    if next.is_none() {
        return false;
    }
    let token = current.rsplit(char::is_whitespace).next().unwrap_or("");
    let len = token.chars().count();
    (1..=3).contains(&len)
        && !token.chars().any(|c| c.is_ascii_digit())
        && token.chars().any(char::is_alphabetic)
}

fn flush(units: &mut Vec<String>, current: &mut String) {
    let unit = current.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
    current.clear();
}

/// Split `text` into trimmed, non-empty units.
pub fn split_sentences(text: &str, granularity: Granularity) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let word_mode = granularity == Granularity::Word;
    let mut units = Vec::new();
    let mut current = String::new();
    let mut open_quote: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(close) = open_quote {
            if c == close {
                open_quote = None;
                if word_mode {
                    flush(&mut units, &mut current);
                }
            } else {
                current.push(c);
            }
            continue;
        }

        if let Some(close) = closing_quote(c) {
            open_quote = Some(close);
            if word_mode {
                flush(&mut units, &mut current);
            }
            continue;
        }

        match c {
            // Stray closing quotes
            '”' | '»' => {}
            '.' if is_abbreviation_dot(&current, chars.get(i + 1)) => current.push(c),
            c if SEPARATORS.contains(&c) => flush(&mut units, &mut current),
            c if word_mode && c.is_whitespace() => flush(&mut units, &mut current),
            c => current.push(c),
        }
    }
    flush(&mut units, &mut current);

    units
}

/// Shorthand for word-granularity splitting.
pub fn split_words(text: &str) -> Vec<String> {
    split_sentences(text, Granularity::Word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(split_sentences("", Granularity::Sentence).is_empty());
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_sentence_separators() {
        assert_eq!(
            split_sentences("Vasca coperta; 8 corsie, cronometraggio automatico.", Granularity::Sentence),
            vec!["Vasca coperta", "8 corsie", "cronometraggio automatico"]
        );
    }

    #[test]
    fn test_quotes_are_atomic_and_stripped() {
        assert_eq!(
            split_sentences("Trofeo \"Città di Roma, 2022\"; ore 9", Granularity::Sentence),
            vec!["Trofeo Città di Roma, 2022", "ore 9"]
        );
        assert_eq!(
            split_words("Piscina “Le Naiadi” Pescara"),
            vec!["Piscina", "Le Naiadi", "Pescara"]
        );
    }

    #[test]
    fn test_apostrophes_do_not_split() {
        assert_eq!(
            split_words("l'Aquila fallin' nell'Emilia"),
            vec!["l'Aquila", "fallin'", "nell'Emilia"]
        );
    }

    #[test]
    fn test_abbreviation_dots() {
        assert_eq!(
            split_words("Km.125 S. Maria C.da Vallone tune."),
            vec!["Km.125", "S.", "Maria", "C.da", "Vallone", "tune"]
        );
    }

    #[test]
    fn test_dot_after_long_or_numeric_token_splits() {
        assert_eq!(split_words("tune. dopo"), vec!["tune", "dopo"]);
        assert_eq!(
            split_sentences("ore 9.30", Granularity::Sentence),
            vec!["ore 9", "30"]
        );
    }
}
