use std::collections::BTreeSet;

use chrono::NaiveDate;
use meet_types::SessionDescriptor;

/// Counts describing what the parser recovered from one announcement.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgramSummary {
    pub name: String,
    pub sessions: usize,
    pub events: usize,
    /// Relay events among `events`
    pub relays: usize,
    pub out_of_race: usize,
    /// Distinct pool fragments referenced by the sessions
    pub pool_fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
}

impl ProgramSummary {
    pub fn from_sessions(name: &str, sessions: &[SessionDescriptor]) -> Self {
        let events = sessions.iter().flat_map(|s| s.events.iter());
        let mut fragments = BTreeSet::new();
        for fragment in sessions.iter().filter_map(|s| s.pool_fragment.as_ref()) {
            fragments.insert(fragment.clone());
        }

        ProgramSummary {
            name: name.to_string(),
            sessions: sessions.len(),
            events: events.clone().count(),
            relays: events.clone().filter(|e| e.is_relay).count(),
            out_of_race: events.filter(|e| e.out_of_race).count(),
            pool_fragments: fragments.into_iter().collect(),
            first_date: sessions.iter().map(|s| s.scheduled_date).min(),
            last_date: sessions.iter().map(|s| s.scheduled_date).max(),
        }
    }

    /// One line for terminal listings.
    pub fn line(&self) -> String {
        let dates = match (self.first_date, self.last_date) {
            (Some(first), Some(last)) if first != last => format!("{first}..{last}"),
            (Some(first), _) => first.to_string(),
            _ => "-".to_string(),
        };
        format!(
            "{:<40} {:>2} sessions {:>3} events ({} relays) {}",
            self.name, self.sessions, self.events, self.relays, dates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_summary_counts() {
        let text = "\
Piscina Comunale, via Roma 1 - Cervia
Sabato 4 giugno 2022
ore 9.00 riscaldamento
100 SL - 50 DO fuori gara - staff 4x50 MI
Domenica 5 giugno 2022
ore 9.00 200 RA
";
        let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let summary = ProgramSummary::from_sessions("cervia", &parse_program(text, date));
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.events, 4);
        assert_eq!(summary.relays, 1);
        assert_eq!(summary.out_of_race, 1);
        assert_eq!(summary.pool_fragments.len(), 1);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2022, 6, 4));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2022, 6, 5));
    }

    #[test]
    fn test_empty_summary_line() {
        let summary = ProgramSummary::from_sessions("vuoto", &[]);
        assert_eq!(summary, ProgramSummary { name: "vuoto".into(), ..ProgramSummary::default() });
        assert!(summary.line().ends_with(" -"));
    }
}
