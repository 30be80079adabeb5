use chrono::NaiveDate;

use super::{ReconciliationOutcome, Resolver, ResolverOptions, reconcile};
use crate::catalog::{CatalogTable, Meeting};
use crate::error::ConstructionError;
use crate::fuzzy::FuzzyStringMatcher;
use crate::normalize::get_meeting_code;

pub struct MeetingResolver {
    parsed: Meeting,
    options: ResolverOptions,
    outcomes: Vec<ReconciliationOutcome<Meeting>>,
}

impl MeetingResolver {
    /// `city` only feeds the meeting code; titles naming a region ignore it.
    pub fn new(
        title: &str,
        city: &str,
        season_id: u32,
        header_date: NaiveDate,
        options: ResolverOptions,
    ) -> Result<Self, ConstructionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ConstructionError::Missing("meeting title"));
        }
        let code = get_meeting_code(title, city);
        if code.is_empty() {
            return Err(ConstructionError::Invalid {
                field: "meeting title",
                reason: format!("'{title}' normalizes to an empty code"),
            });
        }
        Ok(MeetingResolver {
            parsed: Meeting {
                id: 0,
                code,
                description: title.to_string(),
                season_id,
                header_date,
                lock: Default::default(),
                updated_by: String::new(),
            },
            options,
            outcomes: Vec::new(),
        })
    }
}

impl Resolver for MeetingResolver {
    type Entity = Meeting;

    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<Meeting>]
    where
        C: CatalogTable<Meeting> + ?Sized,
    {
        let code = self.parsed.code.clone();
        let best = self.options.thresholds.best;
        let fuzzy = |candidates: &[Meeting]| {
            FuzzyStringMatcher::new(candidates, |m| m.code.clone())
                .find_with_bias(&code, best)
                .cloned()
        };
        let outcome = reconcile(catalog, &self.options, self.parsed.clone(), fuzzy, |_| {});
        self.outcomes = vec![outcome];
        &self.outcomes
    }

    fn outcomes(&self) -> &[ReconciliationOutcome<Meeting>] {
        &self.outcomes
    }
}
