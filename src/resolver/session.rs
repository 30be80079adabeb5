use meet_types::SessionDescriptor;

use super::{ReconciliationOutcome, Resolver, ResolverOptions, reconcile};
use crate::catalog::{CatalogTable, Meeting, MeetingSession, SwimmingPool};
use crate::error::ConstructionError;

pub struct MeetingSessionResolver {
    parsed: MeetingSession,
    options: ResolverOptions,
    outcomes: Vec<ReconciliationOutcome<MeetingSession>>,
}

impl MeetingSessionResolver {
    /// Outside dry-run the meeting must already be persisted.
    pub fn new(
        meeting: &Meeting,
        descriptor: &SessionDescriptor,
        pool: Option<&SwimmingPool>,
        options: ResolverOptions,
    ) -> Result<Self, ConstructionError> {
        if meeting.id == 0 && !options.dry_run {
            return Err(ConstructionError::Invalid {
                field: "meeting",
                reason: format!("'{}' has no catalog id", meeting.code),
            });
        }
        if descriptor.session_order == 0 {
            return Err(ConstructionError::Invalid {
                field: "session_order",
                reason: "must start from 1".to_string(),
            });
        }
        let parsed = MeetingSession {
            id: 0,
            meeting_id: meeting.id,
            session_order: descriptor.session_order,
            scheduled_date: descriptor.scheduled_date,
            begin_time: descriptor.start_time.clone(),
            day_part: descriptor.day_part,
            swimming_pool_id: pool.map(|p| p.id).filter(|id| *id != 0),
            description: format!(
                "Sessione {}, {} {}",
                descriptor.session_order, descriptor.day_token, descriptor.month_token
            ),
            lock: Default::default(),
            updated_by: String::new(),
        };
        Ok(MeetingSessionResolver {
            parsed,
            options,
            outcomes: Vec::new(),
        })
    }
}

impl Resolver for MeetingSessionResolver {
    type Entity = MeetingSession;

    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<MeetingSession>]
    where
        C: CatalogTable<MeetingSession> + ?Sized,
    {
        let parsed = self.parsed.clone();
        // Renumbered program: same day, same part of the day
        let fuzzy = |candidates: &[MeetingSession]| {
            candidates
                .iter()
                .find(|s| {
                    s.scheduled_date == parsed.scheduled_date
                        && parsed.day_part.is_some()
                        && s.day_part == parsed.day_part
                })
                .cloned()
        };
        let outcome = reconcile(catalog, &self.options, self.parsed.clone(), fuzzy, |_| {});
        self.outcomes = vec![outcome];
        &self.outcomes
    }

    fn outcomes(&self) -> &[ReconciliationOutcome<MeetingSession>] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityKind, MemoryCatalog};
    use chrono::NaiveDate;
    use meet_types::DayPart;

    fn meeting(id: u64) -> Meeting {
        Meeting {
            id,
            code: "ravenna".into(),
            description: "Trofeo Città di Ravenna".into(),
            season_id: 222,
            header_date: NaiveDate::from_ymd_opt(2022, 3, 12).unwrap(),
            lock: Default::default(),
            updated_by: String::new(),
        }
    }

    fn descriptor(order: u32, time: &str, part: DayPart) -> SessionDescriptor {
        SessionDescriptor {
            scheduled_date: NaiveDate::from_ymd_opt(2022, 3, 12).unwrap(),
            day_token: "12".into(),
            month_token: "marzo".into(),
            session_order: order,
            start_time: Some(time.into()),
            day_part: Some(part),
            events: Vec::new(),
            source_line: "Sabato 12 marzo 2022".into(),
            pool_fragment: None,
        }
    }

    #[test]
    fn test_unsaved_meeting_rejected_outside_dry_run() {
        let d = descriptor(1, "15:00", DayPart::Afternoon);
        assert!(MeetingSessionResolver::new(&meeting(0), &d, None, ResolverOptions::default()).is_err());
        let dry = ResolverOptions {
            dry_run: true,
            ..ResolverOptions::default()
        };
        assert!(MeetingSessionResolver::new(&meeting(0), &d, None, dry).is_ok());
    }

    #[test]
    fn test_create_and_repeat() {
        let mut catalog = MemoryCatalog::new();
        let d = descriptor(1, "15:00", DayPart::Afternoon);
        let mut resolver = MeetingSessionResolver::new(&meeting(3), &d, None, ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_created());
        let session = resolver.result_entity().unwrap();
        assert_eq!(session.meeting_id, 3);
        assert_eq!(session.description, "Sessione 1, 12 marzo");

        resolver.find_or_create(&mut catalog);
        assert!(!resolver.has_created());
        assert!(!resolver.has_updated());
    }

    #[test]
    fn test_renumbered_session_updates_time() {
        let mut catalog = MemoryCatalog::new();
        let first = descriptor(2, "15:00", DayPart::Afternoon);
        MeetingSessionResolver::new(&meeting(3), &first, None, ResolverOptions::default())
            .unwrap()
            .find_or_create(&mut catalog);

        let moved = descriptor(1, "15:30", DayPart::Afternoon);
        let mut resolver = MeetingSessionResolver::new(&meeting(3), &moved, None, ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_updated());
        let session = resolver.result_entity().unwrap();
        assert_eq!(session.session_order, 1);
        assert_eq!(session.begin_time.as_deref(), Some("15:30"));
        assert_eq!(catalog.len_of(EntityKind::MeetingSession), 1);
    }
}
