use meet_types::EventDescriptor;

use super::{ReconciliationOutcome, Resolver, ResolverOptions, reconcile};
use crate::catalog::{CatalogTable, MeetingEvent, MeetingSession};
use crate::error::ConstructionError;

/// Reconciles every event of one session, in program order.
pub struct MeetingEventResolver {
    parsed: Vec<MeetingEvent>,
    options: ResolverOptions,
    outcomes: Vec<ReconciliationOutcome<MeetingEvent>>,
}

impl MeetingEventResolver {
    pub fn new(
        session: &MeetingSession,
        events: &[EventDescriptor],
        options: ResolverOptions,
    ) -> Result<Self, ConstructionError> {
        if session.id == 0 && !options.dry_run {
            return Err(ConstructionError::Invalid {
                field: "meeting session",
                reason: format!("session #{} has no catalog id", session.session_order),
            });
        }
        if let Some(bad) = events.iter().find(|e| e.length_in_meters == 0) {
            return Err(ConstructionError::Invalid {
                field: "length_in_meters",
                reason: format!("{} has no length", bad.label()),
            });
        }
        let parsed = events
            .iter()
            .enumerate()
            .map(|(idx, e)| MeetingEvent {
                id: 0,
                meeting_session_id: session.id,
                event_order: idx as u32 + 1,
                style: e.style,
                length_in_meters: e.length_in_meters,
                is_relay: e.is_relay,
                relay_phases: e.relay_phases,
                heat_type: e.heat_type,
                out_of_race: e.out_of_race,
                lock: Default::default(),
                updated_by: String::new(),
            })
            .collect();
        Ok(MeetingEventResolver {
            parsed,
            options,
            outcomes: Vec::new(),
        })
    }

    /// Resolved events, skipping the ones that failed.
    pub fn entities(&self) -> impl Iterator<Item = &MeetingEvent> {
        self.outcomes.iter().filter_map(|o| o.entity.as_ref())
    }
}

impl Resolver for MeetingEventResolver {
    type Entity = MeetingEvent;

    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<MeetingEvent>]
    where
        C: CatalogTable<MeetingEvent> + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.parsed.len());
        for parsed in &self.parsed {
            // Same race at the same position: heat type or out-of-race changed
            let fuzzy = |candidates: &[MeetingEvent]| {
                candidates
                    .iter()
                    .find(|e| {
                        e.event_order == parsed.event_order
                            && e.style == parsed.style
                            && e.length_in_meters == parsed.length_in_meters
                            && e.is_relay == parsed.is_relay
                            && e.relay_phases == parsed.relay_phases
                    })
                    .cloned()
            };
            outcomes.push(reconcile(catalog, &self.options, parsed.clone(), fuzzy, |_| {}));
        }
        self.outcomes = outcomes;
        &self.outcomes
    }

    fn outcomes(&self) -> &[ReconciliationOutcome<MeetingEvent>] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityKind, MemoryCatalog};
    use crate::resolver::DiffLog;
    use chrono::NaiveDate;
    use meet_types::{HeatType, StyleCode};

    fn session() -> MeetingSession {
        MeetingSession {
            id: 5,
            meeting_id: 3,
            session_order: 1,
            scheduled_date: NaiveDate::from_ymd_opt(2022, 3, 12).unwrap(),
            begin_time: Some("15:00".into()),
            day_part: None,
            swimming_pool_id: None,
            description: "Sessione 1, 12 marzo".into(),
            lock: Default::default(),
            updated_by: String::new(),
        }
    }

    fn single(length: u32, style: StyleCode, heat_type: HeatType) -> EventDescriptor {
        EventDescriptor {
            style,
            length_in_meters: length,
            is_relay: false,
            relay_phases: 1,
            heat_type,
            out_of_race: false,
        }
    }

    fn relay() -> EventDescriptor {
        EventDescriptor {
            style: StyleCode::Medley,
            length_in_meters: 50,
            is_relay: true,
            relay_phases: 4,
            heat_type: HeatType::Heats,
            out_of_race: false,
        }
    }

    #[test]
    fn test_one_outcome_per_event() {
        let mut catalog = MemoryCatalog::new();
        let events = [single(400, StyleCode::Freestyle, HeatType::Heats), relay()];
        let mut resolver = MeetingEventResolver::new(&session(), &events, ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert_eq!(resolver.outcomes().len(), 2);
        assert!(resolver.has_created());
        let orders: Vec<u32> = resolver.entities().map(|e| e.event_order).collect();
        assert_eq!(orders, vec![1, 2]);

        resolver.find_or_create(&mut catalog);
        assert!(!resolver.has_changes());
        let mut log = DiffLog::new();
        resolver.report(&mut log);
        assert_eq!(
            log.lines(),
            ["Meeting Event found! #1 400SLH", "Meeting Event found! #2 4x50MIH"]
        );
    }

    #[test]
    fn test_heat_change_is_an_update() {
        let mut catalog = MemoryCatalog::new();
        let heats = [single(50, StyleCode::Freestyle, HeatType::Heats)];
        MeetingEventResolver::new(&session(), &heats, ResolverOptions::default())
            .unwrap()
            .find_or_create(&mut catalog);

        let finals = [single(50, StyleCode::Freestyle, HeatType::Finals)];
        let mut resolver = MeetingEventResolver::new(&session(), &finals, ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_updated());
        assert_eq!(catalog.len_of(EntityKind::MeetingEvent), 1);
        assert_eq!(resolver.result_entity().map(|e| e.heat_type), Some(HeatType::Finals));
    }

    #[test]
    fn test_repeated_race_keeps_its_position() {
        let mut catalog = MemoryCatalog::new();
        let events = [
            single(50, StyleCode::Freestyle, HeatType::Heats),
            single(100, StyleCode::Backstroke, HeatType::Heats),
            single(50, StyleCode::Freestyle, HeatType::Heats),
        ];
        let mut first = MeetingEventResolver::new(&session(), &events, ResolverOptions::default()).unwrap();
        first.find_or_create(&mut catalog);
        assert_eq!(catalog.len_of(EntityKind::MeetingEvent), 3);
        let ids: Vec<u64> = first.entities().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        for _ in 0..2 {
            let mut again = MeetingEventResolver::new(&session(), &events, ResolverOptions::default()).unwrap();
            again.find_or_create(&mut catalog);
            assert!(!again.has_changes());
            let orders: Vec<(u64, u32)> = again.entities().map(|e| (e.id, e.event_order)).collect();
            assert_eq!(orders, vec![(1, 1), (2, 2), (3, 3)]);
        }
        assert_eq!(catalog.len_of(EntityKind::MeetingEvent), 3);
    }

    #[test]
    fn test_failures_are_per_event() {
        let mut catalog = MemoryCatalog::new();
        catalog.fail_writes_for(EntityKind::MeetingEvent);
        let events = [single(100, StyleCode::Backstroke, HeatType::Heats), relay()];
        let mut resolver = MeetingEventResolver::new(&session(), &events, ResolverOptions::default()).unwrap();
        resolver.find_or_create(&mut catalog);
        assert!(resolver.has_errors());
        assert_eq!(resolver.outcomes().len(), 2);
        assert_eq!(resolver.entities().count(), 0);
    }

    #[test]
    fn test_zero_length_rejected() {
        let events = [single(0, StyleCode::Freestyle, HeatType::Heats)];
        assert!(MeetingEventResolver::new(&session(), &events, ResolverOptions::default()).is_err());
    }
}
