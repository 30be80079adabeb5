//! Find-or-create builders reconciling parsed data with the catalog.
//!
//! Every resolver runs the same protocol through [`reconcile`]:
//! normalized-key lookup, then a fuzzy lookup over scoped candidates, then
//! update (lock permitting) or create. Failures are captured in the outcome
//! and never propagate to the caller.

mod city;
mod event;
mod meeting;
mod pool;
mod session;

use meet_types::{LockState, ReconcileStatus};
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{ActingUser, CatalogTable, Entity};
use crate::fuzzy::MatchThresholds;

pub use city::CityResolver;
pub use event::MeetingEventResolver;
pub use meeting::MeetingResolver;
pub use pool::SwimmingPoolResolver;
pub use session::MeetingSessionResolver;

// ── Diff sink ────────────────────────────────────────────────────────

/// Append-only accumulator of human-readable resolver actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffLog {
    lines: Vec<String>,
}

impl DiffLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn append(&mut self, other: &DiffLog) {
        self.lines.extend(other.lines.iter().cloned());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

// ── Options and outcomes ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub acting_user: ActingUser,
    /// Report decisions without writing; staged creates keep id 0.
    pub dry_run: bool,
    pub skip_geocoding: bool,
    pub thresholds: MatchThresholds,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            acting_user: ActingUser::default(),
            dry_run: false,
            skip_geocoding: true,
            thresholds: MatchThresholds::default(),
        }
    }
}

/// Decision taken for one parsed record.
#[derive(Debug, Clone)]
pub struct ReconciliationOutcome<E> {
    pub status: ReconcileStatus,
    /// Persisted (or staged) record; `None` on error.
    pub entity: Option<E>,
    pub diff: Vec<String>,
    pub error: Option<String>,
}

impl<E> ReconciliationOutcome<E> {
    fn failed(diff: Vec<String>, error: String) -> Self {
        ReconciliationOutcome {
            status: ReconcileStatus::Error,
            entity: None,
            diff,
            error: Some(error),
        }
    }
}

/// Changed columns between two field lists of the same entity kind.
fn changed_fields(
    before: &[(&'static str, String)],
    after: &[(&'static str, String)],
) -> Vec<(&'static str, String, String)> {
    before
        .iter()
        .zip(after)
        .filter(|((_, old), (_, new))| old != new)
        .map(|((name, old), (_, new))| (*name, old.clone(), new.clone()))
        .collect()
}

fn insert_statement<E: Entity>(entity: &E) -> String {
    let (columns, values): (Vec<&str>, Vec<String>) = entity.fields().into_iter().unzip();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        E::KIND.table(),
        columns.join(", "),
        values.join(", ")
    )
}

fn update_statement<E: Entity>(entity: &E, changes: &[(&'static str, String, String)]) -> String {
    let sets: Vec<String> = changes
        .iter()
        .map(|(name, _, new)| format!("{name}={new}"))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id={};",
        E::KIND.table(),
        sets.join(", "),
        entity.id()
    )
}

/// Shared find-or-create protocol.
///
/// `fuzzy_lookup` receives the candidates in the parsed record's scope and
/// runs only after the key lookup misses. `on_create` completes a record
/// about to be created (geocoding).
pub(crate) fn reconcile<E, C>(
    catalog: &mut C,
    options: &ResolverOptions,
    parsed: E,
    fuzzy_lookup: impl FnOnce(&[E]) -> Option<E>,
    on_create: impl FnOnce(&mut E),
) -> ReconciliationOutcome<E>
where
    E: Entity,
    C: CatalogTable<E> + ?Sized,
{
    let scope = parsed.scope();
    let found = catalog
        .find_by_key(scope, &parsed.lookup_key())
        .or_else(|| fuzzy_lookup(&catalog.candidates(scope)));

    match found {
        Some(stored) => update_found(catalog, options, stored, &parsed),
        None => create_missing(catalog, options, parsed, on_create),
    }
}

fn update_found<E, C>(
    catalog: &mut C,
    options: &ResolverOptions,
    stored: E,
    parsed: &E,
) -> ReconciliationOutcome<E>
where
    E: Entity,
    C: CatalogTable<E> + ?Sized,
{
    let mut diff = vec![format!("{} found! #{} {}", E::KIND, stored.id(), stored.label())];
    let mut merged = stored.merged_with(parsed);
    let changes = changed_fields(&stored.fields(), &merged.fields());

    if changes.is_empty() {
        return ReconciliationOutcome {
            status: ReconcileStatus::Unchanged,
            entity: Some(stored),
            diff,
            error: None,
        };
    }

    match stored.lock() {
        LockState::Mutable => {}
        LockState::Locked => {
            diff.push(format!(
                "{} #{} is locked: {} change(s) ignored",
                E::KIND,
                stored.id(),
                changes.len()
            ));
            return ReconciliationOutcome {
                status: ReconcileStatus::Unchanged,
                entity: Some(stored),
                diff,
                error: None,
            };
        }
        LockState::PendingReview => {
            diff.push(format!(
                "{} #{} is pending review: {} change(s) deferred",
                E::KIND,
                stored.id(),
                changes.len()
            ));
            return ReconciliationOutcome {
                status: ReconcileStatus::Unchanged,
                entity: Some(stored),
                diff,
                error: None,
            };
        }
    }

    merged.stamp(&options.acting_user);
    for (name, old, new) in &changes {
        diff.push(format!("  {name}: {old} -> {new}"));
    }
    diff.push(update_statement(&merged, &changes));

    if !options.dry_run
        && let Err(err) = catalog.update(&merged)
    {
        warn!(kind = %E::KIND, id = merged.id(), error = %err, "update failed");
        let message = err.to_string();
        diff.push(format!("{} update failed: {message}", E::KIND));
        return ReconciliationOutcome::failed(diff, message);
    }
    info!(kind = %E::KIND, id = merged.id(), changes = changes.len(), dry_run = options.dry_run, "updated");
    ReconciliationOutcome {
        status: ReconcileStatus::Updated,
        entity: Some(merged),
        diff,
        error: None,
    }
}

fn create_missing<E, C>(
    catalog: &mut C,
    options: &ResolverOptions,
    mut parsed: E,
    on_create: impl FnOnce(&mut E),
) -> ReconciliationOutcome<E>
where
    E: Entity,
    C: CatalogTable<E> + ?Sized,
{
    on_create(&mut parsed);
    parsed.stamp(&options.acting_user);
    parsed.set_id(0);
    let mut diff = vec![
        format!("{} created: {}", E::KIND, parsed.label()),
        insert_statement(&parsed),
    ];

    let entity = if options.dry_run {
        parsed
    } else {
        match catalog.create(parsed) {
            Ok(created) => created,
            Err(err) => {
                warn!(kind = %E::KIND, error = %err, "create failed");
                let message = err.to_string();
                diff.push(format!("{} create failed: {message}", E::KIND));
                return ReconciliationOutcome::failed(diff, message);
            }
        }
    };
    info!(kind = %E::KIND, id = entity.id(), dry_run = options.dry_run, "created");
    ReconciliationOutcome {
        status: ReconcileStatus::Created,
        entity: Some(entity),
        diff,
        error: None,
    }
}

// ── Resolver contract ────────────────────────────────────────────────

/// Common surface of the find-or-create builders.
pub trait Resolver {
    type Entity: Entity;

    /// Run the protocol against `catalog`. A repeat call on an unchanged
    /// catalog finds what the first call wrote and changes nothing.
    fn find_or_create<C>(&mut self, catalog: &mut C) -> &[ReconciliationOutcome<Self::Entity>]
    where
        C: CatalogTable<Self::Entity> + ?Sized;

    /// Outcomes of the latest `find_or_create`, one per parsed record.
    fn outcomes(&self) -> &[ReconciliationOutcome<Self::Entity>];

    fn result_entity(&self) -> Option<&Self::Entity> {
        self.outcomes().first().and_then(|o| o.entity.as_ref())
    }

    fn has_created(&self) -> bool {
        self.outcomes().iter().any(|o| o.status == ReconcileStatus::Created)
    }

    fn has_updated(&self) -> bool {
        self.outcomes().iter().any(|o| o.status == ReconcileStatus::Updated)
    }

    fn has_errors(&self) -> bool {
        self.outcomes().iter().any(|o| o.status == ReconcileStatus::Error)
    }

    fn has_changes(&self) -> bool {
        self.has_created() || self.has_updated()
    }

    fn report(&self, sink: &mut DiffLog) {
        for outcome in self.outcomes() {
            for line in &outcome.diff {
                sink.push(line.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{City, EntityKind, MemoryCatalog};

    fn parsed_city(name: &str) -> City {
        City {
            name: name.into(),
            area_code: "RA".into(),
            country_code: "IT".into(),
            ..City::default()
        }
    }

    fn run(catalog: &mut MemoryCatalog, options: &ResolverOptions, city: City) -> ReconciliationOutcome<City> {
        reconcile(catalog, options, city, |_: &[City]| None, |_| {})
    }

    #[test]
    fn test_create_then_find() {
        let mut catalog = MemoryCatalog::new();
        let options = ResolverOptions::default();

        let first = run(&mut catalog, &options, parsed_city("Ravenna"));
        assert_eq!(first.status, ReconcileStatus::Created);
        assert_eq!(first.entity.as_ref().map(|c| c.id), Some(1));
        assert_eq!(first.entity.as_ref().map(|c| c.updated_by.as_str()), Some("batch"));
        assert_eq!(first.diff[0], "City created: Ravenna (RA)");
        assert!(first.diff[1].starts_with("INSERT INTO cities (name, area_code"));

        let second = run(&mut catalog, &options, parsed_city("Ravenna"));
        assert_eq!(second.status, ReconcileStatus::Unchanged);
        assert_eq!(second.diff, vec!["City found! #1 Ravenna (RA)"]);
        assert_eq!(catalog.len_of(EntityKind::City), 1);
    }

    #[test]
    fn test_update_emits_field_lines() {
        let mut catalog = MemoryCatalog::new();
        let options = ResolverOptions::default();
        catalog
            .create(City {
                area_code: String::new(),
                ..parsed_city("Ravenna")
            })
            .unwrap();

        let outcome = run(&mut catalog, &options, parsed_city("Ravenna"));
        assert_eq!(outcome.status, ReconcileStatus::Updated);
        assert_eq!(outcome.diff[1], "  area_code: '' -> 'RA'");
        assert_eq!(outcome.diff[2], "UPDATE cities SET area_code='RA' WHERE id=1;");
        let stored: Option<City> = catalog.find_by_key(None, "ravenna");
        assert_eq!(stored.map(|c| c.area_code), Some("RA".to_string()));
    }

    #[test]
    fn test_lock_states_block_updates() {
        for (lock, note) in [
            (LockState::Locked, "City #1 is locked: 1 change(s) ignored"),
            (LockState::PendingReview, "City #1 is pending review: 1 change(s) deferred"),
        ] {
            let mut catalog = MemoryCatalog::new();
            catalog
                .create(City {
                    area_code: String::new(),
                    lock,
                    ..parsed_city("Ravenna")
                })
                .unwrap();

            let outcome = run(&mut catalog, &ResolverOptions::default(), parsed_city("Ravenna"));
            assert_eq!(outcome.status, ReconcileStatus::Unchanged);
            assert!(outcome.error.is_none());
            assert_eq!(outcome.diff[1], note);
            let stored: Option<City> = catalog.find_by_key(None, "ravenna");
            assert_eq!(stored.map(|c| c.area_code), Some(String::new()));
        }
    }

    #[test]
    fn test_dry_run_stages_without_writing() {
        let mut catalog = MemoryCatalog::new();
        let options = ResolverOptions {
            dry_run: true,
            ..ResolverOptions::default()
        };
        let outcome = run(&mut catalog, &options, parsed_city("Ravenna"));
        assert_eq!(outcome.status, ReconcileStatus::Created);
        assert_eq!(outcome.entity.map(|c| c.id), Some(0));
        assert_eq!(catalog.len_of(EntityKind::City), 0);
    }

    #[test]
    fn test_rejected_write_is_captured() {
        let mut catalog = MemoryCatalog::new();
        catalog.fail_writes_for(EntityKind::City);
        let outcome = run(&mut catalog, &ResolverOptions::default(), parsed_city("Ravenna"));
        assert_eq!(outcome.status, ReconcileStatus::Error);
        assert!(outcome.entity.is_none());
        assert_eq!(outcome.error.as_deref(), Some("City write rejected: store refused the write"));
    }

    #[test]
    fn test_diff_log() {
        let mut log = DiffLog::new();
        assert_eq!(log.to_text(), "");
        log.push("City found! #1 Ravenna (RA)");
        let mut other = DiffLog::new();
        other.push("Meeting created: x");
        log.append(&other);
        assert_eq!(log.lines().len(), 2);
        assert_eq!(log.to_text(), "City found! #1 Ravenna (RA)\nMeeting created: x\n");
    }
}
