//! Serial calendar batch: one row fully reconciled before the next.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use meet_types::SessionDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogTable, City, Entity, EntityKind, Geocoder, Meeting, SwimmingPool};
use crate::city::search_composed_name;
use crate::error::BatchError;
use crate::normalize::get_meeting_code;
use crate::parser::parse_program;
use crate::pool::parse_pool_descriptor;
use crate::resolver::{
    CityResolver, DiffLog, MeetingEventResolver, MeetingResolver, MeetingSessionResolver,
    Resolver, ResolverOptions, SwimmingPoolResolver,
};

/// One entry of the federation calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub meeting_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    pub scheduled_date: NaiveDate,
    pub season_id: u32,
    #[serde(default)]
    pub program_text: Option<String>,
    #[serde(default)]
    pub program_file: Option<PathBuf>,
}

impl CalendarRow {
    /// Inline text wins over the file; a row with neither has an empty program.
    fn program(&self) -> Result<String, BatchError> {
        if let Some(text) = &self.program_text {
            return Ok(text.clone());
        }
        match &self.program_file {
            Some(path) => fs::read_to_string(path).map_err(|source| BatchError::Program {
                path: path.display().to_string(),
                source,
            }),
            None => Ok(String::new()),
        }
    }

    /// Code reported for a row whose meeting never resolved.
    fn code(&self) -> String {
        get_meeting_code(&self.meeting_name, self.city.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub code: String,
    pub detail: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
    pub created_codes: Vec<String>,
    pub updated_codes: Vec<String>,
    pub error_rows: Vec<RowError>,
    /// Rows left unprocessed after a cancellation request
    pub cancelled: bool,
    #[serde(skip)]
    pub diff: DiffLog,
}

#[derive(Debug, Default)]
struct RowTally {
    /// Code of the resolved meeting
    code: Option<String>,
    created: bool,
    updated: bool,
    errors: Vec<String>,
}

impl RowTally {
    fn absorb<R: Resolver>(&mut self, resolver: &R, log: &mut DiffLog) {
        resolver.report(log);
        self.created |= resolver.has_created();
        self.updated |= resolver.has_updated();
        self.errors.extend(
            resolver
                .outcomes()
                .iter()
                .filter_map(|o| o.error.clone())
                .map(|e| format!("{}: {e}", <R::Entity as Entity>::KIND)),
        );
    }
}

pub struct BatchJob<'g> {
    options: ResolverOptions,
    default_lanes: u32,
    geocoder: Option<&'g dyn Geocoder>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'g> BatchJob<'g> {
    pub fn new(options: ResolverOptions, default_lanes: u32) -> Self {
        BatchJob {
            options,
            default_lanes,
            geocoder: None,
            cancel: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: &'g dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Checked between rows; a row in progress always completes.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn run<C: Catalog + ?Sized>(&self, catalog: &mut C, rows: &[CalendarRow]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for row in rows {
            if self.cancelled() {
                info!(remaining = rows.len() - summary.processed, "batch cancelled");
                summary.cancelled = true;
                break;
            }
            summary.diff.push(format!("── {} [{}] ──", row.meeting_name, row.scheduled_date));

            let mut log = DiffLog::new();
            let mut tally = RowTally::default();
            let result = self.process_row(catalog, row, &mut tally, &mut log);
            summary.diff.append(&log);
            summary.processed += 1;

            let code = tally.code.take().unwrap_or_else(|| row.code());
            if let Err(err) = result {
                warn!(code = %code, error = %err, "row failed");
                summary.diff.push(format!("Row failed: {err}"));
                tally.errors.push(err.to_string());
            }

            if !tally.errors.is_empty() {
                summary.errors += 1;
                summary.error_rows.push(RowError {
                    code: code.clone(),
                    detail: tally.errors.join("; "),
                });
            }
            if tally.created {
                summary.created += 1;
                summary.created_codes.push(code);
            } else if tally.updated {
                summary.updated += 1;
                summary.updated_codes.push(code);
            } else if tally.errors.is_empty() {
                summary.unchanged += 1;
            }
        }
        info!(
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            errors = summary.errors,
            "batch done"
        );
        summary
    }

    fn process_row<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        row: &CalendarRow,
        tally: &mut RowTally,
        log: &mut DiffLog,
    ) -> Result<(), BatchError> {
        let program = row.program()?;
        let sessions = parse_program(&program, row.scheduled_date);

        let city = self.resolve_city(catalog, row, &sessions, tally, log)?;
        let pools = self.resolve_pools(catalog, &city, &program, &sessions, tally, log);

        let mut meeting_resolver = MeetingResolver::new(
            &row.meeting_name,
            &city.name,
            row.season_id,
            row.scheduled_date,
            self.options.clone(),
        )?;
        meeting_resolver.find_or_create(catalog);
        tally.absorb(&meeting_resolver, log);
        let meeting: Meeting = meeting_resolver
            .result_entity()
            .cloned()
            .ok_or_else(|| unresolved(EntityKind::Meeting, tally))?;
        tally.code = Some(meeting.code.clone());

        for descriptor in &sessions {
            let pool = descriptor
                .pool_fragment
                .as_ref()
                .and_then(|f| pools.get(f))
                .and_then(Option::as_ref);
            let mut session_resolver =
                MeetingSessionResolver::new(&meeting, descriptor, pool, self.options.clone())?;
            session_resolver.find_or_create(catalog);
            tally.absorb(&session_resolver, log);
            let Some(session) = session_resolver.result_entity().cloned() else {
                continue;
            };

            let mut event_resolver =
                MeetingEventResolver::new(&session, &descriptor.events, self.options.clone())?;
            event_resolver.find_or_create(catalog);
            tally.absorb(&event_resolver, log);
        }
        Ok(())
    }

    fn resolve_city<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        row: &CalendarRow,
        sessions: &[SessionDescriptor],
        tally: &mut RowTally,
        log: &mut DiffLog,
    ) -> Result<City, BatchError> {
        let name = match row.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => name.to_string(),
            None => self.infer_city(catalog, row, sessions).unwrap_or_default(),
        };
        let mut resolver = CityResolver::new(
            &name,
            row.area_code.as_deref().unwrap_or_default(),
            row.country_code.as_deref().unwrap_or_default(),
            self.options.clone(),
        )?;
        if let Some(geocoder) = self.geocoder {
            resolver = resolver.with_geocoder(geocoder);
        }
        resolver.find_or_create(catalog);
        tally.absorb(&resolver, log);
        resolver
            .result_entity()
            .cloned()
            .ok_or_else(|| unresolved(EntityKind::City, tally))
    }

    /// A known city named inside a pool fragment or the meeting title.
    fn infer_city<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        row: &CalendarRow,
        sessions: &[SessionDescriptor],
    ) -> Option<String> {
        let cities: Vec<City> = CatalogTable::<City>::candidates(catalog, None);
        let thresholds = self.options.thresholds;
        sessions
            .iter()
            .filter_map(|s| s.pool_fragment.as_deref())
            .chain(std::iter::once(row.meeting_name.as_str()))
            .find_map(|text| search_composed_name(text, &cities, |c| c.name.clone(), thresholds))
            .map(|c| c.name.clone())
    }

    /// One pool per distinct fragment; unresolvable fragments map to `None`.
    fn resolve_pools<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        city: &City,
        program: &str,
        sessions: &[SessionDescriptor],
        tally: &mut RowTally,
        log: &mut DiffLog,
    ) -> HashMap<String, Option<SwimmingPool>> {
        let mut pools = HashMap::new();
        for fragment in sessions.iter().filter_map(|s| s.pool_fragment.as_ref()) {
            if pools.contains_key(fragment) {
                continue;
            }
            let descriptor = parse_pool_descriptor(fragment, &city.name, program, self.default_lanes);
            let pool = match SwimmingPoolResolver::new(&descriptor, city, self.options.clone()) {
                Ok(resolver) => {
                    let mut resolver = match self.geocoder {
                        Some(geocoder) => resolver.with_geocoder(geocoder),
                        None => resolver,
                    };
                    resolver.find_or_create(catalog);
                    tally.absorb(&resolver, log);
                    resolver.result_entity().cloned()
                }
                Err(err) => {
                    log.push(format!("Swimming Pool skipped: {err} in '{fragment}'"));
                    None
                }
            };
            pools.insert(fragment.clone(), pool);
        }
        pools
    }
}

fn unresolved(kind: EntityKind, tally: &RowTally) -> BatchError {
    BatchError::Unresolved {
        kind,
        detail: tally
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| "no entity".to_string()),
    }
}
