//! Catalog store interface.
//!
//! The persisted catalog is an external collaborator: resolvers only see
//! [`CatalogTable`] for each entity kind. Lookups return owned copies, so a
//! backend can be a database, a remote service or [`MemoryCatalog`].

mod geocoder;
mod memory;

use std::fmt;

use chrono::NaiveDate;
use meet_types::{DayPart, HeatType, LockState, PoolType, StyleCode};
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;

pub use geocoder::{GazetteerGeocoder, Geocoder, PlaceResult};
pub use memory::{MemoryCatalog, Table};

// ── Entity kinds ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    City,
    SwimmingPool,
    Meeting,
    MeetingSession,
    MeetingEvent,
}

impl EntityKind {
    /// Table name used in SQL-like diff lines.
    pub fn table(&self) -> &'static str {
        match self {
            Self::City => "cities",
            Self::SwimmingPool => "swimming_pools",
            Self::Meeting => "meetings",
            Self::MeetingSession => "meeting_sessions",
            Self::MeetingEvent => "meeting_events",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Self::City => "City",
            Self::SwimmingPool => "Swimming Pool",
            Self::Meeting => "Meeting",
            Self::MeetingSession => "Meeting Session",
            Self::MeetingEvent => "Meeting Event",
        };
        f.write_str(title)
    }
}

/// Opaque identity stamped on every created or updated record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActingUser(String);

impl ActingUser {
    pub fn new(name: impl Into<String>) -> Self {
        ActingUser(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for ActingUser {
    fn default() -> Self {
        ActingUser::new("batch")
    }
}

// ── SQL literal helpers ──────────────────────────────────────────────

pub(crate) fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

fn sql_opt_str(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), sql_str)
}

// ── Entity contract ──────────────────────────────────────────────────

/// A catalog record as seen by the resolvers.
pub trait Entity: Clone + fmt::Debug {
    const KIND: EntityKind;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn lock(&self) -> LockState;
    fn stamp(&mut self, user: &ActingUser);

    /// Parent record narrowing lookups (city of a pool, meeting of a session).
    fn scope(&self) -> Option<u64>;
    /// Normalized key for exact lookup within the scope.
    fn lookup_key(&self) -> String;
    /// Human label used in diff lines.
    fn label(&self) -> String;
    /// Column name and SQL literal pairs, identity and audit columns excluded.
    fn fields(&self) -> Vec<(&'static str, String)>;
    /// This record with the parsed values applied; identity and lock are kept.
    fn merged_with(&self, parsed: &Self) -> Self;
}

macro_rules! audit_fields {
    () => {
        fn id(&self) -> u64 {
            self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = id;
        }

        fn lock(&self) -> LockState {
            self.lock
        }

        fn stamp(&mut self, user: &ActingUser) {
            self.updated_by = user.name().to_string();
        }
    };
}

// ── Records ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    pub id: u64,
    pub name: String,
    /// Province code, e.g. "RA"
    pub area_code: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub lock: LockState,
    #[serde(default)]
    pub updated_by: String,
}

impl Entity for City {
    const KIND: EntityKind = EntityKind::City;
    audit_fields!();

    fn scope(&self) -> Option<u64> {
        None
    }

    fn lookup_key(&self) -> String {
        crate::normalize::fold_key(&self.name)
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, self.area_code)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", sql_str(&self.name)),
            ("area_code", sql_str(&self.area_code)),
            ("country_code", sql_str(&self.country_code)),
            ("latitude", sql_opt(self.latitude)),
            ("longitude", sql_opt(self.longitude)),
        ]
    }

    /// Fills gaps only: a known city keeps its name and codes.
    fn merged_with(&self, parsed: &Self) -> Self {
        let fill = |current: &str, new: &str| {
            if current.trim().is_empty() {
                new.to_string()
            } else {
                current.to_string()
            }
        };
        City {
            area_code: fill(&self.area_code, &parsed.area_code),
            country_code: fill(&self.country_code, &parsed.country_code),
            latitude: self.latitude.or(parsed.latitude),
            longitude: self.longitude.or(parsed.longitude),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwimmingPool {
    pub id: u64,
    pub name: String,
    pub nick_name: String,
    pub address: String,
    pub city_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<PoolType>,
    pub lanes_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub lock: LockState,
    #[serde(default)]
    pub updated_by: String,
}

impl Entity for SwimmingPool {
    const KIND: EntityKind = EntityKind::SwimmingPool;
    audit_fields!();

    fn scope(&self) -> Option<u64> {
        Some(self.city_id)
    }

    fn lookup_key(&self) -> String {
        self.nick_name.clone()
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.name, self.nick_name)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", sql_str(&self.name)),
            ("nick_name", sql_str(&self.nick_name)),
            ("address", sql_str(&self.address)),
            ("city_id", self.city_id.to_string()),
            ("pool_type", sql_opt_str(self.pool_type.map(|p| p.code()))),
            ("lanes_number", self.lanes_number.to_string()),
            ("latitude", sql_opt(self.latitude)),
            ("longitude", sql_opt(self.longitude)),
        ]
    }

    fn merged_with(&self, parsed: &Self) -> Self {
        SwimmingPool {
            address: if self.address.trim().is_empty() {
                parsed.address.clone()
            } else {
                self.address.clone()
            },
            pool_type: self.pool_type.or(parsed.pool_type),
            lanes_number: if self.lanes_number == 0 {
                parsed.lanes_number
            } else {
                self.lanes_number
            },
            latitude: self.latitude.or(parsed.latitude),
            longitude: self.longitude.or(parsed.longitude),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: u64,
    pub code: String,
    pub description: String,
    pub season_id: u32,
    pub header_date: NaiveDate,
    #[serde(default)]
    pub lock: LockState,
    #[serde(default)]
    pub updated_by: String,
}

impl Entity for Meeting {
    const KIND: EntityKind = EntityKind::Meeting;
    audit_fields!();

    fn scope(&self) -> Option<u64> {
        Some(u64::from(self.season_id))
    }

    fn lookup_key(&self) -> String {
        self.code.clone()
    }

    fn label(&self) -> String {
        format!("{} [{}]", self.description, self.code)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("code", sql_str(&self.code)),
            ("description", sql_str(&self.description)),
            ("season_id", self.season_id.to_string()),
            ("header_date", sql_str(&self.header_date.to_string())),
        ]
    }

    /// The calendar is authoritative for description and date.
    fn merged_with(&self, parsed: &Self) -> Self {
        Meeting {
            description: parsed.description.clone(),
            header_date: parsed.header_date,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSession {
    pub id: u64,
    pub meeting_id: u64,
    pub session_order: u32,
    pub scheduled_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_part: Option<DayPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swimming_pool_id: Option<u64>,
    pub description: String,
    #[serde(default)]
    pub lock: LockState,
    #[serde(default)]
    pub updated_by: String,
}

impl Entity for MeetingSession {
    const KIND: EntityKind = EntityKind::MeetingSession;
    audit_fields!();

    fn scope(&self) -> Option<u64> {
        Some(self.meeting_id)
    }

    fn lookup_key(&self) -> String {
        format!("{}#{}", self.scheduled_date, self.session_order)
    }

    fn label(&self) -> String {
        format!("#{} {}", self.session_order, self.description)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("meeting_id", self.meeting_id.to_string()),
            ("session_order", self.session_order.to_string()),
            ("scheduled_date", sql_str(&self.scheduled_date.to_string())),
            ("begin_time", sql_opt_str(self.begin_time.as_deref())),
            ("day_part", sql_opt_str(self.day_part.map(|p| p.code()))),
            ("swimming_pool_id", sql_opt(self.swimming_pool_id)),
            ("description", sql_str(&self.description)),
        ]
    }

    fn merged_with(&self, parsed: &Self) -> Self {
        MeetingSession {
            session_order: parsed.session_order,
            begin_time: parsed.begin_time.clone().or_else(|| self.begin_time.clone()),
            day_part: parsed.day_part.or(self.day_part),
            swimming_pool_id: parsed.swimming_pool_id.or(self.swimming_pool_id),
            description: parsed.description.clone(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingEvent {
    pub id: u64,
    pub meeting_session_id: u64,
    pub event_order: u32,
    pub style: StyleCode,
    pub length_in_meters: u32,
    pub is_relay: bool,
    pub relay_phases: u32,
    pub heat_type: HeatType,
    pub out_of_race: bool,
    #[serde(default)]
    pub lock: LockState,
    #[serde(default)]
    pub updated_by: String,
}

impl MeetingEvent {
    /// "4x50MIH", "200DOF"
    pub fn race_code(&self) -> String {
        let legs = if self.is_relay {
            format!("{}x", self.relay_phases)
        } else {
            String::new()
        };
        format!(
            "{legs}{}{}{}",
            self.length_in_meters,
            self.style.code(),
            self.heat_type.code()
        )
    }
}

impl Entity for MeetingEvent {
    const KIND: EntityKind = EntityKind::MeetingEvent;
    audit_fields!();

    fn scope(&self) -> Option<u64> {
        Some(self.meeting_session_id)
    }

    /// "3#4x50MIH": a race repeated within the session keeps one record per position.
    fn lookup_key(&self) -> String {
        format!("{}#{}", self.event_order, self.race_code())
    }

    fn label(&self) -> String {
        self.race_code()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("meeting_session_id", self.meeting_session_id.to_string()),
            ("event_order", self.event_order.to_string()),
            ("style", sql_str(self.style.code())),
            ("length_in_meters", self.length_in_meters.to_string()),
            ("is_relay", self.is_relay.to_string()),
            ("relay_phases", self.relay_phases.to_string()),
            ("heat_type", sql_str(self.heat_type.code())),
            ("out_of_race", self.out_of_race.to_string()),
        ]
    }

    fn merged_with(&self, parsed: &Self) -> Self {
        MeetingEvent {
            event_order: parsed.event_order,
            heat_type: parsed.heat_type,
            out_of_race: parsed.out_of_race,
            ..self.clone()
        }
    }
}

// ── Store traits ─────────────────────────────────────────────────────

/// Persistence for one entity kind.
pub trait CatalogTable<E: Entity> {
    /// Exact match on [`Entity::lookup_key`] within `scope` (all records when `None`).
    fn find_by_key(&self, scope: Option<u64>, key: &str) -> Option<E>;

    /// Records that may plausibly match, narrowed to `scope` when given.
    fn candidates(&self, scope: Option<u64>) -> Vec<E>;

    /// Persist a new record; the returned copy carries its assigned id.
    fn create(&mut self, entity: E) -> CatalogResult<E>;

    /// Overwrite the record with the same id.
    fn update(&mut self, entity: &E) -> CatalogResult<()>;
}

/// A store covering every entity kind the pipeline reconciles.
pub trait Catalog:
    CatalogTable<City>
    + CatalogTable<SwimmingPool>
    + CatalogTable<Meeting>
    + CatalogTable<MeetingSession>
    + CatalogTable<MeetingEvent>
{
}

impl<T> Catalog for T where
    T: CatalogTable<City>
        + CatalogTable<SwimmingPool>
        + CatalogTable<Meeting>
        + CatalogTable<MeetingSession>
        + CatalogTable<MeetingEvent>
{
}
