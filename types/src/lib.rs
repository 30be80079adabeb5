use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

// ── Style ────────────────────────────────────────────────────────────────

/// Canonical swimming stroke, keyed by its two-letter federation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleCode {
    /// SL – stile libero
    Freestyle,
    /// DO – dorso
    Backstroke,
    /// RA – rana
    Breaststroke,
    /// FA – farfalla / delfino
    Butterfly,
    /// MI – misti
    Medley,
}

impl StyleCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Freestyle => "SL",
            Self::Backstroke => "DO",
            Self::Breaststroke => "RA",
            Self::Butterfly => "FA",
            Self::Medley => "MI",
        }
    }

    /// Map a two-letter style token (as extracted from an event line) to its stroke.
    ///
    /// The token keeps the source casing, so matching is case-insensitive:
    /// "SL", "st" (from "stile"), "Do", "df"/"dl"/"de" (delfino), "mx".
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sl" | "st" => Some(Self::Freestyle),
            "do" => Some(Self::Backstroke),
            "ra" => Some(Self::Breaststroke),
            "fa" | "df" | "dl" | "de" => Some(Self::Butterfly),
            "mi" | "mx" => Some(Self::Medley),
            _ => None,
        }
    }
}

// ── Heat type ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HeatType {
    /// Timed heats ("serie", "batterie")
    #[default]
    Heats,
    /// Finals ("finali")
    Finals,
}

impl HeatType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Heats => "H",
            Self::Finals => "F",
        }
    }
}

// ── Day part ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Morning before 13:00, afternoon until 18:00, evening after.
    pub fn from_time(time: NaiveTime) -> Self {
        match time.hour() {
            0..=12 => Self::Morning,
            13..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Morning => "M",
            Self::Afternoon => "P",
            Self::Evening => "S",
        }
    }
}

// ── Pool type ────────────────────────────────────────────────────────────

/// Pool course length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolType {
    Metres25,
    Metres33,
    Metres50,
}

impl PoolType {
    pub fn from_length(meters: u32) -> Option<Self> {
        match meters {
            25 => Some(Self::Metres25),
            33 => Some(Self::Metres33),
            50 => Some(Self::Metres50),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Metres25 => "25",
            Self::Metres33 => "33",
            Self::Metres50 => "50",
        }
    }
}

// ── Catalog lock state ───────────────────────────────────────────────────

/// Advisory lock carried by every catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LockState {
    #[default]
    Mutable,
    /// Approved record: never overwritten by reconciliation.
    Locked,
    /// Awaiting human review: left untouched until reviewed.
    PendingReview,
}

impl LockState {
    pub fn allows_update(&self) -> bool {
        matches!(self, Self::Mutable)
    }
}

// ── Reconciliation status ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    Created,
    Updated,
    Unchanged,
    Error,
}

// ── Parsed program ───────────────────────────────────────────────────────

/// One race definition extracted from an event line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub style: StyleCode,
    pub length_in_meters: u32,
    pub is_relay: bool,
    /// Legs per relay; 1 for individual events.
    pub relay_phases: u32,
    pub heat_type: HeatType,
    pub out_of_race: bool,
}

impl EventDescriptor {
    /// Short label such as "100 DO" or "4x50 SL".
    pub fn label(&self) -> String {
        if self.is_relay {
            format!(
                "{}x{} {}",
                self.relay_phases,
                self.length_in_meters,
                self.style.code()
            )
        } else {
            format!("{} {}", self.length_in_meters, self.style.code())
        }
    }
}

/// One session (date + day part) of a meeting program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub scheduled_date: NaiveDate,
    /// Day-of-month token as written, e.g. "12"
    pub day_token: String,
    /// Month name as written, e.g. "marzo"
    pub month_token: String,
    /// 1-based position in the program
    pub session_order: u32,
    /// Normalized "HH:MM" start time, when announced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_part: Option<DayPart>,
    pub events: Vec<EventDescriptor>,
    /// The line that opened this session
    pub source_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_fragment: Option<String>,
}

impl SessionDescriptor {
    pub fn begin_time(&self) -> Option<NaiveTime> {
        self.start_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
    }
}

/// Decomposed pool description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    pub name_tokens: Vec<String>,
    /// Street and house number components, e.g. ["Via Pirandello", "13"]
    pub address_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<PoolType>,
    pub lanes_number: u32,
}

impl PoolDescriptor {
    pub fn name(&self) -> String {
        self.name_tokens.join(" ")
    }

    pub fn address(&self) -> String {
        self.address_tokens.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_token_keeps_case_insensitive() {
        assert_eq!(StyleCode::from_token("SL"), Some(StyleCode::Freestyle));
        assert_eq!(StyleCode::from_token("st"), Some(StyleCode::Freestyle));
        assert_eq!(StyleCode::from_token("Do"), Some(StyleCode::Backstroke));
        assert_eq!(StyleCode::from_token("df"), Some(StyleCode::Butterfly));
        assert_eq!(StyleCode::from_token("MX"), Some(StyleCode::Medley));
        assert_eq!(StyleCode::from_token("xx"), None);
    }

    #[test]
    fn test_day_part_boundaries() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(DayPart::from_time(t(9, 30)), DayPart::Morning);
        assert_eq!(DayPart::from_time(t(12, 59)), DayPart::Morning);
        assert_eq!(DayPart::from_time(t(13, 0)), DayPart::Afternoon);
        assert_eq!(DayPart::from_time(t(18, 0)), DayPart::Evening);
    }

    #[test]
    fn test_event_label() {
        let relay = EventDescriptor {
            style: StyleCode::Medley,
            length_in_meters: 50,
            is_relay: true,
            relay_phases: 4,
            heat_type: HeatType::Heats,
            out_of_race: false,
        };
        assert_eq!(relay.label(), "4x50 MI");
        let single = EventDescriptor {
            is_relay: false,
            relay_phases: 1,
            length_in_meters: 200,
            ..relay
        };
        assert_eq!(single.label(), "200 MI");
    }

    #[test]
    fn test_pool_type_codes() {
        assert_eq!(PoolType::from_length(25).map(|p| p.code()), Some("25"));
        assert_eq!(PoolType::from_length(50).map(|p| p.code()), Some("50"));
        assert_eq!(PoolType::from_length(40), None);
        assert!(LockState::Mutable.allows_update());
        assert!(!LockState::Locked.allows_update());
        assert!(!LockState::PendingReview.allows_update());
    }
}
