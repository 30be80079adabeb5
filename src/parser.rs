use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use meet_types::{DayPart, SessionDescriptor};
use regex::Regex;
use tracing::debug;

use crate::classifier::{LineClass, MONTHS, contains_pool, find_date, find_time, get_filtered_program_lines, month_number};
use crate::event::{decode_event, event_line_token_splitter, heat_type_of_line, is_warmup_token};
use crate::pool::extract_possible_pool_definition;

// ── Program layout ───────────────────────────────────────────────────
//
// Real data examples:
//   Piscina Comunale "Darsena", via Pirandello 13 - Ravenna
//   Sabato 12 marzo 2022
//   ore 15.00 riscaldamento - ore 15.30 inizio gare
//   400 SL - 100 DO - 50 FA - staff 4x50 MI
//   Domenica 13 marzo
//   ore 9.00 riscaldamento
//   ore 9.30 inizio gare: 200 MI - 100 SL
//   ore 15.30 Finali 50 SL - 100 RA fuori gara
//
// A date line opens a session; a time marker in another part of the same day
// opens the next one. Event tokens go to the session open at that point.

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year"));

/// Date context carried between lines.
#[derive(Debug, Clone)]
struct DateContext {
    date: NaiveDate,
    day_token: String,
    month_token: String,
    source_line: String,
}

/// Single forward pass over the filtered program lines of one announcement.
pub struct ProgramParser<'t> {
    text: &'t str,
    reference_date: NaiveDate,
    sessions: Vec<SessionDescriptor>,
}

impl<'t> ProgramParser<'t> {
    /// `reference_date` supplies the year when a date line has none, and the
    /// date of events announced before any date line.
    pub fn new(text: &'t str, reference_date: NaiveDate) -> Self {
        ProgramParser {
            text,
            reference_date,
            sessions: Vec::new(),
        }
    }

    pub fn sessions(&self) -> &[SessionDescriptor] {
        &self.sessions
    }

    pub fn into_sessions(self) -> Vec<SessionDescriptor> {
        self.sessions
    }

    /// Rebuild the session list from the text. Deterministic; lines that
    /// cannot be placed are dropped.
    pub fn parse(&mut self) -> &[SessionDescriptor] {
        let mut sessions: Vec<SessionDescriptor> = Vec::new();
        let mut current_date: Option<DateContext> = None;
        let mut pending_pool = self.preamble_pool();

        for line in get_filtered_program_lines(self.text) {
            let class = LineClass::of(line);

            if class.pool
                && let Some(fragment) = extract_possible_pool_definition(self.text, line)
            {
                if let Some(session) = sessions.last_mut()
                    && session.events.is_empty()
                {
                    session.pool_fragment = Some(fragment.clone());
                }
                pending_pool = Some(fragment);
                if !(class.date || class.time || class.has_event()) {
                    continue;
                }
            }

            // Footnote dates are deadlines and postponements, never sessions
            if class.footnote {
                debug!(line, "footnote consumed without effect");
                continue;
            }

            if class.date
                && let Some(context) = self.date_context(line)
            {
                let same_day = current_date.as_ref().is_some_and(|c| c.date == context.date);
                if !same_day {
                    debug!(line, date = %context.date, "session opened by date");
                    sessions.push(open_session(&context, None, &pending_pool));
                }
                current_date = Some(context);
            }

            let heat_type = heat_type_of_line(line);
            for token in event_line_token_splitter(line) {
                if is_warmup_token(&token) {
                    continue;
                }

                if let Some((hour, minute)) = find_time(&token) {
                    let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
                        debug!(token, "invalid time");
                        continue;
                    };
                    let context = current_date.get_or_insert_with(|| self.fallback_context(line));
                    let day_part = DayPart::from_time(time);
                    match sessions.last_mut() {
                        Some(session)
                            if session.scheduled_date == context.date
                                && session.day_part.is_none_or(|p| p == day_part) =>
                        {
                            if session.start_time.is_none() {
                                session.start_time = Some(time.format("%H:%M").to_string());
                                session.day_part = Some(day_part);
                            }
                        }
                        _ => {
                            debug!(line, %time, "session opened by time");
                            let mut context = context.clone();
                            context.source_line = line.to_string();
                            sessions.push(open_session(&context, Some(time), &pending_pool));
                        }
                    }
                    continue;
                }

                if class.skippable {
                    debug!(token, "event-like token in boilerplate ignored");
                    continue;
                }
                let Some(event) = decode_event(&token, heat_type) else {
                    debug!(token, "undecodable event token");
                    continue;
                };
                if sessions.is_empty() {
                    let context = current_date.get_or_insert_with(|| self.fallback_context(line));
                    debug!(line, "implicit session for events without date");
                    sessions.push(open_session(context, None, &pending_pool));
                }
                if let Some(session) = sessions.last_mut() {
                    session.events.push(event);
                }
            }
        }

        let before = sessions.len();
        sessions.retain(|s| s.start_time.is_some() || !s.events.is_empty());
        if sessions.len() != before {
            debug!(dropped = before - sessions.len(), "sessions without time or events dropped");
        }
        for (idx, session) in sessions.iter_mut().enumerate() {
            session.session_order = idx as u32 + 1;
        }

        self.sessions = sessions;
        &self.sessions
    }

    /// Street line standing in for a pool when no facility keyword appears.
    fn preamble_pool(&self) -> Option<String> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !contains_pool(l))
            .find_map(|l| extract_possible_pool_definition(self.text, l))
    }

    fn date_context(&self, line: &str) -> Option<DateContext> {
        let (day_token, month_token) = find_date(line)?;
        let day: u32 = day_token.parse().ok()?;
        let month = month_number(&month_token)?;
        let year = YEAR
            .captures(line)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or_else(|| self.reference_date.year());
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            debug!(line, "impossible date");
            return None;
        };
        Some(DateContext {
            date,
            day_token,
            month_token,
            source_line: line.to_string(),
        })
    }

    fn fallback_context(&self, line: &str) -> DateContext {
        let date = self.reference_date;
        DateContext {
            date,
            day_token: date.day().to_string(),
            month_token: MONTHS[date.month0() as usize].to_string(),
            source_line: line.to_string(),
        }
    }
}

fn open_session(
    context: &DateContext,
    start_time: Option<NaiveTime>,
    pool_fragment: &Option<String>,
) -> SessionDescriptor {
    SessionDescriptor {
        scheduled_date: context.date,
        day_token: context.day_token.clone(),
        month_token: context.month_token.clone(),
        session_order: 0,
        start_time: start_time.map(|t| t.format("%H:%M").to_string()),
        day_part: start_time.map(DayPart::from_time),
        events: Vec::new(),
        source_line: context.source_line.clone(),
        pool_fragment: pool_fragment.clone(),
    }
}

/// Parse an announcement in one call.
pub fn parse_program(text: &str, reference_date: NaiveDate) -> Vec<SessionDescriptor> {
    let mut parser = ProgramParser::new(text, reference_date);
    parser.parse();
    parser.into_sessions()
}
