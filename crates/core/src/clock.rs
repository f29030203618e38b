//! Calendar-day comparisons against "today".
//!
//! Availability is defined per whole calendar day in UTC. Instants are never
//! compared directly; every check truncates to a `NaiveDate` first.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::errors::RegistryError;

/// Wire format for every date the registry stores or accepts.
pub const SPOT_DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one day. Used by tests and by tooling that replays a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Clone)]
pub struct DateClock {
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for DateClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateClock").field("today", &self.today()).finish()
    }
}

impl Default for DateClock {
    fn default() -> Self {
        Self::system()
    }
}

impl DateClock {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self { clock: Arc::new(clock) }
    }

    pub fn system() -> Self {
        Self::new(SystemClock)
    }

    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(FixedClock(today))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn today_string(&self) -> String {
        format_day(self.today())
    }

    /// True iff `day` is strictly before today. Unparseable input is never before.
    pub fn before_today(&self, day: &str) -> bool {
        parse_day(day).map(|parsed| parsed < self.today()).unwrap_or(false)
    }

    /// True iff `day` is strictly after today. Unparseable input is never after.
    pub fn after_today(&self, day: &str) -> bool {
        parse_day(day).map(|parsed| parsed > self.today()).unwrap_or(false)
    }

    pub fn is_today(&self, day: &str) -> bool {
        parse_day(day).map(|parsed| parsed == self.today()).unwrap_or(false)
    }

    /// True when a registration for `day` can never open again: the day is
    /// before today or is not a valid `YYYY-MM-DD` day at all.
    pub fn has_lapsed(&self, day: &str) -> bool {
        parse_day(day).map(|parsed| parsed < self.today()).unwrap_or(true)
    }
}

/// Parses a strict `YYYY-MM-DD` day.
///
/// chrono alone accepts unpadded fields such as `2024-1-5`, so the shape is
/// checked before handing the string to the parser.
pub fn parse_day(input: &str) -> Result<NaiveDate, RegistryError> {
    let bad_date = || RegistryError::BadDate { input: input.to_owned() };

    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(bad_date());
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != 4 && *index != 7)
        .all(|(_, byte)| byte.is_ascii_digit());
    if !digits_ok {
        return Err(bad_date());
    }

    NaiveDate::parse_from_str(input, SPOT_DATE_FORMAT).map_err(|_| bad_date())
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(SPOT_DATE_FORMAT).to_string()
}
