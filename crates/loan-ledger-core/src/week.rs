//! Monday-to-Sunday billing weeks.
//!
//! A week runs from Monday 00:00:00.000 to Sunday 23:59:59.999 in ledger
//! wall-clock time, and membership is inclusive on both ends.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Which weeks count as elapsed when evaluating arrears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekMode {
    /// Only fully elapsed weeks before the week containing the reference date.
    #[default]
    Current,
    /// Also treat the week containing the reference date as elapsed.
    Next,
}

impl FromStr for WeekMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(WeekMode::Current),
            "next" => Ok(WeekMode::Next),
            other => Err(LedgerError::InvalidInput {
                field: "week_mode".into(),
                reason: format!("expected 'current' or 'next', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for WeekMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekMode::Current => f.write_str("current"),
            WeekMode::Next => f.write_str("next"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBounds {
    pub monday: NaiveDateTime,
    pub sunday: NaiveDateTime,
}

impl WeekBounds {
    /// The week beginning on `monday` (the date is not checked to be a Monday).
    /// `None` when the week runs past the last representable date.
    pub fn starting(monday: NaiveDate) -> Option<Self> {
        let next_start = monday.checked_add_days(Days::new(7))?.and_time(NaiveTime::MIN);
        Some(Self {
            monday: monday.and_time(NaiveTime::MIN),
            sunday: next_start - TimeDelta::milliseconds(1),
        })
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.monday <= t && t <= self.sunday
    }

    pub fn next(&self) -> Option<Self> {
        Self::starting(self.monday.date().checked_add_days(Days::new(7))?)
    }

    pub fn previous(&self) -> Option<Self> {
        Self::starting(self.monday.date().checked_sub_days(Days::new(7))?)
    }
}

/// The week containing `t`, or `None` at the edges of the calendar.
pub fn week_of(t: NaiveDateTime) -> Option<WeekBounds> {
    let date = t.date();
    let back = u64::from(date.weekday().num_days_from_monday());
    WeekBounds::starting(date.checked_sub_days(Days::new(back))?)
}

/// Last instant that counts as elapsed for an evaluation made at `now`.
pub fn evaluation_cutoff(now: NaiveDateTime, mode: WeekMode) -> Option<NaiveDateTime> {
    let this_week = week_of(now)?;
    match mode {
        WeekMode::Current => this_week.previous().map(|w| w.sunday),
        WeekMode::Next => Some(this_week.sunday),
    }
}

/// Every whole week from the one containing `start` up to `cutoff`.
/// A trailing week whose Sunday falls after the cutoff is left out.
pub fn weeks_until(start: NaiveDateTime, cutoff: NaiveDateTime) -> Vec<WeekBounds> {
    let mut weeks = Vec::new();
    let mut current = week_of(start);
    while let Some(week) = current.filter(|w| w.monday <= cutoff) {
        if week.sunday <= cutoff {
            weeks.push(week);
        }
        current = week.next();
    }
    weeks
}
