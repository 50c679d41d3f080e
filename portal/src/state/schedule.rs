//! Doctor availability: bookable weekdays and the daily consultation window.
//!
//! Dates and times on the wire are `YYYY-MM-DD` and 24-hour `HH:MM`; the
//! window is echoed back to the user in 12-hour form (`09:00AM`).

#[cfg(test)]
#[path = "schedule_test.rs"]
mod schedule_test;

use std::fmt;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, Time, Weekday};
use tracing::debug;

use crate::net::types::DoctorProfile;

/// Upper bound on dates listed by [`Availability::upcoming_dates`].
pub const MAX_UPCOMING_DATES: usize = 366;

const WIRE_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const WIRE_TIME: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const WIRE_TIME_SECONDS: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const DISPLAY_TIME: &[BorrowedFormatItem<'static>] = format_description!("[hour repr:12]:[minute][period]");
const DISPLAY_TIME_INPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12 padding:none]:[minute][period case_sensitive:false]");
const DISPLAY_TIME_INPUT_SPACED: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12 padding:none]:[minute] [period case_sensitive:false]");

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("{0} is not one of the doctor's available days")]
    UnavailableDay(Weekday),
    #[error("Please select a date from today onward")]
    PastDate,
    #[error("Please select between {start} ~ {end}")]
    OutsideWindow { start: String, end: String },
    #[error("End time must not be before start time")]
    ReversedRange,
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid time `{0}`, expected HH:MM")]
    InvalidTime(String),
}

/// Today's date in UTC.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// # Errors
///
/// Returns [`ScheduleError::InvalidDate`] unless `raw` is `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<Date, ScheduleError> {
    Date::parse(raw.trim(), WIRE_DATE).map_err(|_| ScheduleError::InvalidDate(raw.to_owned()))
}

/// Accepts `HH:MM`, `HH:MM:SS`, or 12-hour `9:30AM` / `9:30 pm`.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidTime`] for anything else.
pub fn parse_time(raw: &str) -> Result<Time, ScheduleError> {
    let trimmed = raw.trim();
    [WIRE_TIME, WIRE_TIME_SECONDS, DISPLAY_TIME_INPUT, DISPLAY_TIME_INPUT_SPACED]
        .into_iter()
        .find_map(|format| Time::parse(trimmed, format).ok())
        .ok_or_else(|| ScheduleError::InvalidTime(raw.to_owned()))
}

#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(WIRE_DATE).unwrap_or_default()
}

#[must_use]
pub fn format_time(time: Time) -> String {
    time.format(WIRE_TIME).unwrap_or_default()
}

/// `09:00AM`.
#[must_use]
pub fn format_time_12h(time: Time) -> String {
    time.format(DISPLAY_TIME).unwrap_or_default()
}

/// Full or three-letter English day names, any case.
#[must_use]
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let lowered = raw.trim().to_ascii_lowercase();
    let day = match lowered.get(..3)? {
        "mon" => Weekday::Monday,
        "tue" => Weekday::Tuesday,
        "wed" => Weekday::Wednesday,
        "thu" => Weekday::Thursday,
        "fri" => Weekday::Friday,
        "sat" => Weekday::Saturday,
        "sun" => Weekday::Sunday,
        _ => return None,
    };
    let full = day.to_string().to_ascii_lowercase();
    (lowered.len() == 3 || lowered == full).then_some(day)
}

/// Requested consultation slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

impl TimeRange {
    /// # Errors
    ///
    /// Returns [`ScheduleError::ReversedRange`] when `end` precedes `start`.
    pub fn new(start: Time, end: Time) -> Result<Self, ScheduleError> {
        if end < start {
            return Err(ScheduleError::ReversedRange);
        }
        Ok(Self { start, end })
    }

    /// # Errors
    ///
    /// Returns a parse error for either end, or [`ScheduleError::ReversedRange`].
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// `["HH:MM", "HH:MM"]` as the appointments endpoint expects.
    #[must_use]
    pub fn to_wire(&self) -> [String; 2] {
        [format_time(self.start), format_time(self.end)]
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", format_time_12h(self.start), format_time_12h(self.end))
    }
}

/// When a doctor takes appointments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    days: Vec<Weekday>,
    window: Option<(Time, Time)>,
}

impl Availability {
    #[must_use]
    pub fn new(days: Vec<Weekday>, window: Option<(Time, Time)>) -> Self {
        Self { days, window }
    }

    /// Unknown day names and unparseable hours are ignored.
    #[must_use]
    pub fn from_profile(profile: &DoctorProfile) -> Self {
        let days = profile
            .days_available
            .iter()
            .filter_map(|raw| {
                let day = parse_weekday(raw);
                if day.is_none() {
                    debug!(day = %raw, "ignoring unknown weekday");
                }
                day
            })
            .collect();
        let start = profile.time_start.as_deref().and_then(|raw| parse_time(raw).ok());
        let end = profile.time_end.as_deref().and_then(|raw| parse_time(raw).ok());
        let window = start.zip(end);
        Self { days, window }
    }

    #[must_use]
    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    #[must_use]
    pub fn window(&self) -> Option<(Time, Time)> {
        self.window
    }

    /// `09:00AM ~ 05:00PM`, when hours are set.
    #[must_use]
    pub fn window_label(&self) -> Option<String> {
        self.window
            .map(|(start, end)| format!("{} ~ {}", format_time_12h(start), format_time_12h(end)))
    }

    #[must_use]
    pub fn is_available_on(&self, date: Date) -> bool {
        self.days.contains(&date.weekday())
    }

    /// A date is selectable when it is not in the past and falls on an
    /// available weekday.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::PastDate`] or [`ScheduleError::UnavailableDay`].
    pub fn check_date(&self, date: Date, today: Date) -> Result<Date, ScheduleError> {
        if date < today {
            return Err(ScheduleError::PastDate);
        }
        if !self.is_available_on(date) {
            return Err(ScheduleError::UnavailableDay(date.weekday()));
        }
        Ok(date)
    }

    /// Both ends must sit inside the window, boundaries included. Without
    /// configured hours any slot is accepted.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::OutsideWindow`] echoing the window bounds.
    pub fn check_time(&self, range: TimeRange) -> Result<TimeRange, ScheduleError> {
        let Some((start, end)) = self.window else {
            return Ok(range);
        };
        let within = |time: Time| time >= start && time <= end;
        if within(range.start) && within(range.end) {
            return Ok(range);
        }
        Err(ScheduleError::OutsideWindow { start: format_time_12h(start), end: format_time_12h(end) })
    }

    /// The next `count` selectable dates starting at `from`, at most a
    /// year's worth.
    #[must_use]
    pub fn upcoming_dates(&self, from: Date, count: usize) -> Vec<Date> {
        if self.days.is_empty() {
            return Vec::new();
        }
        let count = count.min(MAX_UPCOMING_DATES);
        let mut dates = Vec::with_capacity(count);
        let mut cursor = from;
        while dates.len() < count {
            if self.is_available_on(cursor) {
                dates.push(cursor);
            }
            let Some(next) = cursor.checked_add(Duration::days(1)) else {
                break;
            };
            cursor = next;
        }
        dates
    }
}
