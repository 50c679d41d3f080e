//! Field schemas for the portal's data-entry forms.
//!
//! Each form serializes to the JSON body its endpoint expects and
//! implements [`Validate`] with the inline messages shown to the user.

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use super::{INVALID_TYPE, REQUIRED, Validate, Violations};

// =============================================================================
// APPROVALS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Confirmed,
    Rejected,
}

impl ApprovalStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" | "confirm" | "approve" | "approved" => Ok(Self::Confirmed),
            "rejected" | "reject" => Ok(Self::Rejected),
            other => Err(format!("unknown approval status `{other}`")),
        }
    }
}

/// Admin decision on a doctor verification, or a doctor's decision on an
/// appointment. A rejection must carry remarks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ApprovalDecision {
    #[must_use]
    pub fn confirm() -> Self {
        Self { status: Some(ApprovalStatus::Confirmed), remarks: None }
    }

    #[must_use]
    pub fn reject(remarks: &str) -> Self {
        Self { status: Some(ApprovalStatus::Rejected), remarks: Some(remarks.to_owned()) }
    }
}

impl Validate for ApprovalDecision {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        match self.status {
            None => violations.push("status", REQUIRED),
            Some(ApprovalStatus::Rejected) => violations.required("remarks", self.remarks.as_deref(), REQUIRED),
            Some(ApprovalStatus::Confirmed) => {}
        }
        violations
    }
}

/// Mother-side answer to an approved appointment: confirming requires the
/// payment reference, rejecting requires a reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentReview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
}

impl AppointmentReview {
    #[must_use]
    pub fn confirm(reference_no: &str) -> Self {
        Self {
            status: Some(ApprovalStatus::Confirmed),
            reference_no: Some(reference_no.to_owned()),
            rejected_reason: None,
        }
    }

    #[must_use]
    pub fn reject(reason: &str) -> Self {
        Self {
            status: Some(ApprovalStatus::Rejected),
            reference_no: None,
            rejected_reason: Some(reason.to_owned()),
        }
    }
}

impl Validate for AppointmentReview {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        match self.status {
            None => violations.push("status", REQUIRED),
            Some(ApprovalStatus::Confirmed) => {
                violations.required("reference_no", self.reference_no.as_deref(), REQUIRED);
            }
            Some(ApprovalStatus::Rejected) => {
                violations.required("rejected_reason", self.rejected_reason.as_deref(), REQUIRED);
            }
        }
        violations
    }
}

// =============================================================================
// SHUTTLE
// =============================================================================

/// Walk-in ticket created from the kiosk.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct KioskForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub trip_id: i64,
    pub payment_method: String,
    pub amount_to_pay: f64,
}

impl Validate for KioskForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.required("name", Some(self.name.as_str()), "Passenger name is required.");
        violations.required("email", Some(self.email.as_str()), "Passenger email is required.");
        violations.required("phone", Some(self.phone.as_str()), "Passenger phone is required.");
        violations.at_least("trip_id", self.trip_id, 1, "Trip selection is required.");
        violations.required("payment_method", Some(self.payment_method.as_str()), "Payment method is required.");
        if self.amount_to_pay.is_nan() || self.amount_to_pay < 1.0 {
            violations.push("amount_to_pay", "Amount is required.");
        }
        violations
    }
}

/// Coordinates are kept as the strings the map picker produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TerminalForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub longitude: String,
    pub latitude: String,
}

impl Validate for TerminalForm {
    fn violations(&self) -> Violations {
        const LONGITUDE: &str = "Longitude must be between -180 and 180";
        const LATITUDE: &str = "Latitude must be between -90 and 90";

        let mut violations = Violations::new();
        violations.min_chars("name", &self.name, 3, "Name is required");
        if !coordinate_within(&self.longitude, 180.0) {
            violations.push("longitude", LONGITUDE);
        }
        if !coordinate_within(&self.latitude, 90.0) {
            violations.push("latitude", LATITUDE);
        }
        violations
    }
}

/// At least three characters, numeric, and within `±bound`.
fn coordinate_within(raw: &str, bound: f64) -> bool {
    let raw = raw.trim();
    if raw.chars().count() < 3 {
        return false;
    }
    raw.parse::<f64>().is_ok_and(|value| value.is_finite() && value.abs() <= bound)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TripForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub driver_id: i64,
    pub from_terminal_id: i64,
    pub to_terminal_id: i64,
    pub start_time: String,
    pub trip_date: String,
    pub fare_amount: String,
    pub status: String,
}

impl Validate for TripForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.at_least("driver_id", self.driver_id, 1, "Driver is required");
        violations.at_least("from_terminal_id", self.from_terminal_id, 1, "From Terminal is required");
        violations.at_least("to_terminal_id", self.to_terminal_id, 1, "To Terminal is required");
        if self.to_terminal_id >= 1 && self.to_terminal_id == self.from_terminal_id {
            violations.push("to_terminal_id", "To Terminal must differ from From Terminal");
        }
        violations.required("start_time", Some(self.start_time.as_str()), "Start time is required");
        violations.required("trip_date", Some(self.trip_date.as_str()), "Trip date is required");
        let fare_ok = self
            .fare_amount
            .trim()
            .parse::<f64>()
            .is_ok_and(|fare| fare.is_finite() && fare > 0.0);
        if !fare_ok {
            violations.push("fare_amount", "Fare amount must be a positive number");
        }
        violations.required("status", Some(self.status.as_str()), "Status is required");
        violations
    }
}

/// Operator edit of a passenger booking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookingForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub trip_id: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    pub booked_at: String,
}

impl Validate for BookingForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.at_least("user_id", self.user_id, 1, REQUIRED);
        violations.at_least("trip_id", self.trip_id, 1, REQUIRED);
        violations.required("status", Some(self.status.as_str()), REQUIRED);
        violations.required("booked_at", Some(self.booked_at.as_str()), REQUIRED);
        violations
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// Calendar event. `event_date` holds `[start, end]` as `YYYY-MM-DD`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub background_color: String,
    pub event_date: [Option<String>; 2],
}

impl EventForm {
    /// Parsed `[start, end]`, when both are present and valid.
    #[must_use]
    pub fn date_range(&self) -> Option<(Date, Date)> {
        let [start, end] = &self.event_date;
        Some((parse_date(start.as_deref()?)?, parse_date(end.as_deref()?)?))
    }
}

impl Validate for EventForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.min_chars("title", &self.title, 3, REQUIRED);
        violations.min_chars("description", &self.description, 3, REQUIRED);
        violations.min_chars("background_color", &self.background_color, 3, REQUIRED);

        let mut parsed = [None, None];
        for (index, raw) in self.event_date.iter().enumerate() {
            let field = format!("event_date.{index}");
            match raw.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
                None => violations.push(&field, REQUIRED),
                Some(raw) => match parse_date(raw) {
                    Some(date) => parsed[index] = Some(date),
                    None => violations.push(&field, INVALID_TYPE),
                },
            }
        }
        if let [Some(start), Some(end)] = parsed {
            if end < start {
                violations.push("event_date.1", "End date must not be before start date.");
            }
        }
        violations
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VideoForm {
    pub title: String,
    pub link: String,
}

impl Validate for VideoForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.min_chars("title", &self.title, 3, REQUIRED);
        if self.link.chars().count() < 3 {
            violations.push("link", REQUIRED);
        } else if reqwest::Url::parse(self.link.trim()).is_err() {
            violations.push("link", "Invalid url");
        }
        violations
    }
}

/// Chat message body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageForm {
    pub content: String,
}

impl MessageForm {
    #[must_use]
    pub fn new(content: &str) -> Self {
        Self { content: content.to_owned() }
    }
}

impl Validate for MessageForm {
    fn violations(&self) -> Violations {
        let mut violations = Violations::new();
        violations.required("content", Some(self.content.as_str()), REQUIRED);
        violations
    }
}
