//! Wire DTOs for the portal REST API.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's `snake_case` JSON. The backend is loose
//! about numeric types (fares arrive as `"150.00"`, paid flags as `0`/`1`),
//! so those fields go through lenient deserializers instead of failing the
//! whole page.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// ENVELOPES
// =============================================================================

/// Mutation response. Older endpoints report `success: true`, newer ones
/// report `status: "success"`; either counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false) || self.status.as_deref() == Some("success")
    }
}

/// Laravel-style paginator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

/// `{ "data": ... }` wrapper used by the shuttle endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wrapped<T> {
    pub data: T,
}

// =============================================================================
// CLINIC
// =============================================================================

/// A doctor account with its clinic profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    /// User id of the doctor account.
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Clinic profile; its `id` is what appointments reference.
    pub doctor: DoctorProfile,
}

impl Doctor {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

/// Scheduling and payment details a doctor publishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: i64,
    /// Weekday names the doctor accepts appointments on.
    #[serde(default, deserialize_with = "deserialize_day_list")]
    pub days_available: Vec<String>,
    /// Window start as `HH:mm` (seconds tolerated).
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub doctor_fee: Option<f64>,
    #[serde(default)]
    pub gcash_number: Option<String>,
    #[serde(default)]
    pub gcash_qr_code: Option<MediaRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
}

/// An appointment as listed for doctors and mothers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub rejected_reason: Option<String>,
    /// Everything else the listing carries (joined user/doctor rows, times).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status probe returned by `/api/doctors/check-*`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusProbe {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Remarks attached to a rejected verification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remarks {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// SHUTTLE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub latitude: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub capacity: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
}

/// A scheduled shuttle trip between two terminals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub driver_id: Option<i64>,
    pub from_terminal_id: i64,
    pub to_terminal_id: i64,
    #[serde(default)]
    pub passenger_capacity: Option<Value>,
    /// `HH:mm:ss`.
    #[serde(default)]
    pub start_time: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub trip_date: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub fare_amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub terminal_from: Option<Terminal>,
    #[serde(default)]
    pub terminal_to: Option<Terminal>,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub remaining_capacity: Option<i64>,
    #[serde(default)]
    pub total_occupancy: Option<i64>,
}

impl Trip {
    /// `"From - To"` using terminal names when joined, ids otherwise.
    #[must_use]
    pub fn route_label(&self, separator: &str) -> String {
        let from = self
            .terminal_from
            .as_ref()
            .map_or_else(|| format!("#{}", self.from_terminal_id), |t| t.name.clone());
        let to = self
            .terminal_to
            .as_ref()
            .map_or_else(|| format!("#{}", self.to_terminal_id), |t| t.name.clone());
        format!("{from}{separator}{to}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    pub trip_id: i64,
    #[serde(default)]
    pub booked_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub paid: bool,
    #[serde(default)]
    pub drop_at: Option<String>,
    #[serde(default)]
    pub trip: Option<Trip>,
}

/// A walk-in ticket created at a kiosk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kiosk {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub trip_id: i64,
    pub payment_method: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount_to_pay: f64,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub paid: bool,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub trip: Option<Trip>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub booking_id: Option<i64>,
    pub payment_method: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub booking: Option<Booking>,
    #[serde(default)]
    pub kiosk: Option<Kiosk>,
}

/// Hosted checkout opened for an electronic payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
    pub payment_intent_id: String,
}

// =============================================================================
// CONTENT
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inbox {
    pub id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    /// MIME type of the stored file.
    #[serde(rename = "type", default)]
    pub mime: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformativeVideo {
    pub id: i64,
    pub title: String,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mother {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    #[serde(default)]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub recipient_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// LENIENT DECODING
// =============================================================================

fn amount_from_value<E: serde::de::Error>(value: &Value) -> Result<f64, E> {
    match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| E::custom("amount out of range")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid amount: {text}"))),
        _ => Err(E::custom("expected amount as number or numeric string")),
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    amount_from_value::<D::Error>(&value)
}

fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    amount_from_value::<D::Error>(&value).map(Some)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => match text.trim() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(D::Error::custom(format!("invalid flag: {other}"))),
        },
        _ => Err(D::Error::custom("expected flag")),
    }
}

/// Accepts `["mon", "tue"]` or the comma-joined `"mon,tue"` form.
fn deserialize_day_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(text) => Ok(text
            .split(',')
            .map(str::trim)
            .filter(|day| !day.is_empty())
            .map(ToOwned::to_owned)
            .collect()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(day) => Ok(day),
                other => Err(D::Error::custom(format!("invalid weekday entry: {other}"))),
            })
            .collect(),
        _ => Err(D::Error::custom("expected weekday list")),
    }
}
