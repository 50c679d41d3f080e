//! Appointment booking wizard.
//!
//! DESIGN
//! ======
//! Four linear steps: details, date & time, review, payment. Every
//! transition borrows the current wizard and returns the next one, so a
//! refused transition leaves the caller's state untouched and the refusal
//! carries the text to show.
//!
//! Leaving the date & time step in either direction, or jumping past it,
//! requires both a date and a time. Submission happens only from the
//! payment step and only with a payment reference; on success the wizard
//! resets and the screen navigates back.

#[cfg(test)]
#[path = "booking_test.rs"]
mod booking_test;

use std::fmt;

use serde::Serialize;
use time::Date;
use tracing::{info, warn};

use super::schedule::{self, Availability, ScheduleError, TimeRange};
use crate::net::ApiClient;
use crate::net::error::ApiError;
use crate::net::types::{ApiResponse, Doctor};

pub const LAST_STEP: usize = 3;
pub const DATE_TIME_PROMPT: &str = "Please enter date & time";
pub const GO_TO_DATE_TIME: &str = "Go to Step 2";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BookingStep {
    #[default]
    Details,
    DateTime,
    Review,
    Payment,
}

impl BookingStep {
    pub const ALL: [Self; 4] = [Self::Details, Self::DateTime, Self::Review, Self::Payment];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Details => 0,
            Self::DateTime => 1,
            Self::Review => 2,
            Self::Payment => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Details => "Details",
            Self::DateTime => "Date & Time",
            Self::Review => "Review",
            Self::Payment => "Payment",
        }
    }
}

/// Where the stepper stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardPosition {
    pub current_step: usize,
    pub is_first_step: bool,
    pub is_last_step: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConsultationMode {
    #[default]
    FaceToFace,
    /// Listed but not offered yet.
    Online,
}

impl ConsultationMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FaceToFace => "Face to Face",
            Self::Online => "Online",
        }
    }
}

/// Appointment being assembled. Nothing is sent until submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub recipient_id: i64,
    pub message: Option<String>,
    pub date: Option<Date>,
    pub time_range: Option<TimeRange>,
    pub reference_no: String,
    pub mode: ConsultationMode,
}

impl BookingDraft {
    #[must_use]
    pub fn has_schedule(&self) -> bool {
        self.date.is_some() && self.time_range.is_some()
    }
}

/// Corrective notice shown when a transition is refused, optionally with a
/// shortcut to the step that fixes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepPrompt {
    pub message: &'static str,
    pub action: Option<(&'static str, BookingStep)>,
}

impl StepPrompt {
    #[must_use]
    pub fn date_time() -> Self {
        Self { message: DATE_TIME_PROMPT, action: Some((GO_TO_DATE_TIME, BookingStep::DateTime)) }
    }
}

impl fmt::Display for StepPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Prompt(StepPrompt),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("Online consultation is not available yet")]
    ModeUnavailable,
    #[error("step {0} does not exist")]
    UnknownStep(usize),
}

impl From<StepPrompt> for BookingError {
    fn from(prompt: StepPrompt) -> Self {
        Self::Prompt(prompt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Submit is only available on the payment step")]
    NotLastStep,
    #[error("Please enter date & time")]
    MissingSchedule,
    #[error("Please complete the payment first and enter the reference no.")]
    MissingReference,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Body of `POST /api/appointments`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppointmentRequest {
    pub doctor_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub date: String,
    pub time: [String; 2],
    pub reference_no: String,
}

/// Remote create call used by [`BookingWizard::submit`].
#[async_trait::async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<ApiResponse, ApiError>;
}

#[async_trait::async_trait]
impl AppointmentGateway for ApiClient {
    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<ApiResponse, ApiError> {
        ApiClient::create_appointment(self, request).await
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Created. Carries the reset wizard; the screen should go back.
    NavigateBack { wizard: BookingWizard, message: Option<String> },
    /// The backend answered without success; the draft is kept.
    Rejected { message: String },
}

/// What the review and payment steps display.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewSummary {
    pub doctor_name: String,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub mode: &'static str,
    pub date: Option<String>,
    pub time: Option<String>,
    pub message: Option<String>,
    pub fee: Option<f64>,
    pub gcash_number: Option<String>,
    pub gcash_qr_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingWizard {
    availability: Availability,
    step: BookingStep,
    draft: BookingDraft,
    today: Date,
}

impl BookingWizard {
    #[must_use]
    pub fn new(recipient_id: i64, availability: Availability) -> Self {
        Self::starting_on(recipient_id, availability, schedule::today())
    }

    /// Wizard whose "past date" cutoff is `today`.
    #[must_use]
    pub fn starting_on(recipient_id: i64, availability: Availability, today: Date) -> Self {
        Self {
            availability,
            step: BookingStep::Details,
            draft: BookingDraft { recipient_id, ..BookingDraft::default() },
            today,
        }
    }

    /// Book with a doctor; appointments reference the clinic profile id.
    #[must_use]
    pub fn for_doctor(doctor: &Doctor) -> Self {
        Self::new(doctor.doctor.id, Availability::from_profile(&doctor.doctor))
    }

    #[must_use]
    pub fn step(&self) -> BookingStep {
        self.step
    }

    #[must_use]
    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    #[must_use]
    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    #[must_use]
    pub fn position(&self) -> WizardPosition {
        let current_step = self.step.index();
        WizardPosition { current_step, is_first_step: current_step == 0, is_last_step: current_step == LAST_STEP }
    }

    fn at(&self, step: BookingStep) -> Self {
        Self { step, ..self.clone() }
    }

    fn leaving_incomplete_date_time(&self) -> bool {
        self.step == BookingStep::DateTime && !self.draft.has_schedule()
    }

    /// Advance one step. A no-op on the last step.
    ///
    /// # Errors
    ///
    /// The date & time prompt when leaving that step without both values.
    pub fn next(&self) -> Result<Self, StepPrompt> {
        if self.leaving_incomplete_date_time() {
            return Err(StepPrompt::date_time());
        }
        let next = BookingStep::from_index(self.step.index() + 1).unwrap_or(self.step);
        Ok(self.at(next))
    }

    /// Go back one step. A no-op on the first step.
    ///
    /// # Errors
    ///
    /// The date & time prompt when leaving that step without both values.
    pub fn prev(&self) -> Result<Self, StepPrompt> {
        if self.leaving_incomplete_date_time() {
            return Err(StepPrompt::date_time());
        }
        let prev = self.step.index().checked_sub(1).and_then(BookingStep::from_index);
        Ok(self.at(prev.unwrap_or(self.step)))
    }

    /// Jump via the step indicator. Details and date & time are always
    /// reachable; later steps need a date and a time.
    ///
    /// # Errors
    ///
    /// The date & time prompt when the jump is not yet allowed.
    pub fn select_step(&self, target: BookingStep) -> Result<Self, StepPrompt> {
        if target.index() > BookingStep::DateTime.index() && !self.draft.has_schedule() {
            return Err(StepPrompt::date_time());
        }
        Ok(self.at(target))
    }

    /// [`Self::select_step`] by zero-based index.
    ///
    /// # Errors
    ///
    /// [`BookingError::UnknownStep`] past the last step, otherwise as
    /// [`Self::select_step`].
    pub fn select_index(&self, index: usize) -> Result<Self, BookingError> {
        let target = BookingStep::from_index(index).ok_or(BookingError::UnknownStep(index))?;
        Ok(self.select_step(target)?)
    }

    /// # Errors
    ///
    /// [`ScheduleError`] for past dates and days the doctor does not work.
    pub fn select_date(&self, date: Date) -> Result<Self, ScheduleError> {
        let date = self.availability.check_date(date, self.today)?;
        let mut next = self.clone();
        next.draft.date = Some(date);
        Ok(next)
    }

    /// # Errors
    ///
    /// [`ScheduleError::OutsideWindow`] when either end is outside the
    /// doctor's hours.
    pub fn select_time(&self, range: TimeRange) -> Result<Self, ScheduleError> {
        let range = self.availability.check_time(range)?;
        let mut next = self.clone();
        next.draft.time_range = Some(range);
        Ok(next)
    }

    /// Blank messages are dropped.
    #[must_use]
    pub fn with_message(&self, message: Option<&str>) -> Self {
        let mut next = self.clone();
        next.draft.message = message.map(str::trim).filter(|m| !m.is_empty()).map(ToOwned::to_owned);
        next
    }

    /// # Errors
    ///
    /// [`BookingError::ModeUnavailable`] for online consultations.
    pub fn with_mode(&self, mode: ConsultationMode) -> Result<Self, BookingError> {
        if mode == ConsultationMode::Online {
            return Err(BookingError::ModeUnavailable);
        }
        let mut next = self.clone();
        next.draft.mode = mode;
        Ok(next)
    }

    #[must_use]
    pub fn with_reference(&self, reference_no: &str) -> Self {
        let mut next = self.clone();
        next.draft.reference_no = reference_no.trim().to_owned();
        next
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.position().is_last_step
    }

    /// Request body for the current draft.
    ///
    /// # Errors
    ///
    /// [`SubmitError`] unless on the last step with a complete draft and a
    /// payment reference.
    pub fn submission(&self) -> Result<AppointmentRequest, SubmitError> {
        if !self.can_submit() {
            return Err(SubmitError::NotLastStep);
        }
        if self.draft.reference_no.is_empty() {
            return Err(SubmitError::MissingReference);
        }
        let (Some(date), Some(range)) = (self.draft.date, self.draft.time_range) else {
            return Err(SubmitError::MissingSchedule);
        };
        Ok(AppointmentRequest {
            doctor_id: self.draft.recipient_id,
            message: self.draft.message.clone(),
            date: schedule::format_date(date),
            time: range.to_wire(),
            reference_no: self.draft.reference_no.clone(),
        })
    }

    /// Create the appointment.
    ///
    /// # Errors
    ///
    /// Validation errors from [`Self::submission`] (the gateway is not
    /// called) or the transport error.
    pub async fn submit(&self, gateway: &dyn AppointmentGateway) -> Result<SubmitOutcome, SubmitError> {
        let request = self.submission()?;
        info!(doctor_id = request.doctor_id, date = %request.date, "submitting appointment");
        let response = gateway.create_appointment(&request).await?;
        if response.is_success() {
            return Ok(SubmitOutcome::NavigateBack { wizard: self.reset(), message: response.message });
        }
        let message = response.message.unwrap_or_else(|| "Appointment was not created".to_owned());
        warn!(doctor_id = request.doctor_id, %message, "appointment rejected");
        Ok(SubmitOutcome::Rejected { message })
    }

    /// Back to the first step with an empty draft for the same doctor.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::starting_on(self.draft.recipient_id, self.availability.clone(), self.today)
    }

    #[must_use]
    pub fn review(&self, doctor: &Doctor) -> ReviewSummary {
        let profile = &doctor.doctor;
        ReviewSummary {
            doctor_name: doctor.display_name(),
            email: doctor.email.clone(),
            contact_number: doctor.contact_number.clone(),
            address: profile.address.clone(),
            mode: self.draft.mode.label(),
            date: self.draft.date.map(schedule::format_date),
            time: self.draft.time_range.map(|range| range.to_string()),
            message: self.draft.message.clone(),
            fee: profile.doctor_fee,
            gcash_number: profile.gcash_number.clone(),
            gcash_qr_url: profile.gcash_qr_code.as_ref().map(|qr| qr.url.clone()),
        }
    }
}
