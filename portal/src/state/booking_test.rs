use super::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::Weekday;
use time::macros::{date, time};

// =============================================================
// Helpers
// =============================================================

const TODAY: Date = date!(2026 - 10 - 19);

fn wizard() -> BookingWizard {
    let availability = Availability::new(
        vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        Some((time!(9:00), time!(17:00))),
    );
    BookingWizard::starting_on(12, availability, TODAY)
}

fn scheduled() -> BookingWizard {
    wizard()
        .select_date(date!(2026 - 10 - 21))
        .unwrap()
        .select_time(TimeRange::new(time!(10:00), time!(11:00)).unwrap())
        .unwrap()
}

fn at_payment() -> BookingWizard {
    scheduled().select_step(BookingStep::Payment).unwrap()
}

struct RecordingGateway {
    calls: AtomicUsize,
    last: Mutex<Option<AppointmentRequest>>,
    response: ApiResponse,
}

impl RecordingGateway {
    fn answering(response: ApiResponse) -> Self {
        Self { calls: AtomicUsize::new(0), last: Mutex::new(None), response }
    }

    fn succeeding() -> Self {
        Self::answering(ApiResponse { success: Some(true), message: Some("Booked".to_owned()), ..ApiResponse::default() })
    }
}

#[async_trait::async_trait]
impl AppointmentGateway for RecordingGateway {
    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<ApiResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(self.response.clone())
    }
}

// =============================================================
// Position
// =============================================================

#[test]
fn starts_on_first_step() {
    let position = wizard().position();
    assert_eq!(position, WizardPosition { current_step: 0, is_first_step: true, is_last_step: false });
}

#[test]
fn step_stays_in_range_through_any_sequence() {
    let mut state = scheduled();
    for round in 0..20 {
        let attempt = match round % 5 {
            0 | 1 => state.next().ok(),
            2 => state.prev().ok(),
            3 => state.select_index(round % 6).ok(),
            _ => Some(state.reset()),
        };
        if let Some(next) = attempt {
            state = next;
        }
        assert!(state.position().current_step <= LAST_STEP);
    }
}

#[test]
fn next_is_a_no_op_on_last_step_and_prev_on_first() {
    let last = at_payment();
    assert_eq!(last.next().unwrap().step(), BookingStep::Payment);
    assert!(last.position().is_last_step);

    let first = wizard();
    assert_eq!(first.prev().unwrap().step(), BookingStep::Details);
}

// =============================================================
// Guards
// =============================================================

#[test]
fn details_always_advances() {
    assert_eq!(wizard().next().unwrap().step(), BookingStep::DateTime);
}

#[test]
fn leaving_date_time_requires_date_and_time() {
    let on_date_time = wizard().next().unwrap();
    let prompt = on_date_time.next().unwrap_err();
    assert_eq!(prompt.message, "Please enter date & time");
    assert_eq!(prompt.action, Some(("Go to Step 2", BookingStep::DateTime)));
    assert!(on_date_time.prev().is_err());

    let date_only = on_date_time.select_date(date!(2026 - 10 - 23)).unwrap();
    assert!(date_only.next().is_err());

    let ready = date_only.select_time(TimeRange::parse("09:00", "09:30").unwrap()).unwrap();
    assert_eq!(ready.next().unwrap().step(), BookingStep::Review);
    assert_eq!(ready.prev().unwrap().step(), BookingStep::Details);
}

#[test]
fn direct_selection_beyond_date_time_needs_schedule() {
    let fresh = wizard();
    assert_eq!(fresh.select_step(BookingStep::DateTime).unwrap().step(), BookingStep::DateTime);
    assert_eq!(fresh.select_step(BookingStep::Details).unwrap().step(), BookingStep::Details);
    assert_eq!(fresh.select_step(BookingStep::Review), Err(StepPrompt::date_time()));
    assert!(fresh.select_step(BookingStep::Payment).is_err());

    assert_eq!(scheduled().select_step(BookingStep::Payment).unwrap().step(), BookingStep::Payment);
}

#[test]
fn unknown_step_index_is_rejected() {
    assert!(matches!(wizard().select_index(4), Err(BookingError::UnknownStep(4))));
    assert!(matches!(wizard().select_index(2), Err(BookingError::Prompt(_))));
}

#[test]
fn refused_transition_keeps_state() {
    let on_date_time = wizard().next().unwrap();
    let before = on_date_time.clone();
    let _ = on_date_time.next();
    assert_eq!(on_date_time, before);
}

// =============================================================
// Schedule
// =============================================================

#[test]
fn unavailable_weekday_is_never_stored() {
    let result = wizard().select_date(date!(2026 - 10 - 20));
    assert_eq!(result, Err(ScheduleError::UnavailableDay(Weekday::Tuesday)));
}

#[test]
fn time_outside_window_is_rejected_with_bounds() {
    let err = wizard()
        .select_time(TimeRange::parse("17:00", "18:00").unwrap())
        .unwrap_err();
    assert_eq!(err.to_string(), "Please select between 09:00AM ~ 05:00PM");
}

#[test]
fn online_mode_is_unavailable() {
    assert!(matches!(wizard().with_mode(ConsultationMode::Online), Err(BookingError::ModeUnavailable)));
    let face = wizard().with_mode(ConsultationMode::FaceToFace).unwrap();
    assert_eq!(face.draft().mode, ConsultationMode::FaceToFace);
}

#[test]
fn blank_message_is_dropped() {
    assert_eq!(wizard().with_message(Some("  ")).draft().message, None);
    assert_eq!(wizard().with_message(Some(" hi ")).draft().message.as_deref(), Some("hi"));
}

// =============================================================
// Submission
// =============================================================

#[test]
fn submission_builds_wire_body() {
    let request = at_payment().with_message(Some("first visit")).with_reference("GC-77").submission().unwrap();
    assert_eq!(
        request,
        AppointmentRequest {
            doctor_id: 12,
            message: Some("first visit".to_owned()),
            date: "2026-10-21".to_owned(),
            time: ["10:00".to_owned(), "11:00".to_owned()],
            reference_no: "GC-77".to_owned(),
        }
    );
}

#[test]
fn submission_only_from_last_step() {
    let review = scheduled().select_step(BookingStep::Review).unwrap().with_reference("GC-1");
    assert!(matches!(review.submission(), Err(SubmitError::NotLastStep)));
}

#[tokio::test]
async fn missing_reference_never_calls_gateway() {
    let gateway = RecordingGateway::succeeding();
    for reference in ["", "   "] {
        let err = at_payment().with_reference(reference).submit(&gateway).await.unwrap_err();
        assert_eq!(err.to_string(), "Please complete the payment first and enter the reference no.");
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_submit_resets_and_navigates_back() {
    let gateway = RecordingGateway::succeeding();
    let outcome = at_payment().with_reference("GC-9").submit(&gateway).await.unwrap();

    let SubmitOutcome::NavigateBack { wizard, message } = outcome else {
        panic!("expected navigate back");
    };
    assert_eq!(message.as_deref(), Some("Booked"));
    assert_eq!(wizard.position().current_step, 0);
    assert_eq!(wizard.draft(), &BookingDraft { recipient_id: 12, ..BookingDraft::default() });
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.last.lock().unwrap().as_ref().map(|r| r.reference_no.as_str()), Some("GC-9"));
}

#[tokio::test]
async fn unsuccessful_response_keeps_draft() {
    let gateway = RecordingGateway::answering(ApiResponse {
        success: Some(false),
        message: Some("Slot taken".to_owned()),
        ..ApiResponse::default()
    });
    let outcome = at_payment().with_reference("GC-9").submit(&gateway).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Rejected { ref message } if message == "Slot taken"));
}

#[test]
fn reset_returns_to_first_step() {
    let reset = at_payment().with_reference("GC-2").reset();
    assert_eq!(reset.step(), BookingStep::Details);
    assert!(!reset.draft().has_schedule());
    assert!(reset.draft().reference_no.is_empty());
}

// =============================================================
// Review
// =============================================================

#[test]
fn review_combines_draft_and_doctor() {
    let doctor: Doctor = serde_json::from_value(serde_json::json!({
        "id": 40,
        "first_name": "Maria",
        "last_name": "Reyes",
        "email": "reyes@clinic.test",
        "doctor": {
            "id": 12,
            "days_available": ["Monday", "Wednesday", "Friday"],
            "time_start": "09:00",
            "time_end": "17:00",
            "doctor_fee": "500.00",
            "gcash_number": "09170000000"
        }
    }))
    .unwrap();

    let summary = scheduled().review(&doctor);
    assert_eq!(summary.doctor_name, "Dr. Maria Reyes");
    assert_eq!(summary.mode, "Face to Face");
    assert_eq!(summary.date.as_deref(), Some("2026-10-21"));
    assert_eq!(summary.time.as_deref(), Some("10:00AM ~ 11:00AM"));
    assert_eq!(summary.gcash_number.as_deref(), Some("09170000000"));
    assert!(summary.fee.is_some_and(|fee| (fee - 500.0).abs() < f64::EPSILON));
}
