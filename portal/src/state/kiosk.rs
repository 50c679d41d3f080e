//! Kiosk walk-in ticketing.
//!
//! DESIGN
//! ======
//! `KioskWizard` is the pure two-step state: passenger and trip, then
//! payment. Like the booking wizard, transitions return the next state.
//!
//! `KioskSession` drives the wizard against the backend. Cash is confirmed
//! explicitly. GCash and PayMaya open a hosted checkout and wait for a
//! `PaymongoPaidEvent` on the payment channel whose `payment_intent_id`
//! matches the one the checkout returned; on a match the ticket is created
//! automatically. An intent id is marked settled after validation and
//! before the create call, so a redelivered event never creates a second
//! ticket, while one that arrived for an incomplete form is not lost.

#[cfg(test)]
#[path = "kiosk_test.rs"]
mod kiosk_test;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use events::Envelope;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::net::ApiClient;
use crate::net::error::ApiError;
use crate::net::push::{PAYMENT_CHANNEL, PAYMENT_PAID_EVENT, PushHub, Subscription};
use crate::net::types::{ApiResponse, CheckoutSession, Kiosk, Trip};
use crate::validation::forms::KioskForm;
use crate::validation::{Validate, Violations};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KioskStep {
    #[default]
    PassengerAndTrip,
    Payment,
}

impl KioskStep {
    /// One-based, as shown on the stepper.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::PassengerAndTrip => 1,
            Self::Payment => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    GCash,
    PayMaya,
}

impl PaymentMethod {
    pub const ALL: [Self; 3] = [Self::Cash, Self::GCash, Self::PayMaya];

    /// Wire value stored on the ticket.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::GCash => "gcash",
            Self::PayMaya => "paymaya",
        }
    }

    /// Paid through the hosted checkout rather than at the counter.
    #[must_use]
    pub fn is_electronic(self) -> bool {
        !matches!(self, Self::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "gcash" => Ok(Self::GCash),
            "paymaya" | "maya" => Ok(Self::PayMaya),
            other => Err(format!("unknown payment method `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KioskDraft {
    pub passenger_name: String,
    pub email: String,
    pub phone: String,
    pub trip_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub amount_to_pay: f64,
    pub payment_intent_id: Option<String>,
}

/// Body of `POST /api/payment/checkout`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub payment_method: String,
    pub description: String,
    pub amount: f64,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    #[error(transparent)]
    Incomplete(#[from] Violations),
    #[error("Trip selection is required.")]
    UnknownTrip,
    #[error("Payment is chosen on step 2")]
    NotOnPayment,
    #[error("Payment method is required.")]
    NoPaymentMethod,
    #[error("{0} is paid through the checkout page")]
    ElectronicPayment(PaymentMethod),
    #[error("Cash does not use the checkout page")]
    CashCheckout,
    #[error("payment channel closed before confirmation")]
    PaymentChannelClosed,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KioskWizard {
    step: KioskStep,
    draft: KioskDraft,
    from_terminal: Option<i64>,
    to_terminal: Option<i64>,
    selected_trip: Option<Trip>,
    checkout_url: Option<String>,
}

impl KioskWizard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step(&self) -> KioskStep {
        self.step
    }

    #[must_use]
    pub fn draft(&self) -> &KioskDraft {
        &self.draft
    }

    #[must_use]
    pub fn selected_trip(&self) -> Option<&Trip> {
        self.selected_trip.as_ref()
    }

    #[must_use]
    pub fn checkout_url(&self) -> Option<&str> {
        self.checkout_url.as_deref()
    }

    /// `(from, to)` once both terminals are chosen; trips are listed only then.
    #[must_use]
    pub fn route(&self) -> Option<(i64, i64)> {
        self.from_terminal.zip(self.to_terminal)
    }

    #[must_use]
    pub fn with_passenger(&self, name: &str, email: &str, phone: &str) -> Self {
        let mut next = self.clone();
        next.draft.passenger_name = name.trim().to_owned();
        next.draft.email = email.trim().to_owned();
        next.draft.phone = phone.trim().to_owned();
        next
    }

    /// Picking the current destination as origin clears the destination.
    #[must_use]
    pub fn select_from_terminal(&self, terminal: Option<i64>) -> Self {
        let mut next = self.without_trip();
        next.from_terminal = terminal;
        if terminal.is_some() && terminal == next.to_terminal {
            next.to_terminal = None;
        }
        next
    }

    /// The origin is never offered as destination; choosing it clears the
    /// destination instead.
    #[must_use]
    pub fn select_to_terminal(&self, terminal: Option<i64>) -> Self {
        let mut next = self.without_trip();
        next.to_terminal = terminal.filter(|id| Some(*id) != next.from_terminal);
        next
    }

    fn without_trip(&self) -> Self {
        let mut next = self.clone();
        next.selected_trip = None;
        next.draft.trip_id = None;
        next.draft.amount_to_pay = 0.0;
        next
    }

    /// Select a listed trip; the fare becomes the amount to pay.
    ///
    /// # Errors
    ///
    /// [`KioskError::UnknownTrip`] when the trip has no id.
    pub fn select_trip(&self, trip: &Trip) -> Result<Self, KioskError> {
        let id = trip.id.ok_or(KioskError::UnknownTrip)?;
        let mut next = self.clone();
        next.draft.trip_id = Some(id);
        next.draft.amount_to_pay = trip.fare_amount;
        next.selected_trip = Some(trip.clone());
        Ok(next)
    }

    /// Passenger fields and trip as a field-error list.
    #[must_use]
    pub fn passenger_violations(&self) -> Violations {
        let mut violations = self.to_form().violations();
        violations.retain(|error| matches!(error.field.as_str(), "name" | "email" | "phone" | "trip_id"));
        violations
    }

    /// Move to payment.
    ///
    /// # Errors
    ///
    /// [`KioskError::Incomplete`] listing the missing passenger fields or trip.
    pub fn next(&self) -> Result<Self, KioskError> {
        if self.step == KioskStep::Payment {
            return Ok(self.clone());
        }
        self.passenger_violations().into_result(())?;
        Ok(Self { step: KioskStep::Payment, ..self.clone() })
    }

    #[must_use]
    pub fn back(&self) -> Self {
        Self { step: KioskStep::PassengerAndTrip, ..self.clone() }
    }

    /// Choose how to pay. Switching method drops any open checkout.
    ///
    /// # Errors
    ///
    /// [`KioskError::NotOnPayment`] before step 2.
    pub fn choose_payment(&self, method: PaymentMethod) -> Result<Self, KioskError> {
        if self.step != KioskStep::Payment {
            return Err(KioskError::NotOnPayment);
        }
        let mut next = self.clone();
        next.draft.payment_method = Some(method);
        next.draft.payment_intent_id = None;
        next.checkout_url = None;
        Ok(next)
    }

    /// Hosted checkout request for the chosen electronic method.
    ///
    /// # Errors
    ///
    /// When no method is chosen, the method is cash, or no trip is selected.
    pub fn checkout_request(&self) -> Result<CheckoutRequest, KioskError> {
        let method = self.draft.payment_method.ok_or(KioskError::NoPaymentMethod)?;
        if !method.is_electronic() {
            return Err(KioskError::CashCheckout);
        }
        let trip = self.selected_trip.as_ref().ok_or(KioskError::UnknownTrip)?;
        Ok(CheckoutRequest {
            payment_method: method.as_str().to_owned(),
            description: trip.route_label(" to "),
            amount: trip.fare_amount,
            name: self.draft.passenger_name.clone(),
            email: self.draft.email.clone(),
            phone: self.draft.phone.clone(),
        })
    }

    #[must_use]
    pub fn with_checkout(&self, session: CheckoutSession) -> Self {
        let mut next = self.clone();
        next.draft.payment_intent_id = Some(session.payment_intent_id);
        next.checkout_url = Some(session.url);
        next
    }

    /// Whether a confirmation for `intent_id` belongs to this draft.
    #[must_use]
    pub fn awaits_intent(&self, intent_id: &str) -> bool {
        self.draft.payment_intent_id.as_deref() == Some(intent_id)
    }

    /// Create-ticket body for the current draft.
    #[must_use]
    pub fn to_form(&self) -> KioskForm {
        KioskForm {
            name: self.draft.passenger_name.clone(),
            email: self.draft.email.clone(),
            phone: self.draft.phone.clone(),
            trip_id: self.draft.trip_id.unwrap_or(0),
            payment_method: self.draft.payment_method.map(PaymentMethod::as_str).unwrap_or_default().to_owned(),
            amount_to_pay: self.draft.amount_to_pay,
        }
    }

    #[must_use]
    pub fn reset(&self) -> Self {
        Self::new()
    }
}

/// Remote calls the kiosk makes.
#[async_trait::async_trait]
pub trait KioskGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ApiError>;
    async fn create_kiosk(&self, form: &KioskForm) -> Result<ApiResponse<Kiosk>, ApiError>;
}

#[async_trait::async_trait]
impl KioskGateway for ApiClient {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ApiError> {
        ApiClient::create_checkout(self, request).await
    }

    async fn create_kiosk(&self, form: &KioskForm) -> Result<ApiResponse<Kiosk>, ApiError> {
        ApiClient::create_kiosk(self, form).await
    }
}

/// What the payment step shows after a method is chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentPrompt {
    /// Show a confirm button.
    ConfirmCash,
    /// Embed the hosted checkout and wait for confirmation.
    Checkout { url: String, payment_intent_id: String },
}

/// Result of creating a ticket.
#[derive(Clone, Debug, PartialEq)]
pub struct KioskReceipt {
    pub ticket: Option<Kiosk>,
    pub accepted: bool,
    pub message: Option<String>,
}

/// A kiosk screen: wizard state plus its payment-channel listener.
pub struct KioskSession {
    wizard: KioskWizard,
    gateway: Arc<dyn KioskGateway>,
    payments: Subscription,
    settled_intents: HashSet<String>,
}

impl KioskSession {
    /// Subscribes to the payment channel for as long as the session lives.
    #[must_use]
    pub fn new(gateway: Arc<dyn KioskGateway>, hub: &PushHub) -> Self {
        Self {
            wizard: KioskWizard::new(),
            gateway,
            payments: hub.subscribe(PAYMENT_CHANNEL),
            settled_intents: HashSet::new(),
        }
    }

    #[must_use]
    pub fn wizard(&self) -> &KioskWizard {
        &self.wizard
    }

    /// Apply a wizard transition, keeping the current state on error.
    ///
    /// # Errors
    ///
    /// Whatever the transition returns.
    pub fn update<F>(&mut self, transition: F) -> Result<(), KioskError>
    where
        F: FnOnce(&KioskWizard) -> Result<KioskWizard, KioskError>,
    {
        self.wizard = transition(&self.wizard)?;
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, intent_id: &str) -> bool {
        self.settled_intents.contains(intent_id)
    }

    /// Choose a payment method; electronic methods open a checkout.
    ///
    /// # Errors
    ///
    /// Wizard errors, or the checkout call failing. The method stays
    /// selected when the checkout fails so the attendant can retry.
    pub async fn choose_payment(&mut self, method: PaymentMethod) -> Result<PaymentPrompt, KioskError> {
        self.wizard = self.wizard.choose_payment(method)?;
        if !method.is_electronic() {
            return Ok(PaymentPrompt::ConfirmCash);
        }
        let request = self.wizard.checkout_request()?;
        let session = self.gateway.create_checkout(&request).await.inspect_err(|error| {
            warn!(%error, method = %method, "checkout initialization failed");
        })?;
        info!(method = %method, intent = %session.payment_intent_id, "checkout opened");
        let prompt = PaymentPrompt::Checkout {
            url: session.url.clone(),
            payment_intent_id: session.payment_intent_id.clone(),
        };
        self.wizard = self.wizard.with_checkout(session);
        Ok(prompt)
    }

    /// Create the ticket for a cash payment.
    ///
    /// # Errors
    ///
    /// [`KioskError::ElectronicPayment`] unless cash is selected, validation
    /// errors, or the create call failing.
    pub async fn confirm_cash(&mut self) -> Result<KioskReceipt, KioskError> {
        match self.wizard.draft().payment_method {
            Some(PaymentMethod::Cash) => self.create_ticket(None).await,
            Some(method) => Err(KioskError::ElectronicPayment(method)),
            None => Err(KioskError::NoPaymentMethod),
        }
    }

    /// React to one push envelope. Returns a receipt when it confirmed the
    /// pending checkout.
    ///
    /// # Errors
    ///
    /// The create call failing for a matched intent.
    pub async fn handle_push(&mut self, envelope: &Envelope) -> Result<Option<KioskReceipt>, KioskError> {
        if !envelope.is_event(PAYMENT_CHANNEL, PAYMENT_PAID_EVENT) {
            return Ok(None);
        }
        let Some(intent_id) = envelope.data_str("payment_intent_id") else {
            warn!("payment event without payment_intent_id");
            return Ok(None);
        };
        if !self.wizard.awaits_intent(intent_id) || self.is_settled(intent_id) {
            debug!(intent = intent_id, "ignoring payment event for another intent");
            return Ok(None);
        }
        let intent_id = intent_id.to_owned();
        info!(intent = %intent_id, "payment confirmed");
        self.create_ticket(Some(intent_id)).await.map(Some)
    }

    /// Wait on the payment channel until the pending checkout is confirmed.
    ///
    /// # Errors
    ///
    /// [`KioskError::PaymentChannelClosed`] when the channel goes away, or
    /// the create call failing.
    pub async fn wait_for_payment(&mut self) -> Result<KioskReceipt, KioskError> {
        loop {
            let Some(envelope) = self.payments.next_event(PAYMENT_PAID_EVENT).await else {
                return Err(KioskError::PaymentChannelClosed);
            };
            if let Some(receipt) = self.handle_push(&envelope).await? {
                return Ok(receipt);
            }
        }
    }

    /// Validate and create. A paid intent is settled only once the form
    /// passes, so a redelivery after a correction can still create the
    /// ticket. The wizard resets once the call settles, whatever its outcome.
    async fn create_ticket(&mut self, intent_id: Option<String>) -> Result<KioskReceipt, KioskError> {
        let form = self.wizard.to_form();
        form.validate()?;
        if let Some(intent_id) = intent_id {
            self.settled_intents.insert(intent_id);
        }
        let outcome = self.gateway.create_kiosk(&form).await;
        self.wizard = self.wizard.reset();
        let response = outcome?;
        let accepted = response.is_success() || response.data.is_some();
        info!(trip_id = form.trip_id, method = %form.payment_method, accepted, "kiosk ticket submitted");
        Ok(KioskReceipt { ticket: response.data, accepted, message: response.message })
    }
}
