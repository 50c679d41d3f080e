//! Shuttle endpoints: bookings, kiosk tickets, trips, terminals, payments.
//!
//! Shuttle list endpoints wrap the paginator one level deeper
//! (`{ "data": { "data": [...], "last_page": n } }`) and use the snake-case
//! table parameters.

use reqwest::Method;
use serde_json::json;

use super::{ApiClient, param, resource_path};
use crate::net::error::ApiError;
use crate::net::types::{ApiResponse, Booking, CheckoutSession, Kiosk, Page, Payment, Terminal, Trip, Wrapped};
use crate::state::kiosk::CheckoutRequest;
use crate::state::table::{ParamStyle, TableQuery};
use crate::validation::forms::{BookingForm, KioskForm, TerminalForm, TripForm};

pub(crate) const BOOKINGS: &str = "bookings";
pub(crate) const KIOSKS: &str = "kiosks";
pub(crate) const TRIPS: &str = "trips";
pub(crate) const TERMINALS: &str = "terminals";
pub(crate) const PAYMENTS: &str = "payments";

pub(crate) fn booking_endpoint(id: i64) -> String {
    resource_path("/api/booking", id)
}

pub(crate) fn booking_paid_endpoint(id: i64) -> String {
    format!("{}/paid", booking_endpoint(id))
}

pub(crate) fn kiosk_paid_endpoint(id: i64) -> String {
    format!("{}/paid", resource_path("/api/kiosk", id))
}

pub(crate) fn trip_endpoint(id: i64) -> String {
    resource_path("/api/trip", id)
}

pub(crate) fn terminal_endpoint(id: i64) -> String {
    resource_path("/api/terminal", id)
}

impl ApiClient {
    async fn shuttle_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        query: &TableQuery,
    ) -> Result<Page<T>, ApiError> {
        let params = query.to_params(ParamStyle::Shuttle);
        let wrapped: Wrapped<Page<T>> = self.cached_get(resource, path, &params).await?;
        Ok(wrapped.data)
    }

    // =========================================================================
    // BOOKINGS
    // =========================================================================

    pub async fn bookings(&self, query: &TableQuery) -> Result<Page<Booking>, ApiError> {
        self.shuttle_page(BOOKINGS, "/api/bookings", query).await
    }

    pub async fn update_booking(&self, id: i64, form: &BookingForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PUT, &booking_endpoint(id), Some(form), &[BOOKINGS]).await
    }

    pub async fn mark_booking_paid(&self, id: i64, paid: bool) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PUT, &booking_paid_endpoint(id), Some(&json!({ "paid": paid })), &[BOOKINGS, PAYMENTS])
            .await
    }

    // =========================================================================
    // KIOSK
    // =========================================================================

    pub async fn kiosks(&self, query: &TableQuery) -> Result<Page<Kiosk>, ApiError> {
        self.shuttle_page(KIOSKS, "/api/kiosks", query).await
    }

    /// Create a walk-in ticket. The response carries the stored ticket.
    pub async fn create_kiosk(&self, form: &KioskForm) -> Result<ApiResponse<Kiosk>, ApiError> {
        self.mutate(Method::POST, "/api/kiosk", Some(form), &[KIOSKS]).await
    }

    pub async fn mark_kiosk_paid(&self, id: i64, paid: bool) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PUT, &kiosk_paid_endpoint(id), Some(&json!({ "paid": paid })), &[KIOSKS, PAYMENTS])
            .await
    }

    /// Open a hosted checkout for an electronic payment.
    pub async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ApiError> {
        let (_, body) = self
            .send(self.request(Method::POST, "/api/payment/checkout").json(request))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // TRIPS
    // =========================================================================

    pub async fn trips(&self, query: &TableQuery) -> Result<Page<Trip>, ApiError> {
        self.shuttle_page(TRIPS, "/api/trips", query).await
    }

    /// Trips running from one terminal to another.
    pub async fn trips_between(&self, from_terminal_id: i64, to_terminal_id: i64) -> Result<Vec<Trip>, ApiError> {
        let params = vec![param("fromTerminal", from_terminal_id), param("toTerminal", to_terminal_id)];
        let wrapped: Wrapped<Vec<Trip>> = self.cached_get(TRIPS, "/api/trips/by-terminals", &params).await?;
        Ok(wrapped.data)
    }

    pub async fn create_trip(&self, form: &TripForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::POST, "/api/trip", Some(form), &[TRIPS]).await
    }

    pub async fn update_trip(&self, id: i64, form: &TripForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PUT, &trip_endpoint(id), Some(form), &[TRIPS]).await
    }

    pub async fn delete_trip(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.mutate::<(), _>(Method::DELETE, &trip_endpoint(id), None, &[TRIPS]).await
    }

    // =========================================================================
    // TERMINALS
    // =========================================================================

    pub async fn terminals(&self, query: &TableQuery) -> Result<Page<Terminal>, ApiError> {
        self.shuttle_page(TERMINALS, "/api/terminals", query).await
    }

    pub async fn create_terminal(&self, form: &TerminalForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::POST, "/api/terminal", Some(form), &[TERMINALS]).await
    }

    pub async fn update_terminal(&self, id: i64, form: &TerminalForm) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PUT, &terminal_endpoint(id), Some(form), &[TERMINALS]).await
    }

    pub async fn delete_terminal(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.mutate::<(), _>(Method::DELETE, &terminal_endpoint(id), None, &[TERMINALS, TRIPS])
            .await
    }

    // =========================================================================
    // PAYMENTS
    // =========================================================================

    pub async fn payments(&self, query: &TableQuery) -> Result<Page<Payment>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(PAYMENTS, "/api/payments", &params).await
    }
}
