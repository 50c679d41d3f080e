//! Doctor, verification and appointment endpoints.

use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::{Value, json};

use super::{ApiClient, param, resource_path};
use crate::net::error::ApiError;
use crate::net::types::{ApiResponse, Appointment, Doctor, Page, Remarks, StatusProbe};
use crate::state::booking::AppointmentRequest;
use crate::state::table::{ParamStyle, TableQuery};
use crate::validation::files::VerificationUpload;
use crate::validation::forms::{AppointmentReview, ApprovalDecision};

pub(crate) const DOCTORS: &str = "doctors";
pub(crate) const DOCTOR: &str = "doctor";
pub(crate) const DOCTORS_LIST: &str = "doctors-list";
pub(crate) const PENDING_DOCTORS: &str = "pending-doctors";
pub(crate) const APPOINTMENTS: &str = "appointments";
pub(crate) const APPOINTMENT_APPROVALS: &str = "appointment_approvals";

pub(crate) fn doctor_endpoint(id: i64) -> String {
    resource_path("/api/doctors", id)
}

pub(crate) fn doctor_status_endpoint(id: i64) -> String {
    resource_path("/api/doctors/update-status", id)
}

pub(crate) fn doctor_verification_endpoint(id: i64) -> String {
    resource_path("/api/doctors/update-verification-status", id)
}

pub(crate) fn verification_request_endpoint(id: i64) -> String {
    resource_path("/api/verification-request", id)
}

pub(crate) fn appointment_endpoint(id: i64) -> String {
    resource_path("/api/appointments", id)
}

pub(crate) fn appointment_approval_endpoint(id: i64) -> String {
    resource_path("/api/appointment-approvals", id)
}

impl ApiClient {
    // =========================================================================
    // DOCTORS
    // =========================================================================

    /// Doctors a mother can book with (`verified=true`) or all of them.
    pub async fn doctors(&self, verified: bool) -> Result<Page<Doctor>, ApiError> {
        let params = vec![param("verified", verified)];
        self.cached_get(DOCTORS, "/api/doctors", &params).await
    }

    pub async fn doctor(&self, id: i64) -> Result<Doctor, ApiError> {
        self.cached_get(DOCTOR, &doctor_endpoint(id), &[]).await
    }

    pub async fn doctors_list(&self, query: &TableQuery) -> Result<Page<Doctor>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(DOCTORS_LIST, "/api/doctors/list", &params).await
    }

    pub async fn pending_doctors(&self, query: &TableQuery) -> Result<Page<Doctor>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(PENDING_DOCTORS, "/api/doctors/pending", &params).await
    }

    /// Account status of the signed-in doctor.
    pub async fn check_status(&self) -> Result<StatusProbe, ApiError> {
        self.get_json("/api/doctors/check-status", &[]).await
    }

    /// Verification status of the signed-in doctor.
    pub async fn check_verification_status(&self) -> Result<StatusProbe, ApiError> {
        self.get_json("/api/doctors/check-verification-status", &[]).await
    }

    pub async fn verification_remarks(&self) -> Result<Remarks, ApiError> {
        self.get_json("/api/doctors/verification-remarks", &[]).await
    }

    /// Enable or disable a doctor account.
    pub async fn update_doctor_status(&self, id: i64, enabled: bool) -> Result<ApiResponse, ApiError> {
        let status = if enabled { "enabled" } else { "disabled" };
        self.mutate(Method::PATCH, &doctor_status_endpoint(id), Some(&json!({ "status": status })), &[DOCTORS_LIST])
            .await
    }

    /// Admin decision on a pending verification request.
    pub async fn update_verification_status(
        &self,
        id: i64,
        decision: &ApprovalDecision,
    ) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PATCH, &doctor_verification_endpoint(id), Some(decision), &[PENDING_DOCTORS])
            .await
    }

    /// Submit the two ID images for verification as multipart form data.
    pub async fn request_verification(&self, id: i64, upload: &VerificationUpload) -> Result<ApiResponse, ApiError> {
        let mut form = Form::new();
        for (field, image) in upload.fields() {
            form = match image.new_file() {
                Some(file) => form.part(field, super::file_part(file)?),
                // Already-uploaded images are sent as empty text.
                None => form.text(field, String::new()),
            };
        }
        self.upload(&verification_request_endpoint(id), form, &[]).await
    }

    // =========================================================================
    // APPOINTMENTS
    // =========================================================================

    pub async fn appointments(&self, query: &TableQuery) -> Result<Page<Appointment>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(APPOINTMENTS, "/api/appointments", &params).await
    }

    pub async fn appointment_approvals(&self, query: &TableQuery) -> Result<Page<Appointment>, ApiError> {
        let params = query.to_params(ParamStyle::Clinic);
        self.cached_get(APPOINTMENT_APPROVALS, "/api/appointment-approvals", &params)
            .await
    }

    pub async fn create_appointment(&self, request: &AppointmentRequest) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::POST, "/api/appointments", Some(request), &[APPOINTMENTS])
            .await
    }

    /// Doctor-side decision on an appointment.
    pub async fn update_appointment_status(
        &self,
        id: i64,
        decision: &ApprovalDecision,
    ) -> Result<ApiResponse, ApiError> {
        self.mutate(Method::PATCH, &appointment_endpoint(id), Some(decision), &[APPOINTMENTS])
            .await
    }

    /// Mother-side confirmation (with payment reference) or rejection.
    pub async fn update_appointment_approval(
        &self,
        id: i64,
        review: &AppointmentReview,
    ) -> Result<ApiResponse<Value>, ApiError> {
        self.mutate(
            Method::PATCH,
            &appointment_approval_endpoint(id),
            Some(review),
            &[APPOINTMENT_APPROVALS, APPOINTMENTS],
        )
        .await
    }
}
