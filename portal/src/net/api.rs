//! REST client for the portal backend.
//!
//! DESIGN
//! ======
//! `ApiClient` owns one `reqwest::Client` plus the shared [`QueryCache`].
//! Reads go through `cached_get` keyed by resource name and query params;
//! mutations go through `mutate`, which invalidates the named resources
//! whether or not the backend accepted the change (a rejected write may
//! still have moved server state, so the next read refetches).
//!
//! Endpoint paths are built by small pure functions so they can be tested
//! without a server. Per-resource calls live in `api_clinic`, `api_shuttle`
//! and `api_content`.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

#[path = "api_clinic.rs"]
mod api_clinic;
#[path = "api_content.rs"]
mod api_content;
#[path = "api_shuttle.rs"]
mod api_shuttle;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use super::cache::{QueryCache, QueryKey};
use super::error::ApiError;
use super::types::ApiResponse;
use crate::config::PortalConfig;
use crate::validation::files::UploadFile;

/// Query parameters as sent on the wire, in order.
pub type Params = Vec<(String, String)>;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
    cache: QueryCache,
}

impl ApiClient {
    /// Build a client from portal config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] when the TLS backend fails to
    /// initialize.
    pub fn new(config: &PortalConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session_token: config.session_token.clone(),
            cache: QueryCache::new(Duration::from_secs(config.cache_ttl_secs)),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Drop cached reads for `resource` without issuing a request.
    pub fn invalidate(&self, resource: &str) {
        self.cache.invalidate(resource);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and return the body text of a 2xx response.
    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "portal request failed");
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok((status, body))
    }

    /// Uncached GET decoded into `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(String, String)]) -> Result<T, ApiError> {
        let (_, body) = self.send(self.request(Method::GET, path).query(params)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET through the query cache under `resource`. The path is part of the
    /// key, so two endpoints can share a resource name for invalidation.
    pub(crate) async fn cached_get<T: DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut key_params = vec![param("path", path)];
        key_params.extend_from_slice(params);
        let key = QueryKey::with_params(resource, &key_params);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(serde_json::from_value(hit)?);
        }
        let value: Value = self.get_json(path, params).await?;
        let decoded: T = serde_json::from_value(value.clone())?;
        self.cache.put(key, value);
        Ok(decoded)
    }

    /// Write call with an optional JSON body. Invalidates `resources` once the
    /// request has settled, success or not.
    pub(crate) async fn mutate<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        resources: &[&str],
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut builder = self.request(method.clone(), path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let outcome = self.send(builder).await;
        for resource in resources {
            self.cache.invalidate(resource);
        }
        let (status, text) = outcome?;
        let response = decode_mutation::<T>(status, &text)?;
        info!(%method, path, success = response.is_success(), "portal mutation settled");
        Ok(response)
    }

    /// Multipart POST. Same invalidation contract as [`Self::mutate`].
    pub(crate) async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        resources: &[&str],
    ) -> Result<ApiResponse<T>, ApiError> {
        let outcome = self.send(self.request(Method::POST, path).multipart(form)).await;
        for resource in resources {
            self.cache.invalidate(resource);
        }
        let (status, text) = outcome?;
        decode_mutation::<T>(status, &text)
    }
}

/// Empty 2xx bodies (typically `204` on delete) count as success.
fn decode_mutation<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<ApiResponse<T>, ApiError> {
    if text.trim().is_empty() {
        return Ok(ApiResponse {
            success: Some(status.is_success()),
            status: None,
            message: None,
            data: None,
        });
    }
    Ok(serde_json::from_str(text)?)
}

impl<T> ApiResponse<T> {
    /// Turn an unsuccessful envelope into [`ApiError::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns the backend's message (or a generic one) when the envelope does
    /// not report success.
    pub fn accepted(self) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.message.unwrap_or_else(|| "request was not accepted".to_owned());
        Err(ApiError::Rejected(message))
    }
}

/// `{base}/{id}`.
pub(crate) fn resource_path(base: &str, id: impl std::fmt::Display) -> String {
    format!("{base}/{id}")
}

/// Multipart part for a picked file, carrying its name and MIME type.
fn file_part(file: &UploadFile) -> Result<reqwest::multipart::Part, ApiError> {
    reqwest::multipart::Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| ApiError::Multipart(e.to_string()))
}

pub(crate) fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_owned(), value.to_string())
}
