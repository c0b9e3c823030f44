//! Stateless HTTP request builder and response parser for the QR-code API.
//!
//! # Design
//! `QrCodeClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that validates its
//! input and produces an `HttpRequest`, and a `parse_*` method that consumes
//! an `HttpResponse`. Non-2xx responses become `ApiError` variants here and
//! nowhere else; classification into user-facing text is the store's job.

use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{QrCode, QrCodeInput, QrCodeUpdate, ScanEvent, Stats};

/// Stateless client for the QR-code API.
#[derive(Debug, Clone)]
pub struct QrCodeClient {
    base_url: String,
}

impl QrCodeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_create(&self, input: &QrCodeInput) -> Result<HttpRequest, ApiError> {
        if input.destination_url.trim().is_empty() {
            return Err(ApiError::InvalidInput("destination_url is required".to_string()));
        }
        Ok(self.request(HttpMethod::Post, self.collection(), Some(encode(input)?)))
    }

    pub fn build_list(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.collection(), None)
    }

    pub fn build_get(&self, id: u64) -> Result<HttpRequest, ApiError> {
        Ok(self.request(HttpMethod::Get, self.member(id)?, None))
    }

    pub fn build_update(&self, id: u64, input: &QrCodeUpdate) -> Result<HttpRequest, ApiError> {
        let path = self.member(id)?;
        if input
            .destination_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            return Err(ApiError::InvalidInput(
                "destination_url must not be empty".to_string(),
            ));
        }
        Ok(self.request(HttpMethod::Put, path, Some(encode(input)?)))
    }

    pub fn build_delete(&self, id: u64) -> Result<HttpRequest, ApiError> {
        Ok(self.request(HttpMethod::Delete, self.member(id)?, None))
    }

    /// Date bounds are inclusive on the server side; each is sent only when given.
    pub fn build_stats(
        &self,
        id: u64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<HttpRequest, ApiError> {
        let mut params = Vec::new();
        if let Some(start) = start_date {
            params.push(format!("startDate={}", start.format("%Y-%m-%d")));
        }
        if let Some(end) = end_date {
            params.push(format!("endDate={}", end.format("%Y-%m-%d")));
        }
        let path = with_query(format!("{}/stats", self.member(id)?), &params);
        Ok(self.request(HttpMethod::Get, path, None))
    }

    pub fn build_recent_scans(
        &self,
        id: u64,
        limit: Option<NonZeroU32>,
    ) -> Result<HttpRequest, ApiError> {
        let params: Vec<String> = limit.map(|l| format!("limit={l}")).into_iter().collect();
        let path = with_query(format!("{}/scans", self.member(id)?), &params);
        Ok(self.request(HttpMethod::Get, path, None))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<QrCode, ApiError> {
        decode(response)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<QrCode>, ApiError> {
        decode(response)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<QrCode, ApiError> {
        decode(response)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<QrCode, ApiError> {
        decode(response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(response).map(|_| ())
    }

    pub fn parse_stats(&self, response: HttpResponse) -> Result<Stats, ApiError> {
        decode(response)
    }

    pub fn parse_recent_scans(&self, response: HttpResponse) -> Result<Vec<ScanEvent>, ApiError> {
        decode(response)
    }

    fn collection(&self) -> String {
        format!("{}/qrcodes", self.base_url)
    }

    fn member(&self, id: u64) -> Result<String, ApiError> {
        if id == 0 {
            return Err(ApiError::InvalidInput("id must be a positive integer".to_string()));
        }
        Ok(format!("{}/qrcodes/{id}", self.base_url))
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            path,
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }
}

fn with_query(path: String, params: &[String]) -> String {
    if params.is_empty() {
        path
    } else {
        format!("{path}?{}", params.join("&"))
    }
}

fn encode<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Unclassified(format!("serialization failed: {e}")))
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let response = check_status(response)?;
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Unclassified(format!("deserialization failed: {e}")))
}

/// Pass 2xx responses through; map everything else to its `ApiError` variant.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::from_status(response.status, response.body))
}
