//! Domain DTOs for the QR-code API.
//!
//! # Design
//! These types mirror the backend's JSON schema, including its mix of
//! snake_case and camelCase field names. They are defined independently from
//! the mock-server crate; integration tests catch schema drift.
//!
//! Timestamps issued by the backend stay as the backend's strings because the
//! client never does arithmetic on them. Calendar dates used for stats ranges
//! are typed as `NaiveDate`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A backend-issued redirect resource.
///
/// `id` and `slug` are assigned by the backend and never changed client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrCode {
    pub id: u64,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub destination_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcm_impression_tag: Option<String>,
    pub created_at: String,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
    #[serde(rename = "qrCodeImage", default, skip_serializing_if = "Option::is_none")]
    pub qr_code_image: Option<String>,
    #[serde(rename = "totalScans", default, skip_serializing_if = "Option::is_none")]
    pub total_scans: Option<u64>,
}

/// Request payload for creating a QR code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrCodeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub destination_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcm_impression_tag: Option<String>,
}

impl QrCodeInput {
    pub fn new(destination_url: impl Into<String>) -> Self {
        Self {
            destination_url: destination_url.into(),
            ..Self::default()
        }
    }
}

/// Request payload for updating a QR code. Only the fields present in the
/// JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrCodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcm_impression_tag: Option<String>,
}

/// Aggregated scan metrics for one QR code over an optional date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_scans: u64,
    pub unique_scans: u64,
    /// Ascending by date.
    pub daily_series: Vec<DailyPoint>,
    /// Ranked, highest scan count first.
    pub top_countries: Vec<CountryScans>,
    pub device_breakdown: BTreeMap<String, u64>,
    pub browser_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub scans: u64,
    pub unique_scans: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryScans {
    pub country: String,
    pub scans: u64,
}

/// One recorded redirect of a QR code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanEvent {
    pub id: u64,
    pub scanned_at: String,
    pub device_type: String,
    pub browser: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}
