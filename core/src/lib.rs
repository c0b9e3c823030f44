//! Client-side data-access layer for the QR-code management API.
//!
//! # Overview
//! `QrCodeClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern). A `Transport`
//! executes the round-trip. `QrCodeStore` sequences both, caches the
//! resulting entities in observable state, and turns every failure into one
//! readable message.
//!
//! # Design
//! - `QrCodeClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (validates input, produces the
//!   request) and `parse_*` (consumes the response), so the I/O boundary is
//!   explicit.
//! - Failures are converted once into `ApiError` variants at that boundary;
//!   `classify` matches them exhaustively.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod transport;
pub mod types;

pub use classify::{classify, extract_api_message};
pub use client::QrCodeClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use store::{QrCodeStore, StoreState};
pub use transport::{Transport, UreqTransport};
pub use types::{CountryScans, DailyPoint, QrCode, QrCodeInput, QrCodeUpdate, ScanEvent, Stats};
