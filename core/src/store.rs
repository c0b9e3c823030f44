//! Observable cache of QR-code entities backed by the remote API.
//!
//! # Design
//! `QrCodeStore` keeps the last-known entities plus one shared `loading` flag
//! and one shared `error` message in a `tokio::sync::watch` channel, so
//! application code can read a snapshot or subscribe to changes.
//!
//! Every operation follows the same sequence: mark loading and clear the
//! previous error, execute one request, then in a single state update either
//! merge the result or record a classified message, and clear loading. A
//! failure never touches cached entities and is never returned as an error;
//! the caller gets `None` (or `false` for delete) and reads `error` from the
//! state.
//!
//! `loading` and `error` are single slots shared by all operations. When
//! calls overlap, each write lands as it happens and the last one wins; the
//! per-call return value is the only result scoped to one call.

use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::classify::classify;
use crate::client::QrCodeClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{QrCode, QrCodeInput, QrCodeUpdate, ScanEvent, Stats};

/// Everything the application can observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Newest-created first after `create`; server order after `fetch_all`.
    pub qr_codes: Vec<QrCode>,
    pub current_qr_code: Option<QrCode>,
    pub current_stats: Option<Stats>,
    pub recent_scans: Vec<ScanEvent>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Per-operation labels used for logging and classification.
struct Action {
    name: &'static str,
    fallback: &'static str,
    context: Option<&'static str>,
}

const CREATE: Action = Action {
    name: "create QR code",
    fallback: "Failed to create QR code",
    context: Some("creating a QR code"),
};

const FETCH_ALL: Action = Action {
    name: "fetch QR codes",
    fallback: "Failed to fetch QR codes",
    context: None,
};

const FETCH_ONE: Action = Action {
    name: "fetch QR code",
    fallback: "Failed to fetch QR code",
    context: None,
};

const UPDATE: Action = Action {
    name: "update QR code",
    fallback: "Failed to update QR code",
    context: Some("updating a QR code"),
};

const DELETE: Action = Action {
    name: "delete QR code",
    fallback: "Failed to delete QR code",
    context: None,
};

const FETCH_STATS: Action = Action {
    name: "fetch QR stats",
    fallback: "Failed to fetch stats",
    context: None,
};

const FETCH_SCANS: Action = Action {
    name: "fetch recent scans",
    fallback: "Failed to fetch recent scans",
    context: None,
};

pub struct QrCodeStore<T> {
    client: QrCodeClient,
    transport: T,
    state: watch::Sender<StoreState>,
}

impl<T: Transport> QrCodeStore<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self {
            client: QrCodeClient::new(&config.base_url),
            transport,
            state: watch::Sender::new(StoreState::default()),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Create a QR code and prepend it to `qr_codes`.
    pub async fn create(&self, input: &QrCodeInput) -> Option<QrCode> {
        let request = self.client.build_create(input);
        let inputs = json!({ "data": input });
        self.run(&CREATE, inputs, request, QrCodeClient::parse_create, |state, created| {
            state.qr_codes.insert(0, created.clone());
        })
        .await
    }

    /// Replace `qr_codes` with the server's list.
    pub async fn fetch_all(&self) -> Option<Vec<QrCode>> {
        let request = Ok(self.client.build_list());
        self.run(&FETCH_ALL, Value::Null, request, QrCodeClient::parse_list, |state, list| {
            state.qr_codes = list.clone();
        })
        .await
    }

    /// Replace `current_qr_code`.
    pub async fn fetch_one(&self, id: u64) -> Option<QrCode> {
        let request = self.client.build_get(id);
        self.run(&FETCH_ONE, json!({ "id": id }), request, QrCodeClient::parse_get, |state, qr| {
            state.current_qr_code = Some(qr.clone());
        })
        .await
    }

    /// Replace the cached entity with a matching id in place, and the focus
    /// if it has that id.
    pub async fn update(&self, id: u64, input: &QrCodeUpdate) -> Option<QrCode> {
        let request = self.client.build_update(id, input);
        let inputs = json!({ "id": id, "data": input });
        self.run(&UPDATE, inputs, request, QrCodeClient::parse_update, |state, updated| {
            if let Some(slot) = state.qr_codes.iter_mut().find(|qr| qr.id == id) {
                *slot = updated.clone();
            }
            if state.current_qr_code.as_ref().is_some_and(|qr| qr.id == id) {
                state.current_qr_code = Some(updated.clone());
            }
        })
        .await
    }

    /// Remove the entity with a matching id from `qr_codes`.
    ///
    /// `current_qr_code` is left as-is even when it has the deleted id.
    pub async fn delete(&self, id: u64) -> bool {
        let request = self.client.build_delete(id);
        self.run(&DELETE, json!({ "id": id }), request, QrCodeClient::parse_delete, |state, _| {
            state.qr_codes.retain(|qr| qr.id != id);
        })
        .await
        .is_some()
    }

    pub async fn fetch_stats(
        &self,
        id: u64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Option<Stats> {
        let request = self.client.build_stats(id, start_date, end_date);
        let inputs = json!({ "id": id, "startDate": start_date, "endDate": end_date });
        self.run(&FETCH_STATS, inputs, request, QrCodeClient::parse_stats, |state, stats| {
            state.current_stats = Some(stats.clone());
        })
        .await
    }

    pub async fn fetch_recent_scans(
        &self,
        id: u64,
        limit: Option<NonZeroU32>,
    ) -> Option<Vec<ScanEvent>> {
        let request = self.client.build_recent_scans(id, limit);
        let inputs = json!({ "id": id, "limit": limit });
        self.run(&FETCH_SCANS, inputs, request, QrCodeClient::parse_recent_scans, |state, scans| {
            state.recent_scans = scans.clone();
        })
        .await
    }

    async fn run<R, P, A>(
        &self,
        action: &Action,
        inputs: Value,
        request: Result<HttpRequest, ApiError>,
        parse: P,
        apply: A,
    ) -> Option<R>
    where
        P: FnOnce(&QrCodeClient, HttpResponse) -> Result<R, ApiError>,
        A: FnOnce(&mut StoreState, &R),
    {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let (result, request) = match request {
            Ok(request) => {
                let result = self
                    .transport
                    .execute(request.clone())
                    .await
                    .and_then(|response| parse(&self.client, response));
                (result, Some(request))
            }
            Err(err) => (Err(err), None),
        };

        match result {
            Ok(value) => {
                self.state.send_modify(|state| {
                    apply(state, &value);
                    state.loading = false;
                });
                Some(value)
            }
            Err(err) => {
                log_failure(action, &inputs, request.as_ref(), &err);
                let message = classify(&err, action.fallback, action.context);
                self.state.send_modify(|state| {
                    state.error = Some(message);
                    state.loading = false;
                });
                None
            }
        }
    }
}

/// `inputs` are the caller's arguments, so a request rejected before it was
/// built still leaves a record of what was asked for.
fn log_failure(action: &Action, inputs: &Value, request: Option<&HttpRequest>, err: &ApiError) {
    tracing::error!(
        action = action.name,
        status = err.status(),
        body = err.body(),
        method = request.map(|r| r.method.as_str()),
        url = request.map(|r| r.path.as_str()),
        payload = request.and_then(|r| r.body.as_deref()),
        inputs = %inputs,
        error = %err,
        "[QR API] {} failed",
        action.name
    );
}
