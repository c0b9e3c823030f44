//! Execution of `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the seam between the pure client and real I/O. A transport
//! returns every response it receives as data, whatever the status; only a
//! missing response is an error. The store is generic over it, so tests
//! drive the store with scripted responses.

use std::future::Future;
use std::sync::Arc;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send {
        (**self).execute(request)
    }
}

/// Blocking `ureq` agent run on tokio's blocking pool.
///
/// The agent has status-as-error disabled so 4xx/5xx responses come back as
/// data for the client to interpret. No retry or timeout is layered on top.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request))
            .await
            .map_err(|e| ApiError::Unclassified(format!("transport task failed: {e}")))?
    }
}

fn execute_blocking(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let HttpRequest {
        method,
        path,
        headers,
        body,
    } = request;

    let result = match method {
        HttpMethod::Get | HttpMethod::Delete => {
            let mut builder = if method == HttpMethod::Get {
                agent.get(path.as_str())
            } else {
                agent.delete(path.as_str())
            };
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post | HttpMethod::Put => {
            let mut builder = if method == HttpMethod::Post {
                agent.post(path.as_str())
            } else {
                agent.put(path.as_str())
            };
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(no_response)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string();

    into_response(status, headers, body)
}

/// A status line was received, so a broken body is never `NoResponse`.
/// Error statuses keep their status with an empty body; a success whose
/// body cannot be read has nothing usable and is unclassified.
fn into_response<E: std::fmt::Display>(
    status: u16,
    headers: Vec<(String, String)>,
    body: Result<String, E>,
) -> Result<HttpResponse, ApiError> {
    match body {
        Ok(body) => Ok(HttpResponse {
            status,
            headers,
            body,
        }),
        Err(e) if (200..300).contains(&status) => Err(ApiError::Unclassified(format!(
            "reading response body failed: {e}"
        ))),
        Err(_) => Ok(HttpResponse {
            status,
            headers,
            body: String::new(),
        }),
    }
}

fn no_response(err: ureq::Error) -> ApiError {
    ApiError::NoResponse {
        reason: err.to_string(),
    }
}
