//! The network seam: anything that can turn an `HttpRequest` into an
//! `HttpResponse`.
//!
//! `UreqTransport` is the default. Tests inject their own implementation
//! through `RequestClient::with_transport`.

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations report statuses as data. Only failures that prevent a
/// response from being produced (connect errors, timeouts, invalid requests)
/// are returned as `Err`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// Blocking transport backed by a `ureq::Agent`.
///
/// The agent is configured so 4xx/5xx responses are returned as data rather
/// than `Err`, leaving status interpretation to `ResponseWrapper`.
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

    /// Use a caller-configured agent, e.g. one with timeouts or a proxy.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.uri.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = match &request.body {
            Some(body) => self.agent.run(builder.body(body.clone())?)?,
            None => self.agent.run(builder.body(())?)?,
        };

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
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse { status, headers, body })
    }
}
