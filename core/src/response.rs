//! Inspection and typed decoding of executed responses.
//!
//! # Design
//! `ResponseWrapper` owns the raw `HttpResponse` together with the name of the
//! error header it should honour. It never mutates the response and is built
//! once per performed request.
//!
//! Decoding follows two codec rules: unknown fields are ignored (serde's
//! default for structs without `deny_unknown_fields`), and an empty JSON array
//! decodes as null when the target type cannot hold an array, so `[]` becomes
//! `None` for an `Option<T>` target.

use serde::de::{DeserializeOwned, IgnoredAny};

use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::types::ErrorDescriptor;

/// Header name that flags an application error on a 2xx response unless the
/// client is configured otherwise.
pub const DEFAULT_ERROR_HEADER: &str = "ERROR";

#[derive(Debug, Clone)]
pub struct ResponseWrapper {
    response: HttpResponse,
    error_header: String,
}

impl ResponseWrapper {
    pub fn new(response: HttpResponse, error_header: impl Into<String>) -> Self {
        Self {
            response,
            error_header: error_header.into(),
        }
    }

    /// True when the status is 300 or above, or when the error header is
    /// present and its first value is `true` (case-insensitive).
    pub fn has_error(&self) -> bool {
        if self.response.status >= 300 {
            return true;
        }
        self.response
            .header(&self.error_header)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.response.headers
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    pub fn body(&self) -> &str {
        &self.response.body
    }

    pub fn error_header(&self) -> &str {
        &self.error_header
    }

    pub fn into_inner(self) -> HttpResponse {
        self.response
    }

    /// Decode the body as `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.response.body).map_err(Error::ResponseReadingFailed)
    }

    /// Decode the body as the backend's error envelope.
    pub fn decode_error(&self) -> Result<ErrorDescriptor> {
        decode(&self.response.body).map_err(Error::ErrorReadingFailed)
    }

    /// Decode the body as `T`, or return `Error::Application` with the decoded
    /// envelope when the response carries an error.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        if self.has_error() {
            let descriptor = self.decode_error()?;
            log::debug!(
                "response {} flagged as error: {descriptor}",
                self.response.status
            );
            return Err(Error::Application(descriptor));
        }
        self.decode_body()
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> serde_json::Result<T> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(err) => {
            let empty_array = serde_json::from_str::<Vec<IgnoredAny>>(body)
                .is_ok_and(|items| items.is_empty());
            if empty_array {
                serde_json::from_value(serde_json::Value::Null).map_err(|_| err)
            } else {
                Err(err)
            }
        }
    }
}
