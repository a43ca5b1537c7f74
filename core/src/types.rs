//! DTOs exchanged with backends that follow the error-header convention.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error envelope returned in the body of a response flagged as an error.
///
/// Only `code` is required. Unknown fields are ignored so backends may add
/// their own without breaking decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDescriptor {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.code),
            None => f.write_str(&self.code),
        }
    }
}
