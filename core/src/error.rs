//! Error types for request building, execution and response reading.
//!
//! # Design
//! One enum covers every failure the crate surfaces. Nothing is retried or
//! swallowed: each variant reaches the caller with its original cause where
//! one exists. `Application` is the only variant that describes a successful
//! round-trip; it carries the error envelope the backend answered with.

use crate::types::ErrorDescriptor;

/// Boxed cause reported by a `Transport`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `perform()` was called on a spec that no client produced, so there is
    /// no transport to run it on.
    #[error("no request built: perform() requires a spec created by a client verb")]
    NoRequestBuilt,

    /// `build()` was called before a method was set.
    #[error("request method is not set")]
    MissingMethod,

    /// The transport failed to complete the round-trip.
    #[error("request to {uri} failed: {source}")]
    RequestFailed {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// The response body did not match the requested shape.
    #[error("failed to read response body: {0}")]
    ResponseReadingFailed(#[source] serde_json::Error),

    /// The response body did not match the error envelope.
    #[error("response does not follow the error format: {0}")]
    ErrorReadingFailed(#[source] serde_json::Error),

    /// The URI could not be assembled from its parts.
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The backend reported an application error.
    #[error("backend reported an error: {0}")]
    Application(ErrorDescriptor),
}
