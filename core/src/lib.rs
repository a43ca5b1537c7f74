//! Fluent builder for composing and executing HTTP requests, with typed
//! inspection of the responses.
//!
//! # Overview
//! A `RequestClient` holds defaults (host, base path, port, headers, query
//! parameters, error-header name) and hands out one `RequestSpec` per verb
//! call. The caller chains configuration onto the spec and either `build()`s
//! it into a plain `HttpRequest` or `perform()`s it through the client's
//! `Transport`, getting back a `ResponseWrapper` for error checks and JSON
//! decoding.
//!
//! ```no_run
//! use request_builder::RequestClient;
//!
//! let client = RequestClient::for_host("api.example.com", "/v1");
//! let users: Vec<serde_json::Value> = client
//!     .get()
//!     .with_path("/users")
//!     .with_param("page", 1)
//!     .perform()?
//!     .extract()?;
//! # Ok::<(), request_builder::Error>(())
//! ```
//!
//! # Design
//! - Specs are independently owned; the client keeps no per-request state.
//! - Network I/O sits behind the `Transport` trait; `UreqTransport` is the
//!   default implementation.
//! - A response is an error when its status is 300 or above, or when the
//!   configured error header (default `ERROR`) is `true`.

pub mod client;
pub mod error;
pub mod http;
pub mod response;
pub mod spec;
pub mod transport;
pub mod types;
pub mod uri;

pub use client::{ClientDefaults, RequestClient};
pub use error::{BoxError, Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultiMap};
pub use response::{ResponseWrapper, DEFAULT_ERROR_HEADER};
pub use spec::RequestSpec;
pub use transport::{Transport, UreqTransport};
pub use types::ErrorDescriptor;
