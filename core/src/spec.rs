//! Fluent description of a single HTTP request.
//!
//! # Design
//! A `RequestSpec` is owned by the caller while it is being configured. Every
//! `with_*` method consumes the spec and returns it, so configuration reads as
//! one chain. `with_param` and `with_header` append; `set_params` and
//! `set_headers` replace.
//!
//! Specs created by a `RequestClient` verb carry an executor (the client's
//! transport and error-header name) and can `perform()` themselves. Specs
//! created with `RequestSpec::new` can only be built.
//!
//! The body is serialized to JSON when it is attached. A serialization
//! failure is held back and reported by `build()`, which keeps the chain free
//! of intermediate `Result`s.

use serde::Serialize;
use url::Url;

use crate::client::Executor;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, MultiMap};
use crate::response::ResponseWrapper;
use crate::uri::{self, UriParts};

pub const DEFAULT_SCHEME: &str = "http";

/// A port given either as a number or as text; text is validated when the
/// URI is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Port {
    Number(u16),
    Text(String),
}

#[derive(Debug)]
pub struct RequestSpec {
    method: Option<HttpMethod>,
    scheme: String,
    host: Option<String>,
    port: Option<Port>,
    base_path: Option<String>,
    path: Option<String>,
    path_variables: Vec<String>,
    params: MultiMap,
    headers: MultiMap,
    body: Option<String>,
    body_error: Option<serde_json::Error>,
    uri: Option<Url>,
    executor: Option<Executor>,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            method: None,
            scheme: DEFAULT_SCHEME.to_string(),
            host: None,
            port: None,
            base_path: None,
            path: None,
            path_variables: Vec::new(),
            params: MultiMap::new(),
            headers: MultiMap::new(),
            body: None,
            body_error: None,
            uri: None,
            executor: None,
        }
    }
}

impl RequestSpec {
    /// A standalone spec with no client behind it.
    pub fn new() -> Self {
        Self::default()
    }

    /// A standalone spec whose URI is already resolved. `params` are kept for
    /// inspection but are not re-applied to `uri`.
    pub fn from_parts(uri: Url, headers: MultiMap, params: MultiMap, method: HttpMethod) -> Self {
        Self {
            method: Some(method),
            headers,
            params,
            uri: Some(uri),
            ..Self::default()
        }
    }

    pub(crate) fn with_executor(executor: Executor) -> Self {
        Self {
            executor: Some(executor),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(Port::Number(port));
        self
    }

    /// Set the port from text. An unparseable value makes `build()` fail with
    /// `Error::MalformedUri`.
    pub fn with_port_str(mut self, port: impl Into<String>) -> Self {
        self.port = Some(Port::Text(port.into()));
        self
    }

    /// Set the path. If a base path is already set, the effective path is
    /// `base_path + path`; slashes are not adjusted.
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        self.path = Some(match &self.base_path {
            Some(base) => format!("{base}{path}"),
            None => path.to_string(),
        });
        self
    }

    /// Values for the `{...}` placeholders of the path, in order.
    pub fn with_path_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_variables = variables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.add(name, value.to_string());
        self
    }

    /// Append several values to one parameter.
    pub fn with_params<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let name = name.into();
        for value in values {
            self.params.add(name.clone(), value.to_string());
        }
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Attach a JSON body. Only POST, PUT and PATCH requests send it.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(json) => {
                self.body = Some(json);
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(e);
            }
        }
        self
    }

    /// Use `uri` as is. No further assembly happens: host, port, path, path
    /// variables and params are ignored by `uri()` and `build()`.
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Set the base path. Only paths assigned afterwards are prefixed with it.
    pub fn set_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn set_params(mut self, params: MultiMap) -> Self {
        self.params = params;
        self
    }

    pub fn set_headers(mut self, headers: MultiMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn params(&self) -> &MultiMap {
        &self.params
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    /// The serialized JSON body, if one was attached.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Whether `build()` will put a body on the request.
    pub fn has_body(&self) -> bool {
        self.body.is_some() && self.method.is_some_and(|m| m.allows_body())
    }

    /// Whether `perform()` has a client to run on.
    pub fn is_ready_to_perform(&self) -> bool {
        self.executor.is_some()
    }

    /// The encoded target URI.
    pub fn uri(&self) -> Result<Url> {
        if let Some(uri) = &self.uri {
            return Ok(uri.clone());
        }
        let port = match &self.port {
            None => None,
            Some(Port::Number(n)) => Some(*n),
            Some(Port::Text(text)) => Some(
                text.trim()
                    .parse::<u16>()
                    .map_err(|_| Error::MalformedUri(format!("invalid port {text:?}")))?,
            ),
        };
        uri::assemble(&UriParts {
            scheme: &self.scheme,
            host: self.host.as_deref(),
            port,
            path: self.path.as_deref().or(self.base_path.as_deref()),
            path_variables: &self.path_variables,
            query: &self.params,
        })
    }

    /// Produce the final request description without executing it.
    pub fn build(mut self) -> Result<HttpRequest> {
        let method = self.method.ok_or(Error::MissingMethod)?;
        if let Some(e) = self.body_error.take() {
            return Err(Error::Serialization(e));
        }
        let uri = self.uri()?;

        let body = if method.allows_body() {
            self.body
        } else {
            if self.body.is_some() {
                log::warn!("dropping body attached to {method} request for {uri}");
            }
            None
        };

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let has_content_type = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        if body.is_some() && !has_content_type {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method,
            uri: uri.into(),
            headers,
            body,
        })
    }

    /// Build and execute the request on the client that created this spec.
    ///
    /// Fails with `Error::NoRequestBuilt` for a standalone spec.
    pub fn perform(mut self) -> Result<ResponseWrapper> {
        match self.executor.take() {
            Some(executor) => executor.perform(self),
            None => Err(Error::NoRequestBuilt),
        }
    }
}
