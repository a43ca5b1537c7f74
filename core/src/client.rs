//! Entry point holding per-client defaults and producing one `RequestSpec`
//! per HTTP verb.
//!
//! # Design
//! `RequestClient` keeps no per-request state. Each verb method returns an
//! independently owned spec, seeded with a copy of the current defaults and
//! carrying an `Executor` (shared transport plus error-header name) so the
//! spec can perform itself. Changing the defaults afterwards does not affect
//! specs that already exist, and one client can serve any number of callers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::{HttpMethod, MultiMap};
use crate::response::{ResponseWrapper, DEFAULT_ERROR_HEADER};
use crate::spec::{RequestSpec, DEFAULT_SCHEME};
use crate::transport::{Transport, UreqTransport};

/// Values copied into every spec a `RequestClient` creates.
///
/// Deserializable so defaults can come from a configuration file; missing
/// fields take their `Default` value. When both `port` and `port_str` are
/// set, `port_str` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDefaults {
    pub scheme: String,
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub port: Option<u16>,
    pub port_str: Option<String>,
    pub headers: MultiMap,
    pub params: MultiMap,
    pub error_header: String,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: None,
            base_path: None,
            port: None,
            port_str: None,
            headers: MultiMap::new(),
            params: MultiMap::new(),
            error_header: DEFAULT_ERROR_HEADER.to_string(),
        }
    }
}

/// What a spec needs to run itself: the client's transport and the error
/// header its responses are inspected with.
#[derive(Clone)]
pub(crate) struct Executor {
    transport: Arc<dyn Transport>,
    error_header: String,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("error_header", &self.error_header)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub(crate) fn perform(&self, spec: RequestSpec) -> Result<ResponseWrapper> {
        let request = spec.build()?;
        log::debug!("performing {} {}", request.method, request.uri);

        match self.transport.execute(&request) {
            Ok(response) => {
                log::debug!(
                    "{} {} answered {}",
                    request.method,
                    request.uri,
                    response.status
                );
                Ok(ResponseWrapper::new(response, self.error_header.as_str()))
            }
            Err(source) => {
                log::warn!("{} {} failed: {source}", request.method, request.uri);
                Err(Error::RequestFailed {
                    uri: request.uri,
                    source,
                })
            }
        }
    }
}

/// Synchronous HTTP client that hands out pre-configured request specs.
#[derive(Clone)]
pub struct RequestClient {
    defaults: ClientDefaults,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Default for RequestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestClient {
    /// A client with empty defaults and a `UreqTransport`.
    pub fn new() -> Self {
        Self::with_defaults(ClientDefaults::default())
    }

    pub fn with_defaults(defaults: ClientDefaults) -> Self {
        Self {
            defaults,
            transport: Arc::new(UreqTransport::new()),
        }
    }

    /// Shorthand for a client whose defaults are a host and a base path.
    pub fn for_host(host: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self::with_defaults(ClientDefaults {
            host: Some(host.into()),
            base_path: Some(base_path.into()),
            ..ClientDefaults::default()
        })
    }

    /// Replace the transport used by every spec created from now on.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn get(&self) -> RequestSpec {
        self.spec(HttpMethod::Get)
    }

    pub fn delete(&self) -> RequestSpec {
        self.spec(HttpMethod::Delete)
    }

    pub fn head(&self) -> RequestSpec {
        self.spec(HttpMethod::Head)
    }

    pub fn options(&self) -> RequestSpec {
        self.spec(HttpMethod::Options)
    }

    pub fn post(&self) -> RequestSpec {
        self.spec(HttpMethod::Post)
    }

    pub fn put(&self) -> RequestSpec {
        self.spec(HttpMethod::Put)
    }

    pub fn patch(&self) -> RequestSpec {
        self.spec(HttpMethod::Patch)
    }

    /// A spec for `method` seeded with a copy of the current defaults.
    pub fn request(&self, method: HttpMethod) -> RequestSpec {
        self.spec(method)
    }

    fn spec(&self, method: HttpMethod) -> RequestSpec {
        let defaults = &self.defaults;
        let mut spec = RequestSpec::with_executor(Executor {
            transport: Arc::clone(&self.transport),
            error_header: defaults.error_header.clone(),
        })
        .with_method(method)
        .with_scheme(defaults.scheme.as_str());

        if let Some(host) = &defaults.host {
            spec = spec.with_host(host.as_str());
        }
        if let Some(base_path) = &defaults.base_path {
            spec = spec.set_base_path(base_path.as_str());
        }
        if let Some(port) = &defaults.port_str {
            spec = spec.with_port_str(port.as_str());
        } else if let Some(port) = defaults.port {
            spec = spec.with_port(port);
        }
        if !defaults.headers.is_empty() {
            spec = spec.set_headers(defaults.headers.clone());
        }
        if !defaults.params.is_empty() {
            spec = spec.set_params(defaults.params.clone());
        }
        spec
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    pub fn default_host(&self) -> Option<&str> {
        self.defaults.host.as_deref()
    }

    pub fn set_default_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.defaults.host = Some(host.into());
        self
    }

    pub fn default_base_path(&self) -> Option<&str> {
        self.defaults.base_path.as_deref()
    }

    pub fn set_default_base_path(&mut self, base_path: impl Into<String>) -> &mut Self {
        self.defaults.base_path = Some(base_path.into());
        self
    }

    pub fn set_default_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.defaults.scheme = scheme.into();
        self
    }

    pub fn default_port(&self) -> Option<u16> {
        self.defaults.port
    }

    pub fn default_port_str(&self) -> Option<&str> {
        self.defaults.port_str.as_deref()
    }

    /// Set the default port; both representations are updated.
    pub fn set_default_port(&mut self, port: u16) -> &mut Self {
        self.defaults.port = Some(port);
        self.defaults.port_str = Some(port.to_string());
        self
    }

    /// Set the default port from text. The numeric form is updated when the
    /// text parses and cleared otherwise; the text itself is what specs use.
    pub fn set_default_port_str(&mut self, port: impl Into<String>) -> &mut Self {
        let port = port.into();
        self.defaults.port = port.trim().parse().ok();
        self.defaults.port_str = Some(port);
        self
    }

    pub fn default_headers(&self) -> &MultiMap {
        &self.defaults.headers
    }

    pub fn set_default_headers(&mut self, headers: MultiMap) -> &mut Self {
        self.defaults.headers = headers;
        self
    }

    pub fn add_default_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.defaults.headers.add(name, value);
        self
    }

    pub fn default_params(&self) -> &MultiMap {
        &self.defaults.params
    }

    pub fn set_default_params(&mut self, params: MultiMap) -> &mut Self {
        self.defaults.params = params;
        self
    }

    pub fn add_default_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.defaults.params.add(name, value);
        self
    }

    pub fn error_header(&self) -> &str {
        &self.defaults.error_header
    }

    pub fn set_error_header(&mut self, name: impl Into<String>) -> &mut Self {
        self.defaults.error_header = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::BoxError;
    use crate::http::{HttpRequest, HttpResponse};

    /// Records every request and answers with a canned response.
    #[derive(Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        response: HttpResponse,
    }

    impl Recorder {
        fn answering(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                response: HttpResponse {
                    status,
                    headers: headers
                        .iter()
                        .map(|(n, v)| (n.to_string(), v.to_string()))
                        .collect(),
                    body: body.to_string(),
                },
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, BoxError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: &HttpRequest) -> std::result::Result<HttpResponse, BoxError> {
            Err("connection refused".into())
        }
    }

    fn client(recorder: &Recorder) -> RequestClient {
        RequestClient::for_host("api.example.com", "/v1").with_transport(recorder.clone())
    }

    #[test]
    fn get_uses_default_host_and_base_path() {
        let recorder = Recorder::answering(200, &[], "[]");
        let response = client(&recorder)
            .get()
            .with_path("/users")
            .with_path_variables(Vec::<String>::new())
            .perform()
            .unwrap();
        assert_eq!(response.status(), 200);

        let requests = recorder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].uri, "http://api.example.com/v1/users");
        assert!(requests[0].body.is_none());
    }

    #[test]
    fn post_sends_serialized_body() {
        let recorder = Recorder::answering(201, &[], r#"{"name":"x"}"#);
        client(&recorder)
            .post()
            .with_body(&serde_json::json!({"name": "x"}))
            .with_path("/users")
            .perform()
            .unwrap();

        let request = &recorder.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.uri, "http://api.example.com/v1/users");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "x"}));
    }

    #[test]
    fn every_verb_sets_its_method() {
        let recorder = Recorder::answering(204, &[], "");
        let client = client(&recorder);
        let specs = [
            (client.get(), HttpMethod::Get),
            (client.delete(), HttpMethod::Delete),
            (client.head(), HttpMethod::Head),
            (client.options(), HttpMethod::Options),
            (client.post(), HttpMethod::Post),
            (client.put(), HttpMethod::Put),
            (client.patch(), HttpMethod::Patch),
        ];
        for (spec, method) in specs {
            assert_eq!(spec.method(), Some(method));
            assert!(spec.is_ready_to_perform());
        }
    }

    #[test]
    fn defaults_are_copied_not_shared() {
        let recorder = Recorder::answering(200, &[], "");
        let mut client = client(&recorder);
        client.add_default_header("X-Tenant", "a");
        let before = client.get();

        client.add_default_header("X-Tenant", "b");
        client.set_default_host("other.example.com");
        let after = client.get();

        assert_eq!(before.headers().get("X-Tenant").unwrap(), ["a"]);
        assert_eq!(before.host(), Some("api.example.com"));
        assert_eq!(after.headers().get("X-Tenant").unwrap(), ["a", "b"]);
        assert_eq!(after.host(), Some("other.example.com"));
    }

    #[test]
    fn spec_headers_append_to_defaults_without_touching_them() {
        let recorder = Recorder::answering(200, &[], "");
        let mut client = client(&recorder);
        client.add_default_header("Accept", "application/json");
        client.get().with_header("Accept", "text/plain").perform().unwrap();

        assert_eq!(client.default_headers().get("Accept").unwrap(), ["application/json"]);
        let request = &recorder.requests()[0];
        assert_eq!(
            request.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "text/plain".to_string()),
            ]
        );
    }

    #[test]
    fn default_params_are_applied() {
        let recorder = Recorder::answering(200, &[], "");
        let mut client = client(&recorder);
        client.add_default_param("lang", "es");
        client.get().with_path("/users").with_param("page", 2).perform().unwrap();
        assert_eq!(
            recorder.requests()[0].uri,
            "http://api.example.com/v1/users?lang=es&page=2"
        );
    }

    #[test]
    fn default_port_text_wins_over_number() {
        let recorder = Recorder::answering(200, &[], "");
        let client = RequestClient::with_defaults(ClientDefaults {
            host: Some("h".to_string()),
            port: Some(80),
            port_str: Some("8080".to_string()),
            ..ClientDefaults::default()
        })
        .with_transport(recorder.clone());
        client.get().perform().unwrap();
        assert_eq!(recorder.requests()[0].uri, "http://h:8080/");
    }

    #[test]
    fn default_port_setters_last_write_wins() {
        let mut client = RequestClient::new();
        client.set_default_port(9000);
        assert_eq!(client.default_port(), Some(9000));
        assert_eq!(client.default_port_str(), Some("9000"));

        client.set_default_port_str("9100");
        assert_eq!(client.default_port(), Some(9100));
        assert_eq!(client.default_port_str(), Some("9100"));

        client.set_default_port(9200);
        assert_eq!(client.default_port_str(), Some("9200"));
    }

    #[test]
    fn transport_failure_carries_uri() {
        let client = RequestClient::for_host("api.example.com", "/v1").with_transport(Unreachable);
        let err = client.delete().with_path("/users/{id}").with_path_variables(["3"]).perform().unwrap_err();
        match err {
            Error::RequestFailed { uri, source } => {
                assert_eq!(uri, "http://api.example.com/v1/users/3");
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn build_failure_skips_transport() {
        let recorder = Recorder::answering(200, &[], "");
        let err = client(&recorder)
            .get()
            .with_path("/users/{id}")
            .perform()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedUri(_)));
        assert!(recorder.requests().is_empty());
    }

    #[test]
    fn response_uses_configured_error_header() {
        let recorder = Recorder::answering(200, &[("X-App-Error", "true")], r#"{"code":"E"}"#);
        let mut client = client(&recorder);
        assert_eq!(client.error_header(), "ERROR");
        assert!(!client.get().perform().unwrap().has_error());

        client.set_error_header("X-App-Error");
        let response = client.get().perform().unwrap();
        assert!(response.has_error());
        assert_eq!(response.error_header(), "X-App-Error");
    }

    #[test]
    fn defaults_deserialize_with_fallbacks() {
        let defaults: ClientDefaults = serde_json::from_str(
            r#"{"host":"api.example.com","base_path":"/v1","headers":{"Accept":["application/json"]}}"#,
        )
        .unwrap();
        assert_eq!(defaults.scheme, "http");
        assert_eq!(defaults.error_header, "ERROR");
        assert_eq!(defaults.host.as_deref(), Some("api.example.com"));
        assert_eq!(defaults.headers.get_first("Accept"), Some("application/json"));
        assert!(defaults.params.is_empty());
    }

    #[test]
    fn client_is_shareable_across_threads() {
        let recorder = Recorder::answering(200, &[], "");
        let client = Arc::new(client(&recorder));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = Arc::clone(&client);
                std::thread::spawn(move || {
                    client
                        .get()
                        .with_path("/items/{id}")
                        .with_path_variables([i.to_string()])
                        .perform()
                        .map(|r| r.status())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 200);
        }
        let mut uris: Vec<_> = recorder.requests().into_iter().map(|r| r.uri).collect();
        uris.sort();
        assert_eq!(
            uris,
            [
                "http://api.example.com/v1/items/0",
                "http://api.example.com/v1/items/1",
                "http://api.example.com/v1/items/2",
                "http://api.example.com/v1/items/3",
            ]
        );
    }
}
