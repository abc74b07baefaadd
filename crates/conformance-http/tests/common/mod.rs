// crates/conformance-http/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Local tiny_http target and client helpers for HTTP check tests.
// Purpose: Serve fixed routes and record what the checks actually sent.
// Dependencies: conformance-http, tiny_http
// ============================================================================

//! ## Overview
//! [`TestServer`] answers every request from a fixed route table until it is
//! finished, recording method, path, and headers of each request.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use conformance_http::HttpClient;
use conformance_http::HttpClientConfig;
use conformance_http::Url;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Fixed response for one path.
#[derive(Clone)]
pub struct Route {
    /// Request path matched exactly.
    pub path: &'static str,
    /// Response status code.
    pub status: u16,
    /// Response body.
    pub body: &'static str,
    /// Extra response headers.
    pub headers: Vec<(&'static str, &'static str)>,
}

impl Route {
    /// Creates a route with no extra headers.
    #[must_use]
    pub const fn new(path: &'static str, status: u16, body: &'static str) -> Self {
        Self {
            path,
            status,
            body,
            headers: Vec::new(),
        }
    }

    /// Adds a response header.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// Request observed by the server.
#[derive(Clone)]
pub struct SeenRequest {
    /// Request method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Request headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
}

/// Local target serving a route table.
pub struct TestServer {
    /// Base URL of the server.
    pub base_url: Url,
    /// Requests received so far.
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    /// Stop flag polled by the serving thread.
    stop: Arc<AtomicBool>,
    /// Serving thread.
    handle: thread::JoinHandle<()>,
}

impl TestServer {
    /// Starts a server on an ephemeral port.
    #[must_use]
    pub fn spawn(routes: Vec<Route>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let base_url = Url::parse(&format!("http://{addr}/")).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_seen = Arc::clone(&seen);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(50)) else {
                    continue;
                };
                let headers = request
                    .headers()
                    .iter()
                    .map(|header| {
                        (header.field.as_str().as_str().to_ascii_lowercase(), header.value.as_str().to_string())
                    })
                    .collect();
                let path = request.url().to_string();
                thread_seen.lock().unwrap().push(SeenRequest {
                    method: request.method().to_string(),
                    path: path.clone(),
                    headers,
                });
                let route = routes.iter().find(|route| route.path == path);
                let response = match route {
                    Some(route) => {
                        let mut response =
                            Response::from_string(route.body).with_status_code(route.status);
                        for (name, value) in &route.headers {
                            response.add_header(Header::from_bytes(*name, *value).unwrap());
                        }
                        response
                    }
                    None => Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            seen,
            stop,
            handle,
        }
    }

    /// Stops the server and returns every request it saw.
    #[must_use]
    pub fn finish(self) -> Vec<SeenRequest> {
        self.stop.store(true, Ordering::SeqCst);
        self.handle.join().unwrap();
        self.seen.lock().unwrap().clone()
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Creates a client allowing cleartext HTTP to the local host only.
#[must_use]
pub fn local_client() -> Arc<HttpClient> {
    Arc::new(HttpClient::new(local_config()).unwrap())
}

/// Returns a config allowing cleartext HTTP to the local host only.
#[must_use]
pub fn local_config() -> HttpClientConfig {
    let mut allowed_hosts = BTreeSet::new();
    allowed_hosts.insert("127.0.0.1".to_string());
    HttpClientConfig {
        allow_http: true,
        allowed_hosts: Some(allowed_hosts),
        allow_private_networks: true,
        timeout_ms: 5_000,
        ..HttpClientConfig::default()
    }
}
