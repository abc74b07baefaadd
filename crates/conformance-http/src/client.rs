// crates/conformance-http/src/client.rs
// ============================================================================
// Module: Bounded HTTP Client
// Description: Blocking HTTP client used by the built-in clause checks.
// Purpose: Issue requests against the target with strict scheme, host, and size limits.
// Dependencies: conformance-core, reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! The client issues one request per call and captures the exchange as a
//! [`ResponseRecord`]. It enforces scheme restrictions, rejects credentials
//! embedded in URLs, honors an optional host allowlist, refuses local
//! addresses unless private networks are allowed, never follows
//! redirects (a redirect is itself a clause outcome), and caps response size.
//! Hostnames are resolved once, every address is vetted, and the request is
//! pinned to a vetted address so a second lookup cannot redirect it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::btree_map::Entry;
use std::io::Read;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use conformance_core::ResponseRecord;
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Optional host allowlist.
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// Allow requests to private, link-local, and loopback addresses.
    pub allow_private_networks: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout_ms: 5_000,
            max_response_bytes: 1024 * 1024,
            allowed_hosts: None,
            allow_private_networks: false,
            user_agent: "conformance/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request methods the built-in checks issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// HEAD request; the response body is never read.
    Head,
    /// OPTIONS request.
    Options,
}

impl HttpMethod {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Converts to the reqwest method.
    fn as_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Head => Method::HEAD,
            Self::Options => Method::OPTIONS,
        }
    }
}

/// A single request issued by a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: Url,
    /// Extra request headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    /// Creates a request with no extra headers.
    #[must_use]
    pub const fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP client failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The underlying client could not be built.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    /// The URL scheme is not permitted.
    #[error("unsupported url scheme: {0}")]
    Scheme(String),
    /// The URL carries a username or password.
    #[error("url must not embed credentials")]
    Credentials,
    /// The URL has no host.
    #[error("url host required")]
    MissingHost,
    /// The host is not on the allowlist.
    #[error("url host not allowed: {0}")]
    HostNotAllowed(String),
    /// The host could not be resolved to any address.
    #[error("url host resolution failed: {0}")]
    Resolve(String),
    /// The host resolves to a private or link-local address.
    #[error("url host resolves to private or link-local address: {0}")]
    PrivateAddress(String),
    /// The request could not be completed.
    #[error("http request failed: {0}")]
    Request(String),
    /// The response body is larger than permitted.
    #[error("http response exceeds size limit of {0} bytes")]
    TooLarge(usize),
    /// The response body ended before its declared length.
    #[error("http response truncated")]
    Truncated,
    /// The response body could not be read.
    #[error("failed to read response: {0}")]
    Read(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking HTTP client with policy enforcement.
pub struct HttpClient {
    /// Client configuration, including limits and policy.
    config: HttpClientConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientBuild`] when the HTTP client cannot be created.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let client = build_client(&config, None)?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Sends a request and captures the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when policy rejects the URL, the request fails, or
    /// the response violates the size limit.
    pub fn send(&self, request: &RequestSpec) -> Result<ResponseRecord, HttpError> {
        validate_url(&request.url, &self.config)?;
        let resolved = resolve_request_host(&request.url, &self.config)?;
        let mut response = self.send_pinned(request, &resolved)?;
        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match headers.entry(name.as_str().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    let joined = slot.get_mut();
                    joined.push_str(", ");
                    joined.push_str(&value);
                }
            }
        }
        let body = match request.method {
            HttpMethod::Head => Vec::new(),
            HttpMethod::Get | HttpMethod::Options => {
                read_response_limited(&mut response, self.config.max_response_bytes)?
            }
        };
        tracing::debug!(method = request.method.as_str(), url = %request.url, status, "http exchange captured");
        Ok(ResponseRecord {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status,
            headers,
            body,
        })
    }
}

impl HttpClient {
    /// Sends a request pinned to each vetted address in turn.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when every address fails or the connected peer
    /// violates the address policy.
    fn send_pinned(&self, request: &RequestSpec, resolved: &ResolvedHost) -> Result<Response, HttpError> {
        let mut last_error: Option<HttpError> = None;
        for ip in &resolved.ips {
            let client = match self.client_for_ip(resolved, *ip) {
                Ok(client) => client,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            let mut builder = client.request(request.method.as_reqwest(), request.url.clone());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match builder.send() {
                Ok(response) => {
                    let peer = response.remote_addr().map_or(*ip, |addr| addr.ip());
                    enforce_ip_policy(&resolved.host_label, peer, self.config.allow_private_networks)?;
                    return Ok(response);
                }
                Err(err) => {
                    tracing::debug!(host = %resolved.host_label, %ip, error = %err, "pinned request failed");
                    last_error = Some(HttpError::Request(err.to_string()));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| HttpError::Resolve(resolved.host_label.clone())))
    }

    /// Returns a client that connects to `ip` for hostname URLs.
    fn client_for_ip(&self, resolved: &ResolvedHost, ip: IpAddr) -> Result<Client, HttpError> {
        if !resolved.is_domain {
            return Ok(self.client.clone());
        }
        build_client(&self.config, Some((&resolved.host, SocketAddr::new(ip, resolved.port))))
    }
}

// ============================================================================
// SECTION: Address Policy
// ============================================================================

/// Request host after resolution and address vetting.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedHost {
    /// Host used for resolution, without IPv6 brackets.
    host: String,
    /// Host as written in the URL, used in errors.
    host_label: String,
    /// Port the request connects to.
    port: u16,
    /// Vetted addresses in resolution order, without duplicates.
    ips: Vec<IpAddr>,
    /// Whether the host is a name rather than an IP literal.
    is_domain: bool,
}

/// Resolves the URL host and vets every address against the policy.
fn resolve_request_host(url: &Url, config: &HttpClientConfig) -> Result<ResolvedHost, HttpError> {
    let host_label = url.host_str().ok_or(HttpError::MissingHost)?;
    let host = host_label.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(host_label);
    let port = url.port_or_known_default().ok_or(HttpError::MissingHost)?;
    let literal = host.parse::<IpAddr>().ok();
    let resolved: Vec<IpAddr> = match literal {
        Some(ip) => vec![ip],
        None => (host, port)
            .to_socket_addrs()
            .map_err(|err| HttpError::Resolve(format!("{host_label}: {err}")))?
            .map(|addr| addr.ip())
            .collect(),
    };
    let mut ips: Vec<IpAddr> = Vec::with_capacity(resolved.len());
    for ip in resolved {
        enforce_ip_policy(host_label, ip, config.allow_private_networks)?;
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    if ips.is_empty() {
        return Err(HttpError::Resolve(host_label.to_string()));
    }
    Ok(ResolvedHost {
        host: host.to_string(),
        host_label: host_label.to_string(),
        port,
        ips,
        is_domain: literal.is_none(),
    })
}

/// Rejects local addresses unless private networks are allowed.
fn enforce_ip_policy(host_label: &str, ip: IpAddr, allow_private_networks: bool) -> Result<(), HttpError> {
    if !allow_private_networks && is_local_address(&ip) {
        return Err(HttpError::PrivateAddress(host_label.to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a blocking client, optionally pinning one host to one address.
fn build_client(config: &HttpClientConfig, pin: Option<(&str, SocketAddr)>) -> Result<Client, HttpError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none());
    if let Some((host, addr)) = pin {
        builder = builder.resolve(host, addr);
    }
    builder.build().map_err(|err| HttpError::ClientBuild(err.to_string()))
}

/// Validates URL scheme, credentials, and allowlist policy.
///
/// # Errors
///
/// Returns [`HttpError`] naming the first policy violation.
pub fn validate_url(url: &Url, config: &HttpClientConfig) -> Result<(), HttpError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        other => return Err(HttpError::Scheme(other.to_string())),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(HttpError::Credentials);
    }
    let host = url.host_str().ok_or(HttpError::MissingHost)?;
    if let Some(allowlist) = &config.allowed_hosts
        && !allowlist.contains(host)
    {
        return Err(HttpError::HostNotAllowed(host.to_string()));
    }
    Ok(())
}

/// Returns true when an IP is private, loopback, link-local, or otherwise local.
const fn is_local_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => is_local_v4(addr),
        IpAddr::V6(addr) => {
            let mapped_local = match addr.to_ipv4_mapped() {
                Some(mapped) => is_local_v4(&mapped),
                None => false,
            };
            mapped_local
                || addr.is_loopback()
                || addr.is_unique_local()
                || addr.is_unicast_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
        }
    }
}

/// Returns true for local IPv4 ranges.
const fn is_local_v4(addr: &Ipv4Addr) -> bool {
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_multicast()
        || addr.is_broadcast()
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, HttpError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| HttpError::TooLarge(max_bytes))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(HttpError::TooLarge(max_bytes));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|err| HttpError::Read(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(HttpError::TooLarge(max_bytes));
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected).map_err(|_| HttpError::Truncated)?;
        if buf.len() < expected {
            return Err(HttpError::Truncated);
        }
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
