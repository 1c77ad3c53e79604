use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::{LoginError, TransportError};

/// Everything the protocol engine needs from an HTTP stack
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn execute(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError>;
}

/// Portal account. Supplied once per session, never written anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// urlencoded form body, POST only
    pub form: Vec<(String, String)>,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub verify_tls: bool,
}

impl PortalRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            form: Vec::new(),
            proxy: None,
            timeout,
            follow_redirects: false,
            verify_tls: true,
        }
    }

    pub fn post_form(url: Url, form: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            form,
            ..Self::get(url, timeout)
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub url: Url,
    pub status: u16,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub body: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
}

impl PortalResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302)
    }
}

/// Result of one connectivity probe. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// External network reachable, directly or through the proxy
    Authenticated,
    /// Reachable, but traffic lands on the portal's login page
    PortalBlocking,
    /// Nothing answered: offline or still associating
    Indeterminate,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Authenticated => f.write_str("authenticated"),
            ProbeOutcome::PortalBlocking => f.write_str("portal blocking"),
            ProbeOutcome::Indeterminate => f.write_str("indeterminate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Http3xx,
    ScriptRedirect,
    AuthFailureMarker,
    Terminal,
}

/// Where a hop points next. Recomputed for every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub url: Url,
    pub kind: RedirectKind,
}

impl RedirectTarget {
    pub fn is_terminal(&self) -> bool {
        self.kind == RedirectKind::Terminal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub successful: bool,
    pub error: Option<LoginError>,
}

impl LoginResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            error: None,
        }
    }

    pub fn failure(error: LoginError) -> Self {
        Self {
            successful: false,
            error: Some(error),
        }
    }
}

impl From<Result<(), LoginError>> for LoginResult {
    fn from(result: Result<(), LoginError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(e),
        }
    }
}
