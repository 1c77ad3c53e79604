use thiserror::Error;

/// Failure of a single HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },
}

/// Why a login attempt did not produce a fresh authenticated session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("unrecognized redirect: {0}")]
    UnrecognizedRedirect(String),

    /// Bootstrap request was answered directly instead of being intercepted.
    #[error("bootstrap request was not redirected; already authenticated")]
    AlreadyAuthenticated,

    #[error("credentials rejected by portal")]
    InvalidCredentials,

    #[error("redirect limit of {0} hops exceeded")]
    RedirectLimitExceeded(usize),

    #[error("login submission returned 200 without a redirect")]
    NoRedirectAfterSubmit,

    #[error("login submission failed with status {0}")]
    SubmissionFailed(u16),

    #[error("unexpected status {0}")]
    TransportFailure(u16),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl LoginError {
    /// Rejections the portal made on purpose; retrying with the same
    /// credentials cannot succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginError::InvalidCredentials)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
