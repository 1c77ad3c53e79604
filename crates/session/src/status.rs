use std::fmt;

/// What the orchestrator tells whoever renders its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Offline,
    RetryLimitReached,
    CheckLoopTimedOut,
    /// A tick arrived while an attempt was still outstanding
    InProgress,
    Checking,
    LoggingIn,
    Online,
    AuthRejected,
    OfflineLoginFailed,
}

impl SessionStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, SessionStatus::Online)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Offline => "Offline",
            SessionStatus::RetryLimitReached => "Reached retry limit",
            SessionStatus::CheckLoopTimedOut => "Check loop timed out",
            SessionStatus::InProgress => "In progress",
            SessionStatus::Checking => "Checking...",
            SessionStatus::LoggingIn => "Trying to login...",
            SessionStatus::Online => "Online",
            SessionStatus::AuthRejected => "Authentication rejected",
            SessionStatus::OfflineLoginFailed => "Offline (login failed)",
        };
        f.write_str(s)
    }
}

/// A status plus optional detail, as handed to a [`StatusSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: SessionStatus,
    pub detail: Option<String>,
}

impl StatusReport {
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn with_detail(status: SessionStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Some(detail.into()),
        }
    }
}

pub trait StatusSink: Send + Sync {
    fn report(&self, report: &StatusReport);
}
