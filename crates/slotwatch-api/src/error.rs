use thiserror::Error;

/// Top-level error type for the `slotwatch-api` crate.
///
/// Covers every failure mode of a node round-trip: transport, non-success
/// status, the cron "not found" reply, and body decoding.
/// `slotwatch-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Node replies ────────────────────────────────────────────────
    /// The node answered with a non-success status.
    #[error("Node returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The cron device no longer knows the task (already finished or
    /// cancelled elsewhere).
    #[error("Task not found on node: {task_id}")]
    TaskNotFound { task_id: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Body could not be decoded, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status attached to this error, if the node answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
