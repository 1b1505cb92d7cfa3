// ── Core error types ──
//
// Errors surfaced by slotwatch-core. Consumers never see reqwest errors
// or raw node replies directly: the `From<slotwatch_api::Error>` impl is
// the one place transport failures become domain variants.

use thiserror::Error;

use crate::model::EntityId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Node errors ──────────────────────────────────────────────────
    /// Node unreachable, timed out, or answered with a non-success status.
    #[error("Node unavailable{}: {message}", http_suffix(.status.as_ref()))]
    UpstreamUnavailable {
        /// HTTP status, absent when the node never answered.
        status: Option<u16>,
        message: String,
    },

    /// Node answered but the body was not what the endpoint promises.
    #[error("Malformed node response: {body:?}")]
    MalformedResponse { body: String },

    // ── Caller errors ────────────────────────────────────────────────
    #[error("No active task for entity {entity}")]
    NoActiveTask { entity: EntityId },

    #[error("Entity not found: {entity}")]
    EntityNotFound { entity: EntityId },

    #[error("Invalid entity id {id:?}: {reason}")]
    InvalidEntityId { id: String, reason: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("State file {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("State file {path} is locked by another process")]
    StateLocked { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn http_suffix(status: Option<&u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl CoreError {
    /// HTTP status carried by an [`UpstreamUnavailable`](Self::UpstreamUnavailable).
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamUnavailable { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<slotwatch_api::Error> for CoreError {
    fn from(err: slotwatch_api::Error) -> Self {
        match err {
            slotwatch_api::Error::Transport(ref e) => CoreError::UpstreamUnavailable {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            slotwatch_api::Error::Status { status, body } => CoreError::UpstreamUnavailable {
                status: Some(status),
                message: body,
            },
            slotwatch_api::Error::TaskNotFound { task_id } => CoreError::UpstreamUnavailable {
                status: Some(404),
                message: format!("task {task_id} not found"),
            },
            slotwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid node URL: {e}"),
            },
            slotwatch_api::Error::Deserialization { body, .. } => {
                CoreError::MalformedResponse { body }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_maps_to_upstream_unavailable() {
        let err = CoreError::from(slotwatch_api::Error::Status {
            status: 503,
            body: "warming up".into(),
        });
        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(err.to_string(), "Node unavailable (HTTP 503): warming up");
    }

    #[test]
    fn deserialization_maps_to_malformed() {
        let err = CoreError::from(slotwatch_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(matches!(err, CoreError::MalformedResponse { ref body } if body == "<html>"));
    }
}
