use thiserror::Error;

/// Failure to turn a signaling or chat frame into a typed message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} message is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("expected a {expected} description, got {actual}")]
    UnexpectedSdpKind {
        expected: &'static str,
        actual: &'static str,
    },
}
