use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockupError {
    // ── Parse errors ─────────────────────────────────────────────────────────
    #[error("invalid lock duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid end time {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid amount {value:?} for denom {denom}")]
    InvalidAmount { denom: String, value: String },

    // ── Transport errors ─────────────────────────────────────────────────────
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("decoding response: {0}")]
    Decode(String),

    // ── General ──────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LockupError {
    fn from(e: serde_json::Error) -> Self {
        LockupError::Decode(e.to_string())
    }
}
