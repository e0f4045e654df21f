use crate::verdict::VerdictStatus;
use chrono::{DateTime, Utc};

/// Precondition violations surfaced to the caller. None of these are
/// retried internally; a rejected call leaves the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("out-of-order event for ({orientation}, {flaw_type}): {timestamp} precedes last seen {last_seen}")]
    OutOfOrderEvent {
        orientation: String,
        flaw_type: String,
        timestamp: DateTime<Utc>,
        last_seen: DateTime<Utc>,
    },
    #[error("unknown orientation: {0}")]
    UnknownOrientation(String),
    #[error("unknown flaw type: {0}")]
    UnknownFlawType(String),
    #[error("session is sealed; no further events or finalization accepted")]
    SessionAlreadySealed,
    #[error("inspection incomplete; orientations not yet closed: {missing:?}")]
    IncompleteInspection { missing: Vec<String> },
    #[error("override requires a FAILED verdict, got {0:?}")]
    InvalidOverride(VerdictStatus),
}
