use thiserror::Error;

/// Errors raised by the storage collaborators behind the trait boundary.
///
/// The engine never interprets these beyond wrapping them in
/// [`MatchingError::Dependency`]; the caller decides whether to retry or
/// surface an outage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Typed failure taxonomy for every engine operation.
///
/// Business-rule failures are returned as values so presentation layers can
/// branch on them directly; none of them should terminate the host process.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// Malformed input, self-targeting, or an otherwise invalid request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced profile, match, or undo record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate attempt detected, e.g. a repeated same-direction swipe.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested transition is not permitted from the current state,
    /// or the initiator is not a participant of the entity.
    #[error("invalid state: {0}")]
    State(String),

    /// Daily budget or session velocity ceiling exhausted.
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// The undo window has elapsed.
    #[error("undo window expired")]
    Expired,

    /// A storage collaborator failed; propagated, never swallowed.
    #[error("dependency failure: {0}")]
    Dependency(#[from] StorageError),
}

impl MatchingError {
    /// True for failures a caller could resolve by changing the request,
    /// as opposed to a collaborator outage.
    pub fn is_business_failure(&self) -> bool {
        !matches!(self, MatchingError::Dependency(_))
    }
}

pub type Result<T> = std::result::Result<T, MatchingError>;
