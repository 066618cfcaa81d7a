use super::version::VersionStatus;
use std::fmt;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required payload fields are missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Version code must not be empty")]
    EmptyCode,
    #[error("Version code `{0}` is longer than {1} characters")]
    CodeTooLong(String, usize),
    #[error("Version code `{0}` may only contain letters, digits, '.', '_' and '-'")]
    InvalidCode(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("Version `{0}` does not exist")]
    NotFound(String),
    #[error(
        "Active version of event `{event_key}` changed underneath the write (expected {expected:?}, found {found:?})"
    )]
    Conflict {
        event_key: String,
        expected: Option<String>,
        found: Option<String>,
    },
    #[error("Event `{event_key}` already has an open draft `{draft_code}`")]
    DraftExists {
        event_key: String,
        draft_code: String,
    },
    #[error("Event `{event_key}` already has a version coded `{code}`")]
    CodeTaken { event_key: String, code: String },
    #[error("Version `{version_id}` of event `{event_key}` is {found}, expected {expected}")]
    StatusChanged {
        event_key: String,
        version_id: String,
        expected: VersionStatus,
        found: VersionStatus,
    },
    #[error("Version `{0}` cannot be activated: {1}")]
    Incomplete(String, #[source] ValidationError),
    #[error("Failed to encode version records: {0}")]
    Encoding(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("Failed to decode version records: {0}")]
    Decoding(#[from] minicbor::decode::Error),
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to allocate a version id: {0}")]
    IdAllocation(#[source] anyhow::Error),
}

/// The lifecycle operation that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Update,
    Activate,
    Rollback,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Update => "update",
            Operation::Activate => "activate",
            Operation::Rollback => "roll back",
            Operation::Delete => "delete",
        };
        f.write_str(verb)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("Event `{event_key}` already has an open draft `{draft_code}`")]
    DuplicateDraft {
        event_key: String,
        draft_code: String,
    },
    #[error("Event `{event_key}` already has a version coded `{code}`")]
    DuplicateCode { event_key: String, code: String },
    #[error("Cannot {operation} version `{version_id}` while it is {status}")]
    InvalidTransition {
        version_id: String,
        status: VersionStatus,
        operation: Operation,
    },
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("Version `{0}` was not found")]
    NotFound(String),
    #[error("Event `{0}` was modified concurrently, reload before retrying")]
    ConflictOnWrite(String),
    #[error("Repository request failed: {0}")]
    Repository(#[source] RepositoryError),
}

impl LifecycleError {
    /// Failures outside the lifecycle taxonomy, shown to the user as a generic retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, LifecycleError::Repository(_))
    }
}

impl From<RepositoryError> for LifecycleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => LifecycleError::NotFound(id),
            RepositoryError::Conflict { event_key, .. }
            | RepositoryError::StatusChanged { event_key, .. } => {
                LifecycleError::ConflictOnWrite(event_key)
            }
            RepositoryError::DraftExists {
                event_key,
                draft_code,
            } => LifecycleError::DuplicateDraft {
                event_key,
                draft_code,
            },
            RepositoryError::CodeTaken { event_key, code } => {
                LifecycleError::DuplicateCode { event_key, code }
            }
            RepositoryError::Incomplete(_, err) => LifecycleError::ValidationFailed(err),
            other => LifecycleError::Repository(other),
        }
    }
}

/// Refusals handed to dependent editors before they issue a mutation.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EditorError {
    #[error("Event `{0}` has no version to edit")]
    NoVersion(String),
    #[error("Version `{version_code}` of event `{event_key}` is read-only")]
    ReadOnly {
        event_key: String,
        version_code: String,
    },
}
