//! Read-only gating for the editors that hang off a version
use super::error::EditorError;
use super::version::{VersionRecord, VersionStatus};

/// Only a draft is editable. No version at all is read-only.
pub fn is_read_only(version: Option<&VersionRecord>) -> bool {
    !matches!(version, Some(v) if v.status == VersionStatus::Draft)
}

/// Snapshot consumed by the field, derived field, stage, indicator and
/// statement dependency editors of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContext {
    pub event_key: String,
    pub version_code: Option<String>,
    pub is_read_only: bool,
}

impl EditorContext {
    pub fn derive(event_key: &str, version: Option<&VersionRecord>) -> Self {
        Self {
            event_key: event_key.to_owned(),
            version_code: version.map(|v| v.code.clone()),
            is_read_only: is_read_only(version),
        }
    }

    /// Filter key for list calls. Listing is allowed on read-only versions.
    pub fn filter_key(&self) -> Result<&str, EditorError> {
        self.version_code
            .as_deref()
            .ok_or_else(|| EditorError::NoVersion(self.event_key.clone()))
    }

    /// Filter key for create, update and delete calls.
    pub fn require_writable(&self) -> Result<&str, EditorError> {
        let code = self.filter_key()?;
        if self.is_read_only {
            return Err(EditorError::ReadOnly {
                event_key: self.event_key.clone(),
                version_code: code.to_owned(),
            });
        }
        Ok(code)
    }
}
