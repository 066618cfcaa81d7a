//! Version lifecycle: planning and executing transitions
//!
//! Each operation reads the event's history from the repository, runs one of the
//! pure `plan_*`/`check_*` functions against it and, only if that succeeds,
//! issues a single repository write. Activation and rollback go through
//! [`VersionRepository::set_status`], which archives the previous ACTIVE version
//! in the same atomic write.
use super::config::LifecycleConfig;
use super::error::{LifecycleError, Operation};
use super::repository::{StatusChange, StatusOutcome, VersionRepository};
use super::version::{NewVersion, VersionRecord, VersionStatus, VersionUpdate, validate_code};
use std::sync::Arc;

fn find<'a>(
    history: &'a [VersionRecord],
    version_id: &str,
) -> Result<&'a VersionRecord, LifecycleError> {
    history
        .iter()
        .find(|v| v.id == version_id)
        .ok_or_else(|| LifecycleError::NotFound(version_id.to_owned()))
}

fn refuse(version: &VersionRecord, operation: Operation) -> LifecycleError {
    LifecycleError::InvalidTransition {
        version_id: version.id.clone(),
        status: version.status,
        operation,
    }
}

fn active_id(history: &[VersionRecord]) -> Option<String> {
    history
        .iter()
        .find(|v| v.status == VersionStatus::Active)
        .map(|v| v.id.clone())
}

/// Checks a new draft against the code rules, the single draft rule and code uniqueness.
pub fn check_new_version(
    history: &[VersionRecord],
    event_key: &str,
    code: &str,
    config: &LifecycleConfig,
) -> Result<(), LifecycleError> {
    validate_code(code, config.max_code_len)?;

    if let Some(draft) = history.iter().find(|v| v.is_draft()) {
        return Err(LifecycleError::DuplicateDraft {
            event_key: event_key.to_owned(),
            draft_code: draft.code.clone(),
        });
    }
    if history.iter().any(|v| v.code == code) {
        return Err(LifecycleError::DuplicateCode {
            event_key: event_key.to_owned(),
            code: code.to_owned(),
        });
    }
    Ok(())
}

pub fn plan_activation(
    history: &[VersionRecord],
    version_id: &str,
) -> Result<StatusChange, LifecycleError> {
    let target = find(history, version_id)?;
    if !matches!(target.status, VersionStatus::Draft | VersionStatus::Approved) {
        return Err(refuse(target, Operation::Activate));
    }
    target.payload.validate_for_activation()?;

    Ok(StatusChange {
        event_key: target.event_key.clone(),
        target_id: target.id.clone(),
        expected_status: target.status,
        expected_active: active_id(history),
    })
}

pub fn plan_rollback(
    history: &[VersionRecord],
    version_id: &str,
) -> Result<StatusChange, LifecycleError> {
    let target = find(history, version_id)?;
    if target.status != VersionStatus::Archived {
        return Err(refuse(target, Operation::Rollback));
    }

    Ok(StatusChange {
        event_key: target.event_key.clone(),
        target_id: target.id.clone(),
        expected_status: target.status,
        expected_active: active_id(history),
    })
}

pub fn check_deletable<'a>(
    history: &'a [VersionRecord],
    version_id: &str,
) -> Result<&'a VersionRecord, LifecycleError> {
    let target = find(history, version_id)?;
    if !target.is_draft() {
        return Err(refuse(target, Operation::Delete));
    }
    Ok(target)
}

pub fn check_editable<'a>(
    history: &'a [VersionRecord],
    version_id: &str,
) -> Result<&'a VersionRecord, LifecycleError> {
    let target = find(history, version_id)?;
    if !target.is_draft() {
        return Err(refuse(target, Operation::Update));
    }
    Ok(target)
}

pub struct VersionLifecycle<R> {
    repository: Arc<R>,
    config: LifecycleConfig,
}

impl<R> Clone for VersionLifecycle<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            config: self.config.clone(),
        }
    }
}

impl<R: VersionRepository> VersionLifecycle<R> {
    pub fn new(repository: Arc<R>, config: LifecycleConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn history(&self, event_key: &str) -> Result<Vec<VersionRecord>, LifecycleError> {
        Ok(self.repository.list(event_key)?)
    }

    // the version id alone does not name the event, look it up first
    fn history_of(&self, version_id: &str) -> Result<Vec<VersionRecord>, LifecycleError> {
        let version = self.repository.get(version_id)?;
        self.history(&version.event_key)
    }

    pub fn create_version(
        &self,
        event_key: &str,
        code: &str,
        description: &str,
        actor: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        let history = self.history(event_key)?;
        check_new_version(&history, event_key, code, &self.config)?;

        let record = self
            .repository
            .create(event_key, NewVersion::new(code, description), actor)?;
        tracing::info!(
            event_key,
            version = %record.id,
            code = %record.code,
            actor,
            "created draft version"
        );
        Ok(record)
    }

    /// New draft in the source's event carrying a copy of the source payload.
    /// The source may be in any status.
    pub fn copy_version(
        &self,
        source_id: &str,
        new_code: &str,
        new_description: &str,
        actor: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        let source = self.repository.get(source_id)?;
        let history = self.history(&source.event_key)?;
        check_new_version(&history, &source.event_key, new_code, &self.config)?;

        let draft =
            NewVersion::new(new_code, new_description).with_payload(source.payload.clone());
        let record = self.repository.create(&source.event_key, draft, actor)?;

        let fingerprint = source
            .payload
            .fingerprint()
            .unwrap_or_else(|e| format!("unavailable: {e}"));
        tracing::info!(
            event_key = %source.event_key,
            source = %source.id,
            source_status = %source.status,
            version = %record.id,
            code = %record.code,
            payload = %fingerprint,
            actor,
            "copied version into new draft"
        );
        Ok(record)
    }

    /// Description and payload only change while the version is a draft.
    pub fn update_draft(
        &self,
        version_id: &str,
        changes: VersionUpdate,
        actor: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        let history = self.history_of(version_id)?;
        check_editable(&history, version_id)?;

        let record = self.repository.update(version_id, changes, actor)?;
        tracing::info!(
            event_key = %record.event_key,
            version = %record.id,
            actor,
            "updated draft version"
        );
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    pub fn activate(&self, version_id: &str, actor: &str) -> Result<StatusOutcome, LifecycleError> {
        let history = self.history_of(version_id)?;
        let change = plan_activation(&history, version_id)?;
        self.apply(&change, actor)
    }

    #[tracing::instrument(skip(self))]
    pub fn rollback(&self, version_id: &str, actor: &str) -> Result<StatusOutcome, LifecycleError> {
        let history = self.history_of(version_id)?;
        let change = plan_rollback(&history, version_id)?;
        self.apply(&change, actor)
    }

    fn apply(&self, change: &StatusChange, actor: &str) -> Result<StatusOutcome, LifecycleError> {
        match self.repository.set_status(change, actor) {
            Ok(outcome) => {
                tracing::info!(
                    event_key = %change.event_key,
                    activated = %outcome.activated.id,
                    archived = ?outcome.archived.as_ref().map(|v| &v.id),
                    "active version switched"
                );
                Ok(outcome)
            }
            Err(err) => {
                let err = LifecycleError::from(err);
                if let LifecycleError::ConflictOnWrite(_) = err {
                    tracing::warn!(
                        event_key = %change.event_key,
                        target = %change.target_id,
                        "active version changed concurrently, write refused"
                    );
                }
                Err(err)
            }
        }
    }

    pub fn delete_draft(
        &self,
        version_id: &str,
        actor: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        let history = self.history_of(version_id)?;
        let target = check_deletable(&history, version_id)?.clone();

        self.repository.remove(version_id)?;
        tracing::info!(
            event_key = %target.event_key,
            version = %target.id,
            code = %target.code,
            actor,
            "deleted draft version"
        );
        Ok(target)
    }
}
