//! Per-event session that keeps the selected version and its editability in
//! step with the repository.
use super::error::LifecycleError;
use super::lifecycle::VersionLifecycle;
use super::policy::EditorContext;
use super::repository::{StatusOutcome, VersionRepository};
use super::selector::select_current;
use super::version::{VersionRecord, VersionUpdate};

pub struct VersionSession<R> {
    lifecycle: VersionLifecycle<R>,
    actor: String,
    event_key: String,
    history: Vec<VersionRecord>,
    current: Option<VersionRecord>,
    pinned: Option<String>, // chosen through select_version
    editor: EditorContext,
}

impl<R: VersionRepository> VersionSession<R> {
    /// Opens `event_key` on behalf of `actor` and loads its history.
    pub fn open(
        lifecycle: VersionLifecycle<R>,
        event_key: &str,
        actor: &str,
    ) -> Result<Self, LifecycleError> {
        let mut session = Self {
            lifecycle,
            actor: actor.to_owned(),
            event_key: event_key.to_owned(),
            history: Vec::new(),
            current: None,
            pinned: None,
            editor: EditorContext::derive(event_key, None),
        };
        session.load(event_key)?;
        Ok(session)
    }

    /// Switches the session to another event.
    pub fn load(&mut self, event_key: &str) -> Result<(), LifecycleError> {
        self.event_key = event_key.to_owned();
        self.pinned = None;
        self.refresh()
    }

    /// Re-reads the history. A pinned version stays selected while it exists.
    ///
    /// When the read fails the session forgets its history, which leaves no
    /// current version and a read-only editor context.
    pub fn refresh(&mut self) -> Result<(), LifecycleError> {
        match self.lifecycle.history(&self.event_key) {
            Ok(history) => {
                self.history = history;
                self.reselect();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    event_key = %self.event_key,
                    error = %err,
                    "failed to refresh version history"
                );
                self.history.clear();
                self.pinned = None;
                self.reselect();
                Err(err)
            }
        }
    }

    fn reselect(&mut self) {
        let pinned = self
            .pinned
            .as_deref()
            .and_then(|id| self.history.iter().find(|v| v.id == id))
            .cloned();
        if pinned.is_none() {
            self.pinned = None;
        }
        self.current = pinned.or_else(|| select_current(&self.history).cloned());
        self.editor = EditorContext::derive(&self.event_key, self.current.as_ref());
    }

    pub fn select_version(&mut self, version_id: &str) -> Result<&EditorContext, LifecycleError> {
        self.ensure_known(version_id)?;
        self.pinned = Some(version_id.to_owned());
        self.reselect();
        Ok(&self.editor)
    }

    // ids from another tab may be newer than our history, look once more before giving up
    fn ensure_known(&mut self, version_id: &str) -> Result<(), LifecycleError> {
        if self.history.iter().any(|v| v.id == version_id) {
            return Ok(());
        }
        self.refresh()?;
        if self.history.iter().any(|v| v.id == version_id) {
            Ok(())
        } else {
            Err(LifecycleError::NotFound(version_id.to_owned()))
        }
    }

    // Runs a lifecycle call and refreshes afterwards whatever the outcome.
    // The result is the lifecycle call's: a committed write is reported as
    // such even when the refresh behind it fails, which leaves the session
    // empty and read-only until the next successful refresh.
    fn mutate<T>(
        &mut self,
        keep_pin: bool,
        op: impl FnOnce(&VersionLifecycle<R>, &str) -> Result<T, LifecycleError>,
    ) -> Result<T, LifecycleError> {
        let outcome = op(&self.lifecycle, &self.actor);
        if !keep_pin {
            self.pinned = None;
        }
        // a failed refresh is logged there
        let _ = self.refresh();
        outcome
    }

    pub fn create_version(
        &mut self,
        code: &str,
        description: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        let event_key = self.event_key.clone();
        self.mutate(false, |lifecycle, actor| {
            lifecycle.create_version(&event_key, code, description, actor)
        })
    }

    pub fn copy_version(
        &mut self,
        source_id: &str,
        new_code: &str,
        new_description: &str,
    ) -> Result<VersionRecord, LifecycleError> {
        self.ensure_known(source_id)?;
        self.mutate(false, |lifecycle, actor| {
            lifecycle.copy_version(source_id, new_code, new_description, actor)
        })
    }

    pub fn update_draft(
        &mut self,
        version_id: &str,
        changes: VersionUpdate,
    ) -> Result<VersionRecord, LifecycleError> {
        self.ensure_known(version_id)?;
        self.mutate(true, |lifecycle, actor| {
            lifecycle.update_draft(version_id, changes, actor)
        })
    }

    pub fn activate(&mut self, version_id: &str) -> Result<StatusOutcome, LifecycleError> {
        self.ensure_known(version_id)?;
        self.mutate(false, |lifecycle, actor| lifecycle.activate(version_id, actor))
    }

    pub fn rollback(&mut self, version_id: &str) -> Result<StatusOutcome, LifecycleError> {
        self.ensure_known(version_id)?;
        self.mutate(false, |lifecycle, actor| lifecycle.rollback(version_id, actor))
    }

    pub fn delete_draft(&mut self, version_id: &str) -> Result<VersionRecord, LifecycleError> {
        self.ensure_known(version_id)?;
        self.mutate(false, |lifecycle, actor| {
            lifecycle.delete_draft(version_id, actor)
        })
    }

    pub fn event_key(&self) -> &str {
        &self.event_key
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn history(&self) -> &[VersionRecord] {
        &self.history
    }

    pub fn current_version(&self) -> Option<&VersionRecord> {
        self.current.as_ref()
    }

    pub fn version_code(&self) -> Option<&str> {
        self.editor.version_code.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.editor.is_read_only
    }

    /// Snapshot handed to dependent editors.
    pub fn editor_context(&self) -> EditorContext {
        self.editor.clone()
    }

    pub fn view_history(&self) {
        for version in &self.history {
            let current = self.current.as_ref().is_some_and(|c| c.id == version.id);
            tracing::info!(
                event_key = %self.event_key,
                version = %version.id,
                code = %version.code,
                status = %version.status,
                created_by = %version.created_by,
                created_at = %version.created_at.to_datetime_utc(),
                current,
                "{}",
                version.description
            );
        }
    }
}
