//! Storage boundary for version records
use super::error::RepositoryError;
use super::utils;
use super::version::{NewVersion, TimeStamp, VersionRecord, VersionStatus, VersionUpdate};
use sled::Transactional;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult, TransactionalTree, abort,
};
use std::sync::Arc;

pub const EVENTS_TREE: &str = "event_versions";
pub const INDEX_TREE: &str = "version_index";

/// Paired status write: `target_id` becomes ACTIVE and whatever is ACTIVE now is
/// archived. Refused when the event's ACTIVE version is not `expected_active` or
/// the target is no longer in `expected_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub event_key: String,
    pub target_id: String,
    pub expected_status: VersionStatus,
    pub expected_active: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOutcome {
    pub activated: VersionRecord,
    pub archived: Option<VersionRecord>,
}

/// Storage for version records.
///
/// The lifecycle plans every transition against a history it read earlier, so
/// implementations re-check inside the write whatever another writer could
/// have changed in between: one draft and unique codes per event on `create`,
/// draft status on `update` and `remove`, and on `set_status` the active
/// pointer, the target's status and, when leaving DRAFT or APPROVED, a
/// complete payload.
pub trait VersionRepository {
    /// Versions of one event in creation order.
    fn list(&self, event_key: &str) -> Result<Vec<VersionRecord>, RepositoryError>;
    fn get(&self, version_id: &str) -> Result<VersionRecord, RepositoryError>;
    fn create(
        &self,
        event_key: &str,
        version: NewVersion,
        actor: &str,
    ) -> Result<VersionRecord, RepositoryError>;
    fn update(
        &self,
        version_id: &str,
        changes: VersionUpdate,
        actor: &str,
    ) -> Result<VersionRecord, RepositoryError>;
    fn set_status(
        &self,
        change: &StatusChange,
        actor: &str,
    ) -> Result<StatusOutcome, RepositoryError>;
    fn remove(&self, version_id: &str) -> Result<(), RepositoryError>;
}

// every version of one event lives under a single key so a reader never sees
// half of an activation
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default)]
struct EventVersions {
    #[n(0)]
    versions: Vec<VersionRecord>,
}

type TxResult<T> = ConflictableTransactionResult<T, RepositoryError>;

pub struct SledVersionRepository {
    events: sled::Tree, // event key -> EventVersions
    index: sled::Tree,  // version id -> event key
}

impl SledVersionRepository {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, RepositoryError> {
        Ok(Self {
            events: instance.open_tree(EVENTS_TREE)?,
            index: instance.open_tree(INDEX_TREE)?,
        })
    }

    fn event_key_of(&self, version_id: &str) -> Result<String, RepositoryError> {
        match self.index.get(version_id.as_bytes())? {
            Some(key) => Ok(String::from_utf8_lossy(&key).into_owned()),
            None => Err(RepositoryError::NotFound(version_id.to_owned())),
        }
    }
}

fn load(tx: &TransactionalTree, event_key: &str) -> TxResult<EventVersions> {
    match tx.get(event_key.as_bytes())? {
        Some(bytes) => minicbor::decode(&bytes)
            .map_err(|e| ConflictableTransactionError::Abort(RepositoryError::from(e))),
        None => Ok(EventVersions::default()),
    }
}

fn store(tx: &TransactionalTree, event_key: &str, stored: &EventVersions) -> TxResult<()> {
    let bytes = minicbor::to_vec(stored).map_err(|e| {
        ConflictableTransactionError::Abort(RepositoryError::from(e))
    })?;
    tx.insert(event_key.as_bytes(), bytes)?;
    Ok(())
}

fn expect_status(
    event_key: &str,
    version: &VersionRecord,
    expected: VersionStatus,
) -> TxResult<()> {
    if version.status != expected {
        return abort(RepositoryError::StatusChanged {
            event_key: event_key.to_owned(),
            version_id: version.id.clone(),
            expected,
            found: version.status,
        });
    }
    Ok(())
}

fn settle<T>(result: TransactionResult<T, RepositoryError>) -> Result<T, RepositoryError> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => RepositoryError::Storage(e),
    })
}

impl VersionRepository for SledVersionRepository {
    fn list(&self, event_key: &str) -> Result<Vec<VersionRecord>, RepositoryError> {
        match self.events.get(event_key.as_bytes())? {
            Some(bytes) => {
                let stored: EventVersions = minicbor::decode(&bytes)?;
                Ok(stored.versions)
            }
            None => Ok(Vec::new()),
        }
    }

    fn get(&self, version_id: &str) -> Result<VersionRecord, RepositoryError> {
        let event_key = self.event_key_of(version_id)?;
        self.list(&event_key)?
            .into_iter()
            .find(|v| v.id == version_id)
            .ok_or_else(|| RepositoryError::NotFound(version_id.to_owned()))
    }

    fn create(
        &self,
        event_key: &str,
        version: NewVersion,
        actor: &str,
    ) -> Result<VersionRecord, RepositoryError> {
        let id = utils::new_version_id().map_err(RepositoryError::IdAllocation)?;
        let now = TimeStamp::new();
        let record = VersionRecord {
            id,
            event_key: event_key.to_owned(),
            code: version.code,
            description: version.description,
            status: VersionStatus::Draft,
            payload: version.payload,
            created_at: now.clone(),
            created_by: actor.to_owned(),
            last_modified_at: now,
            last_modified_by: actor.to_owned(),
        };

        settle((&self.events, &self.index).transaction(|(events, index)| {
            let mut stored = load(events, event_key)?;
            if let Some(draft) = stored.versions.iter().find(|v| v.is_draft()) {
                return abort(RepositoryError::DraftExists {
                    event_key: event_key.to_owned(),
                    draft_code: draft.code.clone(),
                });
            }
            if stored.versions.iter().any(|v| v.code == record.code) {
                return abort(RepositoryError::CodeTaken {
                    event_key: event_key.to_owned(),
                    code: record.code.clone(),
                });
            }
            stored.versions.push(record.clone());
            store(events, event_key, &stored)?;
            index.insert(record.id.as_bytes(), event_key.as_bytes())?;
            Ok(())
        }))?;

        Ok(record)
    }

    fn update(
        &self,
        version_id: &str,
        changes: VersionUpdate,
        actor: &str,
    ) -> Result<VersionRecord, RepositoryError> {
        let event_key = self.event_key_of(version_id)?;

        settle(self.events.transaction(|events| {
            let mut stored = load(events, &event_key)?;
            let Some(record) = stored.versions.iter_mut().find(|v| v.id == version_id) else {
                return abort(RepositoryError::NotFound(version_id.to_owned()));
            };
            expect_status(&event_key, record, VersionStatus::Draft)?;
            changes.apply_to(record);
            record.touch(actor);
            let updated = record.clone();
            store(events, &event_key, &stored)?;
            Ok(updated)
        }))
    }

    fn set_status(
        &self,
        change: &StatusChange,
        actor: &str,
    ) -> Result<StatusOutcome, RepositoryError> {
        let event_key = change.event_key.as_str();

        settle(self.events.transaction(|events| {
            let mut stored = load(events, event_key)?;

            let found = stored
                .versions
                .iter()
                .find(|v| v.status == VersionStatus::Active)
                .map(|v| v.id.clone());
            if found != change.expected_active {
                return abort(RepositoryError::Conflict {
                    event_key: event_key.to_owned(),
                    expected: change.expected_active.clone(),
                    found,
                });
            }

            let Some(target) = stored.versions.iter().find(|v| v.id == change.target_id) else {
                return abort(RepositoryError::NotFound(change.target_id.clone()));
            };
            expect_status(event_key, target, change.expected_status)?;
            if matches!(
                change.expected_status,
                VersionStatus::Draft | VersionStatus::Approved
            ) {
                if let Err(err) = target.payload.validate_for_activation() {
                    return abort(RepositoryError::Incomplete(target.id.clone(), err));
                }
            }

            let mut activated = None;
            let mut archived = None;
            for version in stored.versions.iter_mut() {
                if version.id == change.target_id {
                    version.status = VersionStatus::Active;
                    version.touch(actor);
                    activated = Some(version.clone());
                } else if version.status == VersionStatus::Active {
                    version.status = VersionStatus::Archived;
                    version.touch(actor);
                    archived = Some(version.clone());
                }
            }

            let Some(activated) = activated else {
                return abort(RepositoryError::NotFound(change.target_id.clone()));
            };
            store(events, event_key, &stored)?;
            Ok(StatusOutcome {
                activated,
                archived,
            })
        }))
    }

    fn remove(&self, version_id: &str) -> Result<(), RepositoryError> {
        let event_key = self.event_key_of(version_id)?;

        settle((&self.events, &self.index).transaction(|(events, index)| {
            let mut stored = load(events, &event_key)?;
            let Some(position) = stored.versions.iter().position(|v| v.id == version_id) else {
                return abort(RepositoryError::NotFound(version_id.to_owned()));
            };
            expect_status(&event_key, &stored.versions[position], VersionStatus::Draft)?;
            stored.versions.remove(position);
            store(events, &event_key, &stored)?;
            index.remove(version_id.as_bytes())?;
            Ok(())
        }))
    }
}
