//! Chooses the version an editor session opens on
use super::version::{VersionRecord, VersionStatus};

/// Picks the version to load for an event.
///
/// Priority: the ACTIVE version, then the DRAFT, then the most recently created
/// APPROVED one, and finally the first record of `history`. Inside a status the
/// newest `(created_at, id)` wins, so the result does not depend on list order
/// except for the last fallback. `None` only for an empty history.
pub fn select_current(history: &[VersionRecord]) -> Option<&VersionRecord> {
    let selected = newest_with(history, VersionStatus::Active)
        .or_else(|| newest_with(history, VersionStatus::Draft))
        .or_else(|| newest_with(history, VersionStatus::Approved))
        .or_else(|| history.first());

    if let Some(version) = selected {
        tracing::debug!(
            event_key = %version.event_key,
            version = %version.id,
            status = %version.status,
            "selected current version"
        );
    }
    selected
}

fn newest_with(history: &[VersionRecord], status: VersionStatus) -> Option<&VersionRecord> {
    history
        .iter()
        .filter(|v| v.status == status)
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}
