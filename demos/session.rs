//! Walks one event through draft, activation, a second release and a rollback.
//!
//! Run with `RUST_LOG=debug` to see selection decisions as well.

use anyhow::Context;
use event_version_control::{
    SledVersionRepository, VersionLifecycle, VersionPayload, VersionSession, config::EngineConfig,
    version::VersionUpdate,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = EngineConfig::from_env()?;
    // the demo never leaves anything behind unless a path was given
    if std::env::var_os(event_version_control::config::DB_PATH_ENV_VAR).is_none() {
        config.store.temporary = true;
    }

    let db = config.store.open()?;
    let repository = Arc::new(SledVersionRepository::new(db)?);
    let lifecycle = VersionLifecycle::new(repository, config.lifecycle.clone());
    let mut session = VersionSession::open(lifecycle, "card_payment", "demo")?;

    let payload = VersionPayload::new()
        .set_event_type("transaction")
        .set_event_group("payments")
        .set_event_name("Card payment")
        .set_attribute("channel", "app");

    let v1 = session.create_version("v1", "initial rules")?;
    session.update_draft(&v1.id, VersionUpdate::new().set_payload(payload))?;
    tracing::info!(editor = ?session.editor_context(), "draft ready");
    session.activate(&v1.id).context("activating v1")?;

    let v2 = session.copy_version(&v1.id, "v2", "tighter thresholds")?;
    session.activate(&v2.id).context("activating v2")?;
    tracing::info!(editor = ?session.editor_context(), "v2 live");

    session.rollback(&v1.id).context("rolling back to v1")?;
    tracing::info!(editor = ?session.editor_context(), "rolled back");

    session.view_history();

    Ok(())
}
