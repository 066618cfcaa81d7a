//! Version control for event configuration.
//!
//! Every event is configured through versions that move DRAFT -> ACTIVE ->
//! ARCHIVED, with rollback bringing an archived version back. At most one
//! version per event is ACTIVE and at most one is a DRAFT. Only the draft can
//! be edited.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod repository;
pub mod selector;
pub mod session;
pub mod utils;
pub mod version;

pub use error::{EditorError, LifecycleError, RepositoryError, ValidationError};
pub use lifecycle::VersionLifecycle;
pub use policy::{EditorContext, is_read_only};
pub use repository::{SledVersionRepository, VersionRepository};
pub use selector::select_current;
pub use session::VersionSession;
pub use version::{VersionPayload, VersionRecord, VersionStatus};
