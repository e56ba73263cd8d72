//! Metadata synchronization.
//!
//! Pulls schema rows from the model gateway and upserts them into the
//! catalog store. Row-level problems (missing names, invalid identifiers,
//! dangling relationship endpoints) are recorded per row and never abort a
//! sync; a dataset that yields no rows at all is reported as a failed sync.

mod engine;

pub use engine::{SyncEngine, SyncError, SyncOutcome, SyncResult, WorkspaceSyncOutcome};
