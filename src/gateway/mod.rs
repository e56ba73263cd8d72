//! External model gateway.
//!
//! Abstracts calls to the external BI platform: token acquisition with
//! caching and expiry, workspace and dataset listing, and schema discovery
//! via query-based introspection. Failures are reported through
//! [`GatewayError`] and logged at the boundary; nothing here retries.

mod error;
mod rest;
mod types;

pub use error::{GatewayError, GatewayResult};
pub use rest::RestGateway;
pub use types::{DatasetInfo, RefreshInfo, SchemaRows, WorkspaceInfo};

use async_trait::async_trait;

/// Trait for fetching model metadata from the external platform.
///
/// The sync engine depends on this boundary rather than on a concrete HTTP
/// client, so tests drive it with a scripted implementation.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Fetch a workspace by id. `Ok(None)` when the platform has no such
    /// workspace.
    async fn get_workspace(&self, workspace_id: &str) -> GatewayResult<Option<WorkspaceInfo>>;

    /// List the datasets of a workspace.
    async fn list_workspace_datasets(&self, workspace_id: &str)
        -> GatewayResult<Vec<DatasetInfo>>;

    /// Most recent refresh of a dataset, when any has completed.
    async fn dataset_refresh_history(&self, dataset_id: &str)
        -> GatewayResult<Option<RefreshInfo>>;

    /// Discover a dataset's schema by issuing two read-only introspection
    /// queries (tables, measures) against its query-execution endpoint.
    /// Returns raw row sets; mapping rows into catalog records is the
    /// caller's responsibility.
    async fn discover_schema(
        &self,
        dataset_id: &str,
        workspace_id: &str,
    ) -> GatewayResult<SchemaRows>;
}
