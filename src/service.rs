//! Service facade.
//!
//! One entry point over the catalog: sync, context assembly, and the query
//! journal. The facade validates inbound identifiers, maps component errors
//! onto a single error surface, and stamps sync timestamps after successful
//! syncs; the sync engine itself never touches timestamps.

use crate::config::Settings;
use crate::context::{
    assemble_query_context, dataset_context, measure_context, ContextBundle, DatasetContext,
    MeasureContext,
};
use crate::gateway::{GatewayError, ModelGateway, RefreshInfo, RestGateway};
use crate::journal::{self, JournalError, PopularQuestion, QueryAnalytics};
use crate::model::{Dataset, NewQueryEntry, QueryFeedback, QueryHistoryEntry};
use crate::store::{now_epoch, CatalogStore, HistoryFilter, StoreError, StoreStatus};
use crate::sync::{SyncEngine, SyncError, SyncOutcome, WorkspaceSyncOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Platform authentication is not configured or was rejected")]
    Unauthenticated,

    #[error("Upstream platform unavailable: {0}")]
    Upstream(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<GatewayError> for ServiceError {
    fn from(e: GatewayError) -> Self {
        if e.is_unauthenticated() {
            Self::Unauthenticated
        } else {
            Self::Upstream(e.to_string())
        }
    }
}

impl From<SyncError> for ServiceError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => Self::Store(e),
            SyncError::Gateway(e) => e.into(),
            SyncError::WorkspaceNotFound(id) => Self::NotFound(format!("workspace {id}")),
        }
    }
}

impl From<JournalError> for ServiceError {
    fn from(e: JournalError) -> Self {
        match e {
            JournalError::Store(e) => Self::Store(e),
            JournalError::InvalidRating(_) => Self::Validation(e.to_string()),
        }
    }
}

/// The catalog service: one instance per store, generic over the gateway so
/// tests can drive it without a network.
pub struct CatalogService<G> {
    gateway: G,
    store: CatalogStore,
    settings: Settings,
}

impl CatalogService<RestGateway> {
    /// Build a service wired to the real platform from loaded settings.
    pub fn connect(settings: Settings) -> ServiceResult<Self> {
        let path = match settings.store.resolved_path().map_err(validation)? {
            Some(p) => p,
            None => CatalogStore::default_path()?,
        };
        let store = CatalogStore::open(path)?;
        let gateway = RestGateway::new(settings.gateway.clone())?;
        Ok(Self::new(gateway, store, settings))
    }
}

impl<G: ModelGateway> CatalogService<G> {
    pub fn new(gateway: G, store: CatalogStore, settings: Settings) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    // ===== Sync =====

    /// Sync every dataset of a workspace and stamp sync times on success.
    pub async fn sync_workspace(
        &self,
        workspace_id: &str,
    ) -> ServiceResult<WorkspaceSyncOutcome> {
        require_guid(workspace_id, "workspace id")?;

        let engine = SyncEngine::new(&self.gateway, &self.store);
        let outcome = engine.sync_workspace(workspace_id).await?;

        let now = now_epoch();
        for ds in outcome.datasets.iter().filter(|d| d.success) {
            self.store.touch_dataset_sync(&ds.dataset_id, now)?;
        }
        if outcome.success {
            self.store.touch_workspace_sync(workspace_id, now)?;
        }
        Ok(outcome)
    }

    /// Sync one dataset. The dataset must already be in the catalog or be
    /// listed by its workspace.
    pub async fn sync_dataset(
        &self,
        workspace_id: &str,
        dataset_id: &str,
    ) -> ServiceResult<SyncOutcome> {
        require_guid(workspace_id, "workspace id")?;
        require_guid(dataset_id, "dataset id")?;

        let dataset = match self.store.get_dataset(dataset_id)? {
            Some(d) => d,
            None => {
                let listed = self
                    .gateway
                    .list_workspace_datasets(workspace_id)
                    .await?
                    .into_iter()
                    .find(|d| d.id == dataset_id)
                    .ok_or_else(|| ServiceError::NotFound(format!("dataset {dataset_id}")))?;
                Dataset {
                    id: listed.id,
                    workspace_id: workspace_id.to_string(),
                    name: listed.name,
                    description: None,
                    business_area: None,
                    last_synced: None,
                }
            }
        };

        let engine = SyncEngine::new(&self.gateway, &self.store);
        let outcome = engine.sync_dataset(&dataset).await?;
        if outcome.success {
            self.store.touch_dataset_sync(dataset_id, now_epoch())?;
        }
        Ok(outcome)
    }

    /// Most recent refresh of a dataset, straight from the platform.
    pub async fn dataset_refresh(
        &self,
        dataset_id: &str,
    ) -> ServiceResult<Option<RefreshInfo>> {
        require_guid(dataset_id, "dataset id")?;
        Ok(self.gateway.dataset_refresh_history(dataset_id).await?)
    }

    // ===== Context =====

    /// Question-scoped context bundle for a dataset.
    pub fn generate_context(
        &self,
        dataset_id: &str,
        question: &str,
        query_type: Option<&str>,
    ) -> ServiceResult<ContextBundle> {
        if question.trim().is_empty() {
            return Err(ServiceError::Validation("question must not be empty".into()));
        }
        self.require_dataset(dataset_id)?;
        Ok(assemble_query_context(
            &self.store,
            &self.settings.context,
            dataset_id,
            question,
            query_type.unwrap_or("analysis"),
        )?)
    }

    /// Whole-dataset overview.
    pub fn dataset_context(&self, dataset_id: &str) -> ServiceResult<DatasetContext> {
        dataset_context(&self.store, dataset_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("dataset {dataset_id}")))
    }

    /// Single-measure deep dive.
    pub fn measure_context(
        &self,
        dataset_id: &str,
        measure_name: &str,
    ) -> ServiceResult<MeasureContext> {
        self.require_dataset(dataset_id)?;
        measure_context(&self.store, dataset_id, measure_name)?.ok_or_else(|| {
            ServiceError::NotFound(format!("measure {measure_name} in dataset {dataset_id}"))
        })
    }

    // ===== Journal =====

    /// Record a query attempt against a known dataset.
    pub fn record_query(&self, new: NewQueryEntry) -> ServiceResult<i64> {
        if new.question.trim().is_empty() {
            return Err(ServiceError::Validation("question must not be empty".into()));
        }
        self.require_dataset(&new.dataset_id)?;
        Ok(journal::record(&self.store, new)?)
    }

    /// Attach feedback to a recorded query.
    pub fn update_feedback(&self, query_id: i64, feedback: &QueryFeedback) -> ServiceResult<()> {
        if journal::update_feedback(&self.store, query_id, feedback)? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("query {query_id}")))
        }
    }

    /// Filtered history, most recent first.
    pub fn query_history(&self, filter: &HistoryFilter) -> ServiceResult<Vec<QueryHistoryEntry>> {
        Ok(journal::list_history(&self.store, filter)?)
    }

    /// Usage analytics over a trailing window; the configured default window
    /// applies when none is given.
    pub fn compute_analytics(
        &self,
        dataset_id: Option<&str>,
        window_days: Option<u32>,
    ) -> ServiceResult<QueryAnalytics> {
        let window = window_days.unwrap_or(self.settings.journal.default_window_days);
        if window == 0 {
            return Err(ServiceError::Validation(
                "analytics window must be at least one day".into(),
            ));
        }
        Ok(journal::compute_analytics(&self.store, dataset_id, window)?)
    }

    /// Well-rated, deduplicated prior questions for a dataset.
    pub fn popular_questions(&self, dataset_id: &str) -> ServiceResult<Vec<PopularQuestion>> {
        self.require_dataset(dataset_id)?;
        Ok(journal::popular_questions(&self.store, dataset_id)?)
    }

    // ===== Status =====

    /// Catalog-wide entity counts and latest sync stamps.
    pub fn status(&self) -> ServiceResult<StoreStatus> {
        Ok(self.store.status()?)
    }

    fn require_dataset(&self, dataset_id: &str) -> ServiceResult<()> {
        if self.store.get_dataset(dataset_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("dataset {dataset_id}")));
        }
        Ok(())
    }
}

fn require_guid(value: &str, what: &str) -> ServiceResult<()> {
    if crate::expr::is_guid(value) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("{what} must be a GUID")))
    }
}

fn validation(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(e.to_string())
}
