//! HTTPS implementation of the model gateway.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{GatewayError, GatewayResult};
use super::types::{
    DatasetInfo, ListResponse, QueryResponse, RefreshInfo, RefreshRecord, SchemaRows,
    TokenResponse, WorkspaceInfo,
};
use super::ModelGateway;
use crate::config::GatewaySettings;

/// Tokens are treated as expired this long before their reported lifetime
/// ends, so a token never dies mid-request.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Introspection query for tables.
const DISCOVER_TABLES_QUERY: &str = r#"
EVALUATE
    SELECTCOLUMNS(
        INFO.TABLES(),
        "TableName", [Name],
        "IsHidden", [IsHidden],
        "Description", [Description]
    )
"#;

/// Introspection query for measures.
const DISCOVER_MEASURES_QUERY: &str = r#"
EVALUATE
    SELECTCOLUMNS(
        INFO.MEASURES(),
        "MeasureName", [Name],
        "TableName", [TableName],
        "Expression", [Expression],
        "DisplayFolder", [DisplayFolder],
        "IsHidden", [IsHidden],
        "Description", [Description]
    )
"#;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// The only mutable shared state in the gateway.
///
/// Reads of an already-fresh token take the read lock only; the refresh
/// mutex serializes check-then-refresh so concurrent syncs never issue
/// duplicate token requests.
#[derive(Default)]
struct TokenCache {
    current: RwLock<Option<CachedToken>>,
    refresh: tokio::sync::Mutex<()>,
}

impl TokenCache {
    fn fresh(&self) -> Option<String> {
        let guard = self.current.read().ok()?;
        guard
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }

    fn store(&self, value: String, lifetime: Duration) {
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_SKEW);
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(CachedToken { value, expires_at });
        }
    }
}

/// Gateway speaking the platform's REST API with client-credential auth.
pub struct RestGateway {
    settings: GatewaySettings,
    http: reqwest::Client,
    token: TokenCache,
}

impl RestGateway {
    pub fn new(settings: GatewaySettings) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            settings,
            http,
            token: TokenCache::default(),
        })
    }

    /// Return the cached token, refreshing it through the guard when it is
    /// unissued or expired. Provider errors propagate to the caller and are
    /// not retried here.
    async fn token(&self) -> GatewayResult<String> {
        if !self.settings.is_configured() {
            return Err(GatewayError::Unconfigured);
        }
        if let Some(token) = self.token.fresh() {
            return Ok(token);
        }

        let _refresh = self.token.refresh.lock().await;
        // A concurrent caller may have refreshed while we waited.
        if let Some(token) = self.token.fresh() {
            return Ok(token);
        }

        let url = self
            .settings
            .token_url()
            .map_err(|e| GatewayError::Token(e.to_string()))?;
        let client_id = self
            .settings
            .resolved_client_id()
            .map_err(|e| GatewayError::Token(e.to_string()))?;
        let client_secret = self
            .settings
            .resolved_client_secret()
            .map_err(|e| GatewayError::Token(e.to_string()))?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", self.settings.scope.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "token endpoint rejected the credential grant");
            return Err(GatewayError::Token(format!(
                "identity provider returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Token(e.to_string()))?;
        debug!(expires_in = token.expires_in, "acquired platform token");
        self.token.store(
            token.access_token.clone(),
            Duration::from_secs(token.expires_in),
        );
        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &'static str,
    ) -> GatewayResult<T> {
        let token = self.token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, operation, "platform call failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                operation,
            });
        }
        Ok(response.json().await?)
    }

    /// Execute one read-only introspection query and return its row set.
    async fn execute_rows(
        &self,
        dataset_id: &str,
        workspace_id: &str,
        query: &str,
        operation: &'static str,
    ) -> GatewayResult<Vec<serde_json::Value>> {
        let token = self.token().await?;
        let url = format!(
            "{}/groups/{workspace_id}/datasets/{dataset_id}/executeQueries",
            self.settings.base_url
        );
        let payload = serde_json::json!({
            "queries": [{ "query": query }],
            "serializerSettings": { "includeNulls": true },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, operation, dataset_id, "introspection query failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                operation,
            });
        }

        let parsed: QueryResponse = response.json().await?;
        let rows = parsed
            .results
            .into_iter()
            .next()
            .and_then(|r| r.tables.into_iter().next())
            .map(|t| t.rows)
            .unwrap_or_default();
        Ok(rows)
    }
}

#[async_trait]
impl ModelGateway for RestGateway {
    async fn get_workspace(&self, workspace_id: &str) -> GatewayResult<Option<WorkspaceInfo>> {
        let token = self.token().await?;
        let url = format!("{}/groups/{workspace_id}", self.settings.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(%status, workspace_id, "workspace lookup failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                operation: "get_workspace",
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn list_workspace_datasets(
        &self,
        workspace_id: &str,
    ) -> GatewayResult<Vec<DatasetInfo>> {
        let url = format!("{}/groups/{workspace_id}/datasets", self.settings.base_url);
        let list: ListResponse<DatasetInfo> = self.get_json(&url, "list_datasets").await?;
        Ok(list.value)
    }

    async fn dataset_refresh_history(
        &self,
        dataset_id: &str,
    ) -> GatewayResult<Option<RefreshInfo>> {
        let url = format!(
            "{}/datasets/{dataset_id}/refreshes?$top=1",
            self.settings.base_url
        );
        let list: ListResponse<RefreshRecord> = self.get_json(&url, "refresh_history").await?;
        Ok(list.value.into_iter().next().map(|r| RefreshInfo {
            end_time: r.end_time,
            status: r.status,
        }))
    }

    async fn discover_schema(
        &self,
        dataset_id: &str,
        workspace_id: &str,
    ) -> GatewayResult<SchemaRows> {
        let tables = self
            .execute_rows(dataset_id, workspace_id, DISCOVER_TABLES_QUERY, "tables")
            .await?;
        let measures = self
            .execute_rows(
                dataset_id,
                workspace_id,
                DISCOVER_MEASURES_QUERY,
                "measures",
            )
            .await?;
        Ok(SchemaRows {
            tables,
            measures,
            relationships: Vec::new(),
        })
    }
}
