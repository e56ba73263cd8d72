#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use atlas::classify::{BusinessArea, MeasureType};
    use atlas::config::Settings;
    use atlas::gateway::{
        DatasetInfo, GatewayError, GatewayResult, ModelGateway, RefreshInfo, SchemaRows,
        WorkspaceInfo,
    };
    use atlas::model::{Dataset, TableType, Workspace};
    use atlas::store::{expression_hash, CatalogStore};
    use atlas::sync::{SyncEngine, SyncError};
    use atlas::CatalogService;

    const WS: &str = "11111111-1111-1111-1111-111111111111";
    const DS: &str = "22222222-2222-2222-2222-222222222222";

    /// Scripted gateway: serves canned rows, no network.
    struct MockGateway {
        workspace: Option<WorkspaceInfo>,
        datasets: Vec<DatasetInfo>,
        schema: GatewayResult<SchemaRows>,
    }

    impl MockGateway {
        fn with_schema(schema: SchemaRows) -> Self {
            Self {
                workspace: Some(WorkspaceInfo {
                    id: WS.into(),
                    name: "Analytics".into(),
                    description: None,
                }),
                datasets: vec![DatasetInfo {
                    id: DS.into(),
                    name: "Sales Model".into(),
                    configured_by: None,
                }],
                schema: Ok(schema),
            }
        }
    }

    #[async_trait]
    impl ModelGateway for MockGateway {
        async fn get_workspace(&self, _id: &str) -> GatewayResult<Option<WorkspaceInfo>> {
            Ok(self.workspace.clone())
        }

        async fn list_workspace_datasets(&self, _id: &str) -> GatewayResult<Vec<DatasetInfo>> {
            Ok(self.datasets.clone())
        }

        async fn dataset_refresh_history(&self, _id: &str) -> GatewayResult<Option<RefreshInfo>> {
            Ok(None)
        }

        async fn discover_schema(
            &self,
            _dataset_id: &str,
            _workspace_id: &str,
        ) -> GatewayResult<SchemaRows> {
            match &self.schema {
                Ok(rows) => Ok(rows.clone()),
                Err(GatewayError::Unconfigured) => Err(GatewayError::Unconfigured),
                Err(_) => Err(GatewayError::Status {
                    status: 500,
                    operation: "discover",
                }),
            }
        }
    }

    fn sample_schema() -> SchemaRows {
        SchemaRows {
            tables: vec![
                json!({
                    "TableName": "FactSales",
                    "IsHidden": false,
                    "Columns": [
                        { "ColumnName": "Amount", "DataType": "Decimal" },
                        { "ColumnName": "DateKey", "DataType": "Int64" }
                    ]
                }),
                json!({ "[TableName]": "DimDate", "[IsHidden]": false }),
                json!({ "TableName": "Bad/Name" }),
                json!({ "Description": "row without a name" }),
            ],
            measures: vec![
                json!({
                    "MeasureName": "Total Sales",
                    "TableName": "FactSales",
                    "Expression": "SUM('FactSales'[Amount])"
                }),
                json!({
                    "MeasureName": "Sales YTD",
                    "Expression": "CALCULATE([Total Sales], DATESYTD('DimDate'[Date]))"
                }),
                json!({ "Expression": "SUM('FactSales'[Amount])" }),
            ],
            relationships: vec![
                json!({
                    "FromTable": "FactSales",
                    "FromColumn": "DateKey",
                    "ToTable": "DimDate",
                    "ToColumn": "DateKey"
                }),
                json!({
                    "FromTable": "FactSales",
                    "FromColumn": "X",
                    "ToTable": "Missing",
                    "ToColumn": "Y"
                }),
            ],
        }
    }

    fn store_with_workspace() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_workspace(&Workspace {
                id: WS.into(),
                name: "Analytics".into(),
                description: None,
                last_synced: None,
            })
            .unwrap();
        store
    }

    fn dataset() -> Dataset {
        Dataset {
            id: DS.into(),
            workspace_id: WS.into(),
            name: "Sales Model".into(),
            description: None,
            business_area: None,
            last_synced: None,
        }
    }

    #[tokio::test]
    async fn test_dataset_sync_upserts_and_records_row_failures() {
        let gateway = MockGateway::with_schema(sample_schema());
        let store = store_with_workspace();
        let engine = SyncEngine::new(&gateway, &store);

        let outcome = engine.sync_dataset(&dataset()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.tables_upserted, 2);
        assert_eq!(outcome.columns_upserted, 2);
        assert_eq!(outcome.measures_upserted, 2);
        assert_eq!(outcome.relationships_upserted, 1);
        // Invalid table name, nameless table row, nameless measure row, and
        // the relationship pointing at an unknown table.
        assert_eq!(outcome.row_failures.len(), 4);

        let tables = store.tables_for_dataset(DS).unwrap();
        let fact = tables.iter().find(|t| t.name == "FactSales").unwrap();
        assert_eq!(fact.table_type, TableType::Fact);
        assert_eq!(store.columns_for_table(fact.id).unwrap().len(), 2);

        let ytd = store.get_measure(DS, "Sales YTD").unwrap().unwrap();
        assert_eq!(ytd.measure_type, MeasureType::TimeIntelligence);
        assert_eq!(ytd.business_area, BusinessArea::Sales);

        // Dependencies were extracted and cached under the expression hash.
        let hash = expression_hash("CALCULATE([Total Sales], DATESYTD('DimDate'[Date]))");
        let deps = store.get_measure_deps(DS, "Sales YTD", &hash).unwrap().unwrap();
        assert!(deps.measures.contains("Total Sales"));
        assert!(deps.columns.contains("DimDate.Date"));
    }

    #[tokio::test]
    async fn test_dataset_sync_is_idempotent() {
        let gateway = MockGateway::with_schema(sample_schema());
        let store = store_with_workspace();
        let engine = SyncEngine::new(&gateway, &store);

        engine.sync_dataset(&dataset()).await.unwrap();
        let second = engine.sync_dataset(&dataset()).await.unwrap();
        assert!(second.success);
        assert_eq!(store.tables_for_dataset(DS).unwrap().len(), 2);
        assert_eq!(store.measures_for_dataset(DS).unwrap().len(), 2);
        assert_eq!(store.relationships_for_dataset(DS).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_schema_is_a_failed_sync() {
        let gateway = MockGateway::with_schema(SchemaRows::default());
        let store = store_with_workspace();
        let engine = SyncEngine::new(&gateway, &store);

        let outcome = engine.sync_dataset(&dataset()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no metadata discovered"));
    }

    #[tokio::test]
    async fn test_discovery_failure_degrades_into_outcome() {
        let mut gateway = MockGateway::with_schema(SchemaRows::default());
        gateway.schema = Err(GatewayError::Status {
            status: 500,
            operation: "discover",
        });
        let store = store_with_workspace();
        let engine = SyncEngine::new(&gateway, &store);

        let outcome = engine.sync_dataset(&dataset()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_auth_propagates() {
        let mut gateway = MockGateway::with_schema(SchemaRows::default());
        gateway.schema = Err(GatewayError::Unconfigured);
        let store = store_with_workspace();
        let engine = SyncEngine::new(&gateway, &store);

        let err = engine.sync_dataset(&dataset()).await.unwrap_err();
        assert!(matches!(err, SyncError::Gateway(e) if e.is_unauthenticated()));
    }

    #[tokio::test]
    async fn test_empty_workspace_syncs_successfully() {
        let mut gateway = MockGateway::with_schema(SchemaRows::default());
        gateway.datasets = Vec::new();
        let store = CatalogStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&gateway, &store);

        let outcome = engine.sync_workspace(WS).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.datasets.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_workspace_is_an_error() {
        let mut gateway = MockGateway::with_schema(SchemaRows::default());
        gateway.workspace = None;
        let store = CatalogStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&gateway, &store);

        let err = engine.sync_workspace(WS).await.unwrap_err();
        assert!(matches!(err, SyncError::WorkspaceNotFound(_)));
    }

    #[tokio::test]
    async fn test_service_stamps_sync_times() {
        let gateway = MockGateway::with_schema(sample_schema());
        let store = CatalogStore::open_in_memory().unwrap();
        let service = CatalogService::new(gateway, store, Settings::default());

        let outcome = service.sync_workspace(WS).await.unwrap();
        assert!(outcome.success);

        let status = service.status().unwrap();
        assert!(status.last_workspace_sync.is_some());
        assert!(status.last_dataset_sync.is_some());
        assert_eq!(status.tables, 2);
    }

    #[tokio::test]
    async fn test_service_rejects_malformed_ids() {
        let gateway = MockGateway::with_schema(SchemaRows::default());
        let store = CatalogStore::open_in_memory().unwrap();
        let service = CatalogService::new(gateway, store, Settings::default());

        let err = service.sync_workspace("not-a-guid").await.unwrap_err();
        assert!(matches!(err, atlas::ServiceError::Validation(_)));
    }
}
