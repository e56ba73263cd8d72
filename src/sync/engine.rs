use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use crate::classify::{classify_measure, BusinessArea, MeasureType};
use crate::expr::{extract_dependencies, is_valid_table_name};
use crate::gateway::{GatewayError, ModelGateway, SchemaRows};
use crate::model::{
    Cardinality, Column, CrossFilterDirection, Dataset, Measure, Relationship, Table, TableType,
    Workspace,
};
use crate::store::{expression_hash, CatalogStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Workspace {0} not found")]
    WorkspaceNotFound(String),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Result of syncing one dataset. `row_failures` lists rows that were
/// skipped; they never fail the sync as a whole.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncOutcome {
    pub dataset_id: String,
    pub success: bool,
    pub tables_upserted: usize,
    pub columns_upserted: usize,
    pub measures_upserted: usize,
    pub relationships_upserted: usize,
    pub row_failures: Vec<String>,
    pub error: Option<String>,
}

/// Result of syncing a whole workspace.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkspaceSyncOutcome {
    pub workspace_id: String,
    pub success: bool,
    pub datasets: Vec<SyncOutcome>,
    pub error: Option<String>,
}

/// Drives discovery through the gateway and persists the results.
pub struct SyncEngine<'a, G: ModelGateway> {
    gateway: &'a G,
    store: &'a CatalogStore,
}

impl<'a, G: ModelGateway> SyncEngine<'a, G> {
    pub fn new(gateway: &'a G, store: &'a CatalogStore) -> Self {
        Self { gateway, store }
    }

    /// Sync every dataset of a workspace. A workspace with no datasets syncs
    /// successfully; otherwise at least one dataset must sync for the
    /// workspace sync to count as a success.
    pub async fn sync_workspace(&self, workspace_id: &str) -> SyncResult<WorkspaceSyncOutcome> {
        let mut outcome = WorkspaceSyncOutcome {
            workspace_id: workspace_id.to_string(),
            ..Default::default()
        };

        let info = match self.gateway.get_workspace(workspace_id).await? {
            Some(info) => info,
            None => return Err(SyncError::WorkspaceNotFound(workspace_id.to_string())),
        };
        self.store.upsert_workspace(&Workspace {
            id: info.id.clone(),
            name: info.name,
            description: info.description,
            last_synced: None,
        })?;

        let datasets = self.gateway.list_workspace_datasets(workspace_id).await?;
        for ds in &datasets {
            let dataset = Dataset {
                id: ds.id.clone(),
                workspace_id: workspace_id.to_string(),
                name: ds.name.clone(),
                description: None,
                business_area: None,
                last_synced: None,
            };
            outcome.datasets.push(self.sync_dataset(&dataset).await?);
        }

        outcome.success =
            outcome.datasets.is_empty() || outcome.datasets.iter().any(|d| d.success);
        info!(
            workspace_id,
            datasets = outcome.datasets.len(),
            success = outcome.success,
            "workspace sync finished"
        );
        Ok(outcome)
    }

    /// Discover and persist one dataset's schema.
    ///
    /// Discovery failures other than missing authentication degrade into the
    /// outcome so a workspace sync can carry on with its other datasets.
    pub async fn sync_dataset(&self, dataset: &Dataset) -> SyncResult<SyncOutcome> {
        let mut outcome = SyncOutcome {
            dataset_id: dataset.id.clone(),
            ..Default::default()
        };

        self.store.upsert_dataset(dataset)?;

        let rows = match self
            .gateway
            .discover_schema(&dataset.id, &dataset.workspace_id)
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_unauthenticated() => return Err(e.into()),
            Err(e) => {
                warn!(dataset_id = %dataset.id, error = %e, "schema discovery failed");
                outcome.error = Some(e.to_string());
                return Ok(outcome);
            }
        };

        if rows.is_empty() {
            outcome.error = Some("no metadata discovered".to_string());
            return Ok(outcome);
        }

        let table_names = self.apply_tables(&dataset.id, &rows, &mut outcome)?;
        self.apply_measures(&dataset.id, &rows, &mut outcome)?;
        self.apply_relationships(&dataset.id, &rows, &table_names, &mut outcome)?;

        outcome.success = true;
        info!(
            dataset_id = %dataset.id,
            tables = outcome.tables_upserted,
            measures = outcome.measures_upserted,
            failures = outcome.row_failures.len(),
            "dataset sync finished"
        );
        Ok(outcome)
    }

    fn apply_tables(
        &self,
        dataset_id: &str,
        rows: &SchemaRows,
        outcome: &mut SyncOutcome,
    ) -> SyncResult<HashSet<String>> {
        let mut names = HashSet::new();
        for row in &rows.tables {
            let name = match str_field(row, "TableName") {
                Some(n) if !n.is_empty() => n,
                _ => {
                    outcome.row_failures.push("table row without a name".into());
                    continue;
                }
            };
            if !is_valid_table_name(&name) {
                outcome
                    .row_failures
                    .push(format!("invalid table name: {name}"));
                continue;
            }

            let table_type = str_field(row, "TableType")
                .map(|t| TableType::parse(&t))
                .unwrap_or_else(|| TableType::from_name(&name));
            let table_id = self.store.upsert_table(&Table {
                id: 0,
                dataset_id: dataset_id.to_string(),
                name: name.clone(),
                table_type,
                description: str_field(row, "Description"),
                is_hidden: bool_field(row, "IsHidden"),
            })?;
            outcome.tables_upserted += 1;
            names.insert(name.clone());

            // Some sources embed column rows inside the table row.
            if let Some(cols) = field(row, "Columns").and_then(Value::as_array) {
                for col in cols {
                    let col_name = match str_field(col, "ColumnName").or_else(|| str_field(col, "Name"))
                    {
                        Some(n) if !n.is_empty() => n,
                        _ => {
                            outcome
                                .row_failures
                                .push(format!("column row without a name in table {name}"));
                            continue;
                        }
                    };
                    self.store.upsert_column(&Column {
                        id: 0,
                        table_id,
                        name: col_name,
                        data_type: str_field(col, "DataType"),
                        is_hidden: bool_field(col, "IsHidden"),
                    })?;
                    outcome.columns_upserted += 1;
                }
            }
        }
        Ok(names)
    }

    fn apply_measures(
        &self,
        dataset_id: &str,
        rows: &SchemaRows,
        outcome: &mut SyncOutcome,
    ) -> SyncResult<()> {
        for row in &rows.measures {
            let name = match str_field(row, "MeasureName") {
                Some(n) if !n.is_empty() => n,
                _ => {
                    outcome
                        .row_failures
                        .push("measure row without a name".into());
                    continue;
                }
            };
            let expression = str_field(row, "Expression");

            // Discovered labels win over name-based classification.
            let inferred = classify_measure(&name);
            let measure_type = str_field(row, "MeasureType")
                .map(|t| MeasureType::parse(&t))
                .unwrap_or(inferred.measure_type);
            let business_area = str_field(row, "BusinessArea")
                .map(|a| BusinessArea::parse(&a))
                .unwrap_or(inferred.business_area);

            self.store.upsert_measure(&Measure {
                id: 0,
                dataset_id: dataset_id.to_string(),
                name: name.clone(),
                table_name: str_field(row, "TableName"),
                expression: expression.clone(),
                measure_type,
                business_area,
                folder: str_field(row, "DisplayFolder"),
                description: str_field(row, "Description"),
                is_hidden: bool_field(row, "IsHidden"),
            })?;
            outcome.measures_upserted += 1;

            if let Some(expr) = expression.filter(|e| !e.trim().is_empty()) {
                let deps = extract_dependencies(&expr);
                self.store
                    .put_measure_deps(dataset_id, &name, &expression_hash(&expr), &deps)?;
            }
        }
        Ok(())
    }

    fn apply_relationships(
        &self,
        dataset_id: &str,
        rows: &SchemaRows,
        table_names: &HashSet<String>,
        outcome: &mut SyncOutcome,
    ) -> SyncResult<()> {
        for row in &rows.relationships {
            let endpoints = (
                str_field(row, "FromTable"),
                str_field(row, "FromColumn"),
                str_field(row, "ToTable"),
                str_field(row, "ToColumn"),
            );
            let (from_table, from_column, to_table, to_column) = match endpoints {
                (Some(ft), Some(fc), Some(tt), Some(tc)) => (ft, fc, tt, tc),
                _ => {
                    outcome
                        .row_failures
                        .push("relationship row with missing endpoints".into());
                    continue;
                }
            };
            if !table_names.contains(&from_table) || !table_names.contains(&to_table) {
                outcome.row_failures.push(format!(
                    "relationship references unknown table: {from_table} -> {to_table}"
                ));
                continue;
            }

            let cardinality = str_field(row, "Cardinality")
                .map(|c| Cardinality::parse(&c))
                .unwrap_or(Cardinality::ManyToOne);
            let cross_filter = str_field(row, "CrossFilterDirection")
                .map(|c| CrossFilterDirection::parse(&c))
                .unwrap_or(CrossFilterDirection::Single);

            self.store.upsert_relationship(&Relationship {
                id: 0,
                dataset_id: dataset_id.to_string(),
                from_table,
                from_column,
                to_table,
                to_column,
                cardinality,
                cross_filter,
                is_active: field(row, "IsActive")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            })?;
            outcome.relationships_upserted += 1;
        }
        Ok(())
    }
}

/// Look up a field by its plain name, falling back to the bracketed form
/// some query endpoints emit.
fn field<'v>(row: &'v Value, name: &str) -> Option<&'v Value> {
    let obj = row.as_object()?;
    obj.get(name)
        .or_else(|| obj.get(&format!("[{name}]")))
        .filter(|v| !v.is_null())
}

fn str_field(row: &Value, name: &str) -> Option<String> {
    field(row, name)?.as_str().map(str::to_string)
}

fn bool_field(row: &Value, name: &str) -> bool {
    field(row, name).and_then(Value::as_bool).unwrap_or(false)
}
