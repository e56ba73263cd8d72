#[cfg(test)]
mod tests {
    use atlas::classify::{BusinessArea, MeasureType};
    use atlas::model::{
        BusinessRule, Cardinality, CrossFilterDirection, Dataset, Measure, QueryFeedback,
        QueryHistoryEntry, Relationship, Workspace,
    };
    use atlas::store::{now_epoch, CatalogStore, HistoryFilter};

    fn seeded_store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_workspace(&Workspace {
                id: "ws-1".into(),
                name: "Analytics".into(),
                description: None,
                last_synced: None,
            })
            .unwrap();
        for id in ["ds-1", "ds-2"] {
            store
                .upsert_dataset(&Dataset {
                    id: id.into(),
                    workspace_id: "ws-1".into(),
                    name: format!("Dataset {id}"),
                    description: None,
                    business_area: None,
                    last_synced: None,
                })
                .unwrap();
        }
        store
    }

    fn entry(dataset: &str, question: &str, created_at: i64) -> QueryHistoryEntry {
        QueryHistoryEntry {
            id: 0,
            dataset_id: dataset.into(),
            session_id: None,
            user_identifier: None,
            question: question.into(),
            generated_query: None,
            query_type: "analysis".into(),
            execution_time_ms: None,
            row_count: None,
            success: true,
            error_message: None,
            result_summary: None,
            insights: None,
            recommendations: None,
            confidence_score: None,
            measures_used: vec![],
            tables_used: vec![],
            user_rating: None,
            user_feedback: None,
            was_helpful: None,
            led_to_query_id: None,
            created_at,
        }
    }

    fn rule(dataset: Option<&str>, name: &str, measures: &[&str]) -> BusinessRule {
        BusinessRule {
            id: 0,
            dataset_id: dataset.map(str::to_string),
            name: name.into(),
            category: Some("Calculation".into()),
            business_area: None,
            description: "desc".into(),
            rule_logic: None,
            calculation: None,
            applies_to_measures: measures.iter().map(|s| s.to_string()).collect(),
            applies_to_tables: vec![],
            is_active: true,
            version: "1.0".into(),
        }
    }

    #[test]
    fn test_measure_upsert_replaces_by_natural_key() {
        let store = seeded_store();
        let mut m = Measure {
            id: 0,
            dataset_id: "ds-1".into(),
            name: "Total Sales".into(),
            table_name: Some("FactSales".into()),
            expression: Some("SUM('Sales'[Amount])".into()),
            measure_type: MeasureType::Sum,
            business_area: BusinessArea::Sales,
            folder: None,
            description: None,
            is_hidden: false,
        };
        let first = store.upsert_measure(&m).unwrap();
        m.expression = Some("SUMX('Sales', 'Sales'[Amount])".into());
        let second = store.upsert_measure(&m).unwrap();
        assert_eq!(first, second);

        let stored = store.get_measure("ds-1", "Total Sales").unwrap().unwrap();
        assert_eq!(stored.expression.as_deref(), Some("SUMX('Sales', 'Sales'[Amount])"));
    }

    #[test]
    fn test_relationship_upsert_keyed_by_endpoints() {
        let store = seeded_store();
        let mut r = Relationship {
            id: 0,
            dataset_id: "ds-1".into(),
            from_table: "FactSales".into(),
            from_column: "DateKey".into(),
            to_table: "DimDate".into(),
            to_column: "DateKey".into(),
            cardinality: Cardinality::ManyToOne,
            cross_filter: CrossFilterDirection::Single,
            is_active: true,
        };
        let first = store.upsert_relationship(&r).unwrap();
        r.cross_filter = CrossFilterDirection::Both;
        let second = store.upsert_relationship(&r).unwrap();
        assert_eq!(first, second);

        let stored = store.relationships_for_dataset("ds-1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].cross_filter, CrossFilterDirection::Both);
    }

    #[test]
    fn test_active_rules_include_catalog_wide() {
        let store = seeded_store();
        store.insert_rule(&rule(Some("ds-1"), "scoped", &["A"])).unwrap();
        store.insert_rule(&rule(None, "global", &["B"])).unwrap();
        store.insert_rule(&rule(Some("ds-2"), "other", &["C"])).unwrap();
        let mut inactive = rule(Some("ds-1"), "off", &["D"]);
        inactive.is_active = false;
        store.insert_rule(&inactive).unwrap();

        let names: Vec<String> = store
            .active_rules("ds-1")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["global".to_string(), "scoped".to_string()]);
    }

    #[test]
    fn test_history_filters_and_ordering() {
        let store = seeded_store();
        let base = now_epoch() - 1_000;
        store.insert_query(&entry("ds-1", "first", base)).unwrap();
        store.insert_query(&entry("ds-1", "second", base + 10)).unwrap();
        let mut failed = entry("ds-1", "third", base + 20);
        failed.success = false;
        store.insert_query(&failed).unwrap();
        store.insert_query(&entry("ds-2", "elsewhere", base + 30)).unwrap();

        let all = store
            .query_history(&HistoryFilter {
                dataset_id: Some("ds-1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].question, "third");

        let succeeded = store
            .query_history(&HistoryFilter {
                dataset_id: Some("ds-1".into()),
                success_only: true,
                since: Some(base + 5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(succeeded.len(), 1);
        assert_eq!(succeeded[0].question, "second");

        let limited = store
            .query_history(&HistoryFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].question, "third");
    }

    #[test]
    fn test_queries_since_is_oldest_first() {
        let store = seeded_store();
        let base = now_epoch() - 100;
        store.insert_query(&entry("ds-1", "older", base)).unwrap();
        store.insert_query(&entry("ds-1", "newer", base + 1)).unwrap();

        let within = store.queries_since(base, None).unwrap();
        assert_eq!(within[0].question, "older");
        assert_eq!(within[1].question, "newer");
    }

    #[test]
    fn test_popular_candidates_ranked_by_rating_then_recency() {
        let store = seeded_store();
        let base = now_epoch() - 100;
        for (question, rating, at) in [
            ("good old", 4, base),
            ("great", 5, base + 1),
            ("good new", 4, base + 2),
            ("unrated", 0, base + 3),
        ] {
            let id = store.insert_query(&entry("ds-1", question, at)).unwrap();
            if rating > 0 {
                store
                    .update_feedback(
                        id,
                        &QueryFeedback {
                            user_rating: Some(rating),
                            ..Default::default()
                        },
                    )
                    .unwrap();
            }
        }

        let questions: Vec<String> = store
            .popular_candidates("ds-1")
            .unwrap()
            .into_iter()
            .map(|e| e.question)
            .collect();
        assert_eq!(
            questions,
            vec!["great".to_string(), "good new".to_string(), "good old".to_string()]
        );
    }

    #[test]
    fn test_sync_stamps_reflected_in_status() {
        let store = seeded_store();
        store.touch_workspace_sync("ws-1", 1_700_000_000).unwrap();
        store.touch_dataset_sync("ds-1", 1_700_000_100).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.last_workspace_sync, Some(1_700_000_000));
        assert_eq!(status.last_dataset_sync, Some(1_700_000_100));
        assert_eq!(status.datasets, 2);
    }
}
