#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use atlas::config::Settings;
    use atlas::gateway::{
        DatasetInfo, GatewayResult, ModelGateway, RefreshInfo, SchemaRows, WorkspaceInfo,
    };
    use atlas::model::{Dataset, NewQueryEntry, QueryFeedback, Workspace};
    use atlas::store::{CatalogStore, HistoryFilter};
    use atlas::{CatalogService, ServiceError};

    /// Journal operations never reach the platform; this gateway proves it.
    struct OfflineGateway;

    #[async_trait]
    impl ModelGateway for OfflineGateway {
        async fn get_workspace(&self, _id: &str) -> GatewayResult<Option<WorkspaceInfo>> {
            unreachable!("journal operations must not call the gateway")
        }

        async fn list_workspace_datasets(&self, _id: &str) -> GatewayResult<Vec<DatasetInfo>> {
            unreachable!("journal operations must not call the gateway")
        }

        async fn dataset_refresh_history(&self, _id: &str) -> GatewayResult<Option<RefreshInfo>> {
            unreachable!("journal operations must not call the gateway")
        }

        async fn discover_schema(
            &self,
            _dataset_id: &str,
            _workspace_id: &str,
        ) -> GatewayResult<SchemaRows> {
            unreachable!("journal operations must not call the gateway")
        }
    }

    fn service() -> CatalogService<OfflineGateway> {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_workspace(&Workspace {
                id: "ws".into(),
                name: "Analytics".into(),
                description: None,
                last_synced: None,
            })
            .unwrap();
        store
            .upsert_dataset(&Dataset {
                id: "ds".into(),
                workspace_id: "ws".into(),
                name: "Sales Model".into(),
                description: None,
                business_area: None,
                last_synced: None,
            })
            .unwrap();
        CatalogService::new(OfflineGateway, store, Settings::default())
    }

    fn question(text: &str) -> NewQueryEntry {
        NewQueryEntry {
            dataset_id: "ds".into(),
            question: text.into(),
            success: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_and_read_back() {
        let service = service();
        let mut new = question("total revenue by month?");
        new.measures_used = vec!["Total Revenue".into()];
        new.execution_time_ms = Some(250);
        let id = service.record_query(new).unwrap();
        assert!(id > 0);

        let history = service
            .query_history(&HistoryFilter {
                dataset_id: Some("ds".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query_type, "analysis");
        assert_eq!(history[0].measures_used, vec!["Total Revenue".to_string()]);
    }

    #[test]
    fn test_record_rejects_unknown_dataset_and_empty_question() {
        let service = service();
        let mut other = question("q");
        other.dataset_id = "missing".into();
        assert!(matches!(
            service.record_query(other).unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            service.record_query(question("   ")).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn test_feedback_validation_and_not_found() {
        let service = service();
        let id = service.record_query(question("q")).unwrap();

        let bad = QueryFeedback {
            user_rating: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            service.update_feedback(id, &bad).unwrap_err(),
            ServiceError::Validation(_)
        ));

        let good = QueryFeedback {
            user_rating: Some(4),
            was_helpful: Some(true),
            ..Default::default()
        };
        service.update_feedback(id, &good).unwrap();
        assert!(matches!(
            service.update_feedback(999, &good).unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn test_follow_up_chain_is_forward_only() {
        let service = service();
        let first = service.record_query(question("revenue?")).unwrap();

        let mut follow_up = question("revenue by region?");
        follow_up.led_to_query_id = Some(first);
        let second = service.record_query(follow_up).unwrap();

        let mut dangling = question("follow-up of nothing");
        dangling.led_to_query_id = Some(second + 100);
        let third = service.record_query(dangling).unwrap();

        let history = service.query_history(&HistoryFilter::default()).unwrap();
        let by_id = |id: i64| history.iter().find(|e| e.id == id).unwrap();
        assert_eq!(by_id(second).led_to_query_id, Some(first));
        assert_eq!(by_id(third).led_to_query_id, None);
    }

    #[test]
    fn test_analytics_uses_default_window_and_rates() {
        let service = service();
        let mut rated = question("total revenue?");
        rated.measures_used = vec!["Total Revenue".into(), "Margin".into()];
        rated.execution_time_ms = Some(100);
        let id = service.record_query(rated).unwrap();
        service
            .update_feedback(
                id,
                &QueryFeedback {
                    user_rating: Some(5),
                    was_helpful: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let mut failed = question("broken query");
        failed.success = false;
        service.record_query(failed).unwrap();

        let analytics = service.compute_analytics(Some("ds"), None).unwrap();
        assert_eq!(analytics.window_days, 30);
        assert_eq!(analytics.total_queries, 2);
        assert_eq!(analytics.successful_queries, 1);
        assert_eq!(analytics.top_measures.len(), 2);
        assert_eq!(analytics.average_execution_time_ms, Some(100.0));
        assert_eq!(analytics.average_rating, Some(5.0));
        assert_eq!(analytics.helpful_count, 1);
        assert_eq!(analytics.queries_by_dataset.len(), 1);
        assert_eq!(analytics.queries_by_dataset[0].count, 2);

        assert!(matches!(
            service.compute_analytics(None, Some(0)).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn test_popular_questions_dedup_and_rating_floor() {
        let service = service();
        for (text, rating) in [
            ("Total Revenue?", 5),
            ("total revenue?  ", 5),
            ("Margin trend?", 4),
            ("Meh question", 2),
        ] {
            let id = service.record_query(question(text)).unwrap();
            service
                .update_feedback(
                    id,
                    &QueryFeedback {
                        user_rating: Some(rating),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let popular = service.popular_questions("ds").unwrap();
        assert_eq!(popular.len(), 2);
        // The two revenue variants collapse; the most recent of the tied
        // five-star entries survives.
        assert!(popular
            .iter()
            .any(|p| p.question.trim().eq_ignore_ascii_case("total revenue?")));
        assert!(popular.iter().any(|p| p.question == "Margin trend?"));
    }
}
