#[cfg(test)]
mod tests {
    use atlas::classify::{BusinessArea, MeasureType};
    use atlas::config::ContextSettings;
    use atlas::context::{assemble_query_context, dataset_context, measure_context};
    use atlas::model::{
        BusinessRule, Dataset, Measure, NewQueryEntry, QueryFeedback, Table, TableType, Workspace,
    };
    use atlas::store::CatalogStore;
    use atlas::journal;

    fn seeded_store() -> CatalogStore {
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
                business_area: Some("Sales".into()),
                last_synced: None,
            })
            .unwrap();

        for (name, expr, mt, area) in [
            (
                "Total Revenue",
                "SUM('FactSales'[Amount])",
                MeasureType::Sum,
                BusinessArea::Sales,
            ),
            (
                "Revenue YTD",
                "CALCULATE([Total Revenue], DATESYTD('DimDate'[Date]))",
                MeasureType::TimeIntelligence,
                BusinessArea::Sales,
            ),
            (
                "Headcount",
                "COUNTROWS('DimEmployee')",
                MeasureType::Count,
                BusinessArea::General,
            ),
        ] {
            store
                .upsert_measure(&Measure {
                    id: 0,
                    dataset_id: "ds".into(),
                    name: name.into(),
                    table_name: None,
                    expression: Some(expr.into()),
                    measure_type: mt,
                    business_area: area,
                    folder: None,
                    description: None,
                    is_hidden: false,
                })
                .unwrap();
        }

        for name in ["FactSales", "DimDate", "DimEmployee"] {
            store
                .upsert_table(&Table {
                    id: 0,
                    dataset_id: "ds".into(),
                    name: name.into(),
                    table_type: TableType::from_name(name),
                    description: None,
                    is_hidden: false,
                })
                .unwrap();
        }

        store
            .insert_rule(&BusinessRule {
                id: 0,
                dataset_id: Some("ds".into()),
                name: "Revenue recognition".into(),
                category: Some("Calculation".into()),
                business_area: Some("Sales".into()),
                description: "Revenue is recognized at shipment.".into(),
                rule_logic: None,
                calculation: None,
                applies_to_measures: vec!["Total Revenue".into()],
                applies_to_tables: vec![],
                is_active: true,
                version: "1.0".into(),
            })
            .unwrap();

        store
    }

    fn settings() -> ContextSettings {
        ContextSettings::default()
    }

    #[test]
    fn test_scoring_selects_matching_items() {
        let store = seeded_store();
        let bundle =
            assemble_query_context(&store, &settings(), "ds", "revenue this year", "analysis")
                .unwrap();

        let measure_names: Vec<&str> =
            bundle.measures.iter().map(|m| m.name.as_str()).collect();
        assert!(measure_names.contains(&"Total Revenue"));
        assert!(measure_names.contains(&"Revenue YTD"));
        assert!(!measure_names.contains(&"Headcount"));

        // The rule applies to a selected measure.
        assert_eq!(bundle.rules.len(), 1);
        assert!(!bundle.meta.truncated);
        assert_eq!(bundle.meta.measure_count, bundle.measures.len());
    }

    #[test]
    fn test_unmatched_question_yields_degraded_bundle() {
        let store = seeded_store();
        let bundle =
            assemble_query_context(&store, &settings(), "ds", "xyzzy plugh", "analysis").unwrap();
        assert!(bundle.measures.is_empty());
        assert!(bundle.tables.is_empty());
        assert!(bundle.history.is_empty());
    }

    #[test]
    fn test_truncation_drops_whole_items_rules_first() {
        let store = seeded_store();
        let mut tight = settings();
        tight.max_context_length = 400;
        let bundle =
            assemble_query_context(&store, &tight, "ds", "total revenue ytd", "analysis").unwrap();

        assert!(bundle.meta.truncated);
        assert!(bundle.rules.is_empty());
        // Counts stay consistent with the surviving content.
        assert_eq!(bundle.meta.rule_count, 0);
        assert_eq!(bundle.meta.measure_count, bundle.measures.len());
    }

    #[test]
    fn test_similar_history_requires_rating_and_overlap() {
        let store = seeded_store();
        for (question, rating) in [
            ("total revenue by month", Some(5)),
            ("total revenue by region", Some(3)),
            ("employee headcount", Some(5)),
        ] {
            let id = journal::record(
                &store,
                NewQueryEntry {
                    dataset_id: "ds".into(),
                    question: question.into(),
                    success: true,
                    ..Default::default()
                },
            )
            .unwrap();
            if let Some(r) = rating {
                journal::update_feedback(
                    &store,
                    id,
                    &QueryFeedback {
                        user_rating: Some(r),
                        ..Default::default()
                    },
                )
                .unwrap();
            }
        }

        let bundle =
            assemble_query_context(&store, &settings(), "ds", "total revenue", "analysis").unwrap();
        assert_eq!(bundle.history.len(), 1);
        assert_eq!(bundle.history[0].question, "total revenue by month");
        assert!(bundle.history[0].similarity > 0.0);
    }

    #[test]
    fn test_dataset_context_groups_measures() {
        let store = seeded_store();
        let ctx = dataset_context(&store, "ds").unwrap().unwrap();
        assert_eq!(ctx.measure_count, 3);
        assert_eq!(ctx.tables.len(), 3);
        assert!(ctx.measures_by_type.contains_key("Time Intelligence"));
        assert_eq!(
            ctx.measures_by_area.get("Sales").map(Vec::len),
            Some(2)
        );
        assert!(dataset_context(&store, "nope").unwrap().is_none());
    }

    #[test]
    fn test_measure_context_walks_the_graph() {
        let store = seeded_store();
        let ctx = measure_context(&store, "ds", "Total Revenue").unwrap().unwrap();
        assert_eq!(ctx.dependents, vec!["Revenue YTD".to_string()]);
        assert!(ctx.depends_on_measures.is_empty());
        assert_eq!(ctx.referenced_columns, vec!["FactSales.Amount".to_string()]);
        assert_eq!(ctx.rules.len(), 1);
        assert!(ctx.formatted_expression.is_some());

        let ytd = measure_context(&store, "ds", "Revenue YTD").unwrap().unwrap();
        assert_eq!(ytd.depends_on_measures, vec!["Total Revenue".to_string()]);
        assert!(measure_context(&store, "ds", "Nope").unwrap().is_none());
    }
}
