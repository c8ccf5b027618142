#[cfg(test)]
mod aggregator_tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use inspector_domain::constants::{
        ANNOTATION_END_TIME, ANNOTATION_INSPECT_CLUSTER, ANNOTATION_INSPECT_POLICY,
        ANNOTATION_START_TIME, LABEL_NODE_NAME, LABEL_RULE_TYPE, LABEL_TASK_NAME,
    };
    use inspector_domain::{
        ConfigArtifact, InspectPolicy, InspectTask, JobOutcome, JobPhase, Phase, RuleCategory,
    };
    use inspector_results::*;
    use inspector_testing_utils::*;

    fn fragment(name: &str, category: &str, node: Option<&str>, data: &str) -> ConfigArtifact {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_TASK_NAME.to_string(), "nightly".to_string());
        labels.insert(LABEL_RULE_TYPE.to_string(), category.to_string());
        if let Some(node) = node {
            labels.insert(LABEL_NODE_NAME.to_string(), node.to_string());
        }
        ConfigArtifact {
            name: name.to_string(),
            namespace: "kubeeye-system".to_string(),
            labels,
            data: data.as_bytes().to_vec(),
        }
    }

    fn outcome(name: &str, category: RuleCategory, phase: JobPhase) -> JobOutcome {
        JobOutcome {
            job_name: name.to_string(),
            category,
            phase,
        }
    }

    fn task() -> InspectTask {
        TaskBuilder::new("nightly")
            .with_policy(InspectPolicy::Cycle)
            .started(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(), Phase::Running)
            .build()
    }

    fn aggregator(store: &MockTaskStore, root: &std::path::Path) -> ResultAggregator {
        ResultAggregator::new(
            Arc::new(store.clone()),
            ReportStorage::new(root),
            ExtractorRegistry::with_defaults(),
            "kubeeye-system",
        )
    }

    #[test]
    fn test_report_name() {
        assert_eq!(report_name("default", "nightly"), "default-nightly-result");
    }

    #[test]
    fn test_aggregate_merges_only_succeeded_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let agg = aggregator(&MockTaskStore::new(), dir.path());
        let fragments = vec![
            fragment(
                "nightly-sysctl-aaaaa",
                "sysctl",
                Some("node-1"),
                r#"[{"name": "vm.swappiness", "assert": true}]"#,
            ),
            fragment(
                "nightly-sysctl-bbbbb",
                "sysctl",
                Some("node-2"),
                r#"[{"name": "vm.swappiness", "assert": true}]"#,
            ),
            fragment("nightly-opa-ccccc", "opa", None, r#"{"dangerous": 3}"#),
        ];
        let outcomes = vec![
            outcome("nightly-sysctl-aaaaa", RuleCategory::Sysctl, JobPhase::Succeeded),
            outcome("nightly-sysctl-bbbbb", RuleCategory::Sysctl, JobPhase::Failed),
            outcome("nightly-opa-ccccc", RuleCategory::Opa, JobPhase::Succeeded),
        ];
        let mut totals = BTreeMap::new();
        totals.insert(RuleCategory::Sysctl, 1);
        totals.insert(RuleCategory::Opa, 1);

        let report = agg.aggregate("default", &task(), &outcomes, &totals, &fragments);

        assert_eq!(report.name(), "default-nightly-result");
        assert_eq!(report.spec.inspect_rule_total, totals);
        let items = report.fragments(RuleCategory::Sysctl);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node_name.as_deref(), Some("node-1"));
        assert_eq!(report.spec.opa_result.dangerous, 3);

        let meta = &report.metadata;
        assert_eq!(meta.label(LABEL_TASK_NAME), Some("nightly"));
        assert_eq!(meta.annotation(ANNOTATION_START_TIME), Some("2024-05-01 08:00:00"));
        assert!(meta.annotation(ANNOTATION_END_TIME).is_some());
        assert_eq!(meta.annotation(ANNOTATION_INSPECT_POLICY), Some("cycle"));
        assert_eq!(meta.annotation(ANNOTATION_INSPECT_CLUSTER), Some("default"));
    }

    #[test]
    fn test_bad_fragments_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let agg = aggregator(&MockTaskStore::new(), dir.path());
        let fragments = vec![
            fragment("nightly-x-aaaaa", "unknown", None, "[]"),
            fragment("nightly-systemd-bbbbb", "systemd", None, "not json"),
            fragment(
                "nightly-nodeinfo-ccccc",
                "nodeinfo",
                Some("node-1"),
                r#"[{"name": "cpu"}]"#,
            ),
        ];
        let outcomes = vec![
            outcome("nightly-x-aaaaa", RuleCategory::Sysctl, JobPhase::Succeeded),
            outcome("nightly-systemd-bbbbb", RuleCategory::Systemd, JobPhase::Succeeded),
            outcome("nightly-nodeinfo-ccccc", RuleCategory::NodeInfo, JobPhase::Succeeded),
            outcome("nightly-opa-missing", RuleCategory::Opa, JobPhase::Succeeded),
        ];

        let report = agg.aggregate("default", &task(), &outcomes, &BTreeMap::new(), &fragments);

        assert_eq!(report.spec.results.len(), 1);
        assert_eq!(report.fragments(RuleCategory::NodeInfo).len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockTaskStore::new();
        let agg = aggregator(&store, dir.path());
        let client = MockClusterClient::new()
            .with_artifact(fragment(
                "nightly-sysctl-aaaaa",
                "sysctl",
                Some("node-1"),
                r#"[{"name": "vm.swappiness", "assert": true, "level": "warning"}]"#,
            ))
            .with_artifact(ConfigArtifact {
                name: "unrelated".to_string(),
                ..Default::default()
            });
        let outcomes = vec![outcome(
            "nightly-sysctl-aaaaa",
            RuleCategory::Sysctl,
            JobPhase::Succeeded,
        )];

        let report = agg
            .aggregate_and_persist("default", &task(), &outcomes, &BTreeMap::new(), &client)
            .await
            .unwrap();

        let saved = agg.storage().load(report.name()).await.unwrap();
        assert_eq!(saved, report);
        let record = store.result("default-nightly-result").unwrap();
        assert!(record.spec.results.is_empty());
        assert_eq!(record.metadata, report.metadata);

        assert!(client.artifact("nightly-sysctl-aaaaa").is_none());
        assert!(client.artifact("unrelated").is_some());
    }

    #[tokio::test]
    async fn test_existing_record_still_cleans_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let mut existing = inspector_domain::Report::default();
        existing.metadata.name = "default-nightly-result".to_string();
        let store = MockTaskStore::new().with_result(existing);
        let agg = aggregator(&store, dir.path());
        let client = MockClusterClient::new().with_artifact(fragment(
            "nightly-sysctl-aaaaa",
            "sysctl",
            Some("node-1"),
            r#"[{"name": "vm.swappiness", "assert": true}]"#,
        ));
        let outcomes = vec![outcome(
            "nightly-sysctl-aaaaa",
            RuleCategory::Sysctl,
            JobPhase::Succeeded,
        )];

        let report = agg
            .aggregate_and_persist("default", &task(), &outcomes, &BTreeMap::new(), &client)
            .await
            .unwrap();

        assert_eq!(store.result_count(), 1);
        assert!(client.artifact("nightly-sysctl-aaaaa").is_none());
        let saved = agg.storage().load(report.name()).await.unwrap();
        assert_eq!(saved.fragments(RuleCategory::Sysctl).len(), 1);
    }
}
