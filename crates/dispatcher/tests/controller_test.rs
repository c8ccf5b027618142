#[cfg(test)]
mod controller_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use inspector_config::AppConfig;
    use inspector_domain::constants::FINALIZER;
    use inspector_domain::{
        CategoryOutcome, ClusterProvider, JobPhase, NodeTarget, Phase, RuleCategory,
    };
    use inspector_dispatcher::*;
    use inspector_results::{ExtractorRegistry, ReportStorage, ResultAggregator};
    use inspector_testing_utils::*;

    struct Harness {
        reconciler: InspectTaskReconciler,
        local: MockClusterClient,
        store: MockTaskStore,
        notifier: RecordingNotifier,
        _dir: tempfile::TempDir,
    }

    fn harness(local: MockClusterClient, store: MockTaskStore) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::new();
        let reconciler = reconciler(&local, &store, &notifier, dir.path());
        Harness {
            reconciler,
            local,
            store,
            notifier,
            _dir: dir,
        }
    }

    fn reconciler(
        local: &MockClusterClient,
        store: &MockTaskStore,
        notifier: &RecordingNotifier,
        dir: &Path,
    ) -> InspectTaskReconciler {
        let config = AppConfig::default();
        let provider: Arc<dyn ClusterProvider> =
            Arc::new(MockClusterProvider::new(local.clone()));
        let coordinator = MultiClusterCoordinator::new(
            provider.clone(),
            Arc::new(ClusterBootstrap::new(provider.local(), &config.engine)),
            Arc::new(ResultAggregator::new(
                Arc::new(store.clone()),
                ReportStorage::new(dir),
                ExtractorRegistry::with_defaults(),
                config.engine.namespace.clone(),
            )),
            DispatchSettings {
                poll_interval: Duration::from_millis(5),
                ..DispatchSettings::from_config(&config)
            },
            config.engine.default_timeout(),
        );
        InspectTaskReconciler::new(
            Arc::new(store.clone()),
            provider,
            Arc::new(notifier.clone()),
            coordinator,
            config.engine.default_timeout(),
            config.engine.requeue_interval(),
        )
    }

    fn store_with(task: inspector_domain::InspectTask) -> MockTaskStore {
        MockTaskStore::new().with_task(task).with_rules(vec![RuleBuilder::new("kernel")
            .with_sysctl("vm.swappiness", NodeTarget::default())
            .with_systemd("kubelet", NodeTarget::node("node-1"))
            .build()])
    }

    fn outcome(category: RuleCategory, phase: JobPhase) -> CategoryOutcome {
        CategoryOutcome {
            cluster: "default".to_string(),
            category,
            phase,
        }
    }

    #[tokio::test]
    async fn test_pending_task_runs_to_success() {
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_plan("daily")
            .build();
        let local = MockClusterClient::new()
            .with_nodes(&["node-1", "node-2"])
            .with_namespace_count(12);
        let h = harness(local, store_with(task));

        let action = h.reconciler.reconcile("nightly").await.unwrap();
        assert_eq!(action, ReconcileAction::Done);

        let task = h.store.task("nightly").unwrap();
        assert!(task.metadata.has_finalizer(FINALIZER));
        assert_eq!(task.status.phase, Phase::Succeeded);
        assert!(task.status.start_timestamp.is_some());
        assert!(task.status.end_timestamp.is_some());
        assert_eq!(task.status.cluster_info.version, "1.28");
        assert_eq!(task.status.cluster_info.node_count, 2);
        assert_eq!(task.status.cluster_info.namespace_count, 12);
        // sysctl 广播到两个节点，systemd 定位到 node-1，外加组件检查
        assert_eq!(task.status.job_phases.len(), 4);
        assert_eq!(task.status.category_outcomes.len(), 3);
        assert_eq!(task.status.completed_category_count, 3);

        assert_eq!(
            h.store.plan_statuses(),
            vec![
                ("daily".to_string(), "nightly".to_string(), Phase::Running),
                ("daily".to_string(), "nightly".to_string(), Phase::Succeeded),
            ]
        );
        assert!(h.store.result("default-nightly-result").is_some());
        assert!(h.reconciler.cache().is_empty().await);

        // 终态任务不再执行
        let created = h.local.create_job_count();
        assert_eq!(
            h.reconciler.reconcile("nightly").await.unwrap(),
            ReconcileAction::Done
        );
        assert_eq!(h.local.create_job_count(), created);
    }

    #[tokio::test]
    async fn test_failed_category_fails_task() {
        let task = TaskBuilder::new("nightly").with_rule("kernel").build();
        let local = MockClusterClient::new()
            .with_nodes(&["node-1", "node-2"])
            .with_category_behavior(RuleCategory::Systemd, JobBehavior::Fail);
        let h = harness(local, store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        let task = h.store.task("nightly").unwrap();
        assert_eq!(task.status.phase, Phase::Failed);
        assert_eq!(task.status.category_outcomes.len(), 3);
        assert_eq!(task.status.completed_category_count, 2);
        assert!(task
            .status
            .category_outcomes
            .contains(&outcome(RuleCategory::Systemd, JobPhase::Failed)));
    }

    #[tokio::test]
    async fn test_running_task_is_written_before_dispatch() {
        let task = TaskBuilder::new("nightly").with_rule("kernel").build();
        let h = harness(MockClusterClient::new().with_nodes(&["node-1"]), store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        let updates = h.store.status_updates();
        assert_eq!(updates.first().unwrap().status.phase, Phase::Running);
        assert!(updates.last().unwrap().status.phase.is_terminal());
    }

    #[tokio::test]
    async fn test_missing_task_is_purged() {
        let h = harness(MockClusterClient::new(), MockTaskStore::new());
        h.reconciler.cache().try_begin("gone").await;

        let action = h.reconciler.reconcile("gone").await.unwrap();

        assert_eq!(action, ReconcileAction::Done);
        assert!(h.reconciler.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_deleting_task_cleans_up_and_drops_finalizer() {
        let task = TaskBuilder::new("nightly")
            .with_finalizer(FINALIZER)
            .deleting()
            .build();
        let h = harness(MockClusterClient::new(), store_with(task));
        h.reconciler.cache().try_begin("nightly").await;

        let action = h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(action, ReconcileAction::Done);
        assert_eq!(h.notifier.unregistered(), vec!["nightly".to_string()]);
        assert!(!h.store.task("nightly").unwrap().metadata.has_finalizer(FINALIZER));
        assert!(h.reconciler.cache().is_empty().await);
        assert_eq!(h.local.create_job_count(), 0);
    }

    #[tokio::test]
    async fn test_running_task_past_timeout_fails() {
        let started = Utc::now() - chrono::Duration::hours(2);
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_timeout("1h")
            .with_finalizer(FINALIZER)
            .started(started, Phase::Running)
            .build();
        let h = harness(MockClusterClient::new().with_nodes(&["node-1"]), store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        let task = h.store.task("nightly").unwrap();
        assert_eq!(task.status.phase, Phase::Failed);
        assert!(task.status.end_timestamp.is_some());
        assert_eq!(h.local.create_job_count(), 0);
    }

    #[tokio::test]
    async fn test_running_task_with_complete_outcomes_succeeds() {
        let mut task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        task.status.category_outcomes = vec![
            outcome(RuleCategory::Sysctl, JobPhase::Succeeded),
            outcome(RuleCategory::Component, JobPhase::Succeeded),
        ];
        task.status.completed_category_count = 2;
        let h = harness(MockClusterClient::new().with_nodes(&["node-1"]), store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(h.store.task("nightly").unwrap().status.phase, Phase::Succeeded);
        assert_eq!(h.local.create_job_count(), 0);
    }

    #[tokio::test]
    async fn test_running_task_with_failed_outcome_fails() {
        let mut task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        task.status.category_outcomes = vec![outcome(RuleCategory::Opa, JobPhase::Failed)];
        let h = harness(MockClusterClient::new(), store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(h.store.task("nightly").unwrap().status.phase, Phase::Failed);
    }

    #[tokio::test]
    async fn test_interrupted_run_is_resumed() {
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        let local = MockClusterClient::new().with_nodes(&["node-1"]);
        let h = harness(local, store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        let task = h.store.task("nightly").unwrap();
        assert_eq!(task.status.phase, Phase::Succeeded);
        assert_eq!(task.status.completed_category_count, 3);
    }

    fn leftover(name: &str, category: RuleCategory, node: &str) -> inspector_domain::JobTemplate {
        let spec = inspector_domain::JobSpec {
            job_name: name.to_string(),
            category,
            node_name: Some(node.to_string()),
            run_rule: b"[]".to_vec(),
        };
        build_job_template("nightly", "kubeeye-system", &spec, &AppConfig::default().job)
    }

    #[tokio::test]
    async fn test_resumed_run_adopts_leftover_job() {
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        let local = MockClusterClient::new().with_nodes(&["node-1"]).with_leftover_job(
            leftover("nightly-sysctl-abcde", RuleCategory::Sysctl, "node-1"),
            JobBehavior::CompleteAfter(2),
        );
        let h = harness(local, store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        let created: Vec<String> = h.local.created_jobs().into_iter().map(|j| j.name).collect();
        assert_eq!(created.len(), 2);
        assert!(!created.iter().any(|n| n.starts_with("nightly-sysctl")));
        assert!(h.local.deleted_jobs().is_empty());

        let task = h.store.task("nightly").unwrap();
        assert_eq!(task.status.phase, Phase::Succeeded);
        assert!(task
            .status
            .job_phases
            .iter()
            .any(|o| o.job_name == "nightly-sysctl-abcde" && o.phase == JobPhase::Succeeded));
    }

    #[tokio::test]
    async fn test_resumed_run_deletes_unmatched_leftover() {
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        let local = MockClusterClient::new().with_nodes(&["node-1"]).with_leftover_job(
            leftover("nightly-systemd-zzzzz", RuleCategory::Systemd, "node-9"),
            JobBehavior::Never,
        );
        let h = harness(local, store_with(task));

        h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(
            h.local.deleted_jobs(),
            vec![(
                "nightly-systemd-zzzzz".to_string(),
                inspector_domain::DeletePropagation::Background
            )]
        );
        assert_eq!(h.store.task("nightly").unwrap().status.phase, Phase::Succeeded);
    }

    #[tokio::test]
    async fn test_resumed_run_keeps_existing_result_record() {
        let mut existing = inspector_domain::Report::default();
        existing.metadata.name = "default-nightly-result".to_string();
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        let local = MockClusterClient::new().with_nodes(&["node-1"]);
        let h = harness(local, store_with(task).with_result(existing));

        h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(h.store.task("nightly").unwrap().status.phase, Phase::Succeeded);
        assert_eq!(h.local.artifact_count(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_task_is_requeued() {
        let task = TaskBuilder::new("nightly")
            .with_rule("kernel")
            .with_finalizer(FINALIZER)
            .started(Utc::now(), Phase::Running)
            .build();
        let h = harness(MockClusterClient::new(), store_with(task));
        h.reconciler.cache().try_begin("nightly").await;

        let action = h.reconciler.reconcile("nightly").await.unwrap();

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(3)));
        assert_eq!(
            h.store.task("nightly").unwrap().status.phase,
            Phase::Running
        );
    }
}
