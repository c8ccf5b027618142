use std::sync::Arc;

use inspector_config::AppConfig;
use inspector_dispatcher::ReconcileAction;
use inspector_domain::{JobPhase, NodeTarget, Phase, RuleCategory};
use inspector_results::ReportStorage;
use inspector_testing_utils::*;
use kube_inspector::{plan, Application};
use serde_json::json;

fn policy_and_sysctl() -> Vec<inspector_domain::Rule> {
    vec![
        RuleBuilder::new("workload-policy").with_opa("privileged").build(),
        RuleBuilder::new("kernel")
            .with_sysctl("vm.swappiness", NodeTarget::default())
            .with_sysctl("net.ipv4.ip_forward", NodeTarget::default())
            .build(),
    ]
}

fn config(result_path: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.engine.result_path = result_path.to_string_lossy().to_string();
    config.engine.poll_interval_seconds = 1;
    config
}

#[test]
fn test_plan_policy_and_sysctl_on_two_nodes() {
    let task = TaskBuilder::new("nightly")
        .with_rule("workload-policy")
        .with_rule("kernel")
        .build();
    let nodes = vec![
        inspector_domain::Node::new("node-1"),
        inspector_domain::Node::new("node-2"),
    ];

    let plan = plan(&policy_and_sysctl(), &task, &nodes).unwrap();

    assert_eq!(plan.totals[&RuleCategory::Opa], 1);
    assert_eq!(plan.totals[&RuleCategory::Sysctl], 2);
    assert_eq!(plan.totals[&RuleCategory::Component], 1);

    let count = |c: RuleCategory| plan.jobs.iter().filter(|j| j.category == c).count();
    assert_eq!(count(RuleCategory::Opa), 1);
    assert_eq!(count(RuleCategory::Sysctl), 2);
    assert_eq!(count(RuleCategory::Component), 1);
    assert_eq!(plan.jobs.last().unwrap().category, RuleCategory::Opa);
}

#[tokio::test]
async fn test_task_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let local = MockClusterClient::new()
        .with_nodes(&["node-1", "node-2"])
        .with_result_payload(
            RuleCategory::Sysctl,
            json!([
                {"name": "vm.swappiness", "assert": true, "level": "warning"},
                {"name": "net.ipv4.ip_forward"}
            ]),
        )
        .with_result_payload(RuleCategory::Opa, json!({"dangerous": 1, "warning": 0}));
    let task = TaskBuilder::new("nightly")
        .with_rule("workload-policy")
        .with_rule("kernel")
        .with_timeout("10m")
        .build();
    let store = MockTaskStore::new()
        .with_task(task)
        .with_rules(policy_and_sysctl());
    let notifier = RecordingNotifier::new();

    let app = Application::new(
        config(dir.path()),
        Arc::new(store.clone()),
        Arc::new(MockClusterProvider::new(local.clone())),
        Arc::new(notifier),
    )
    .unwrap();

    assert_eq!(
        app.reconcile_task("nightly").await.unwrap(),
        ReconcileAction::Done
    );

    let task = store.task("nightly").unwrap();
    assert_eq!(task.status.phase, Phase::Succeeded);
    // 1 个策略 Job、每个节点 1 个 sysctl Job，外加组件检查
    assert_eq!(task.status.job_phases.len(), 4);
    assert!(task
        .status
        .job_phases
        .iter()
        .all(|o| o.phase == JobPhase::Succeeded));
    assert_eq!(
        task.status.completed_category_count,
        task.status.category_outcomes.len()
    );
    assert_eq!(local.create_job_count(), 4);

    let record = store.result("default-nightly-result").unwrap();
    assert_eq!(record.spec.inspect_rule_total[&RuleCategory::Opa], 1);
    assert_eq!(record.spec.inspect_rule_total[&RuleCategory::Sysctl], 2);

    let report = ReportStorage::new(dir.path())
        .load("default-nightly-result")
        .await
        .unwrap();
    assert_eq!(report.fragments(RuleCategory::Sysctl).len(), 4);
    assert_eq!(report.spec.opa_result.dangerous, 1);

    app.reconcile_result("default-nightly-result").await.unwrap();
    let record = store.result("default-nightly-result").unwrap();
    assert!(record.status.complete);
    // 策略检查 1 个 danger，每个节点 1 个 warning
    assert_eq!(record.status.level[&inspector_domain::Level::Danger], 1);
    assert_eq!(record.status.level[&inspector_domain::Level::Warning], 2);
}
