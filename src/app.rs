use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use inspector_config::AppConfig;
use inspector_dispatcher::{
    ClusterBootstrap, DispatchSettings, InspectTaskReconciler, MultiClusterCoordinator,
    ReconcileAction,
};
use inspector_domain::{
    ClusterProvider, InspectTask, JobSpec, Node, Rule, RuleCategory, TaskNotifier, TaskStore,
};
use inspector_errors::InspectorResult;
use inspector_results::{ExtractorRegistry, InspectResultReconciler, ReportStorage, ResultAggregator};
use inspector_rules::{sort_policy_last, JobAllocator, RuleEngine};

/// 离线计算得到的 Job 计划
#[derive(Debug, Clone, Serialize)]
pub struct JobPlan {
    pub totals: BTreeMap<RuleCategory, usize>,
    pub jobs: Vec<JobSpec>,
}

/// 不接触集群，只执行规则合并与 Job 划分
pub fn plan(rules: &[Rule], task: &InspectTask, nodes: &[Node]) -> InspectorResult<JobPlan> {
    let merged = RuleEngine::build(rules, task)?;
    let mut jobs = JobAllocator::new(task.name()).partition(&merged, nodes)?;
    sort_policy_last(&mut jobs);
    Ok(JobPlan {
        totals: merged.totals,
        jobs,
    })
}

/// 组装巡检引擎的各个组件
pub struct Application {
    config: AppConfig,
    tasks: InspectTaskReconciler,
    results: InspectResultReconciler,
}

impl Application {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TaskStore>,
        provider: Arc<dyn ClusterProvider>,
        notifier: Arc<dyn TaskNotifier>,
    ) -> Result<Self> {
        config.validate().context("配置验证失败")?;
        let engine = &config.engine;
        info!(
            "初始化巡检引擎，命名空间 {}，报告目录 {}",
            engine.namespace, engine.result_path
        );

        let storage = ReportStorage::new(&engine.result_path);
        let aggregator = Arc::new(ResultAggregator::new(
            store.clone(),
            storage.clone(),
            ExtractorRegistry::with_defaults(),
            engine.namespace.clone(),
        ));
        let bootstrap = Arc::new(ClusterBootstrap::new(provider.local(), engine));
        let coordinator = MultiClusterCoordinator::new(
            provider.clone(),
            bootstrap,
            aggregator,
            DispatchSettings::from_config(&config),
            engine.default_timeout(),
        );
        let tasks = InspectTaskReconciler::new(
            store.clone(),
            provider,
            notifier,
            coordinator,
            engine.default_timeout(),
            engine.requeue_interval(),
        );
        let results = InspectResultReconciler::new(store, storage);

        Ok(Self {
            config,
            tasks,
            results,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn reconcile_task(&self, name: &str) -> Result<ReconcileAction> {
        self.tasks
            .reconcile(name)
            .await
            .with_context(|| format!("调和巡检任务 {name} 失败"))
    }

    pub async fn reconcile_result(&self, name: &str) -> Result<()> {
        self.results
            .reconcile(name)
            .await
            .with_context(|| format!("调和巡检结果 {name} 失败"))
    }

    /// 反复调和任务直到不再需要重新入队
    pub async fn run_task(&self, name: &str) -> Result<()> {
        loop {
            match self.reconcile_task(name).await? {
                ReconcileAction::Done => return Ok(()),
                ReconcileAction::Requeue(after) => {
                    debug!("任务 {} 将在 {:?} 后重新调和", name, after);
                    tokio::time::sleep(after).await;
                }
            }
        }
    }
}
