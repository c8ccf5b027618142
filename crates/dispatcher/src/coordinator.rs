use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};

use inspector_domain::constants::DEFAULT_CLUSTER;
use inspector_domain::{ClusterClient, ClusterProvider, InspectTask, JobOutcome, Rule};
use inspector_errors::InspectorResult;
use inspector_results::ResultAggregator;
use inspector_rules::{JobAllocator, RuleEngine};

use crate::bootstrap::ClusterBootstrap;
use crate::dispatcher::{DispatchSettings, Dispatcher};
use crate::state::TaskCache;

/// 单个集群一次执行的产出
#[derive(Debug, Default)]
pub struct ClusterRun {
    pub outcomes: Vec<JobOutcome>,
    pub report: Option<String>,
}

/// 跨集群并行执行巡检
///
/// 每个目标集群独立完成 初始化 → 规则合并 → Job 分配 → 接管遗留 Job → 下发 → 结果聚合，
/// 单个集群失败只记录日志，不影响其他集群。
#[derive(Clone)]
pub struct MultiClusterCoordinator {
    provider: Arc<dyn ClusterProvider>,
    bootstrap: Arc<ClusterBootstrap>,
    aggregator: Arc<ResultAggregator>,
    settings: DispatchSettings,
    default_timeout: Duration,
}

impl MultiClusterCoordinator {
    pub fn new(
        provider: Arc<dyn ClusterProvider>,
        bootstrap: Arc<ClusterBootstrap>,
        aggregator: Arc<ResultAggregator>,
        settings: DispatchSettings,
        default_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            bootstrap,
            aggregator,
            settings,
            default_timeout,
        }
    }

    /// 对所有目标集群执行巡检，各集群的结果写入 `cache`
    pub async fn run(&self, task: &InspectTask, rules: Arc<Vec<Rule>>, cache: Arc<TaskCache>) {
        let task = Arc::new(task.clone());
        let clusters = task.target_clusters();
        info!("任务 {} 开始巡检 {} 个集群", task.name(), clusters.len());

        let handles: Vec<_> = clusters
            .into_iter()
            .map(|cluster| {
                let this = self.clone();
                let task = task.clone();
                let rules = rules.clone();
                let cache = cache.clone();
                tokio::spawn(async move {
                    let run = match this.run_cluster(&cluster, &task, &rules).await {
                        Ok(run) => run,
                        Err(e) => {
                            error!("集群 {} 巡检失败: {}", cluster, e);
                            ClusterRun::default()
                        }
                    };
                    cache
                        .record(task.name(), &cluster, run.outcomes, run.report)
                        .await;
                })
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("集群巡检协程异常退出: {}", e);
            }
        }
    }

    async fn client_for(&self, cluster: &str) -> InspectorResult<Arc<dyn ClusterClient>> {
        if cluster == DEFAULT_CLUSTER {
            return Ok(self.provider.local());
        }
        let client = self.provider.client_for(cluster).await?;
        self.bootstrap.ensure(cluster, client.as_ref()).await?;
        Ok(client)
    }

    async fn run_cluster(
        &self,
        cluster: &str,
        task: &InspectTask,
        rules: &[Rule],
    ) -> InspectorResult<ClusterRun> {
        let client = self.client_for(cluster).await?;

        let nodes = client.list_nodes().await?;
        let merged = RuleEngine::build(rules, task)?;
        let jobs = JobAllocator::new(task.name()).partition(&merged, &nodes)?;
        info!(
            "集群 {} 共 {} 个节点，任务 {} 分配 {} 个Job",
            cluster,
            nodes.len(),
            task.name(),
            jobs.len()
        );

        let dispatcher = Dispatcher::new(client.clone(), self.settings.clone());
        let jobs = dispatcher.adopt_leftovers(task.name(), jobs).await?;
        let jobs = dispatcher.distribute_rules(task.name(), jobs).await?;

        let deadline = task.deadline(self.default_timeout).unwrap_or_else(|| {
            Utc::now()
                + chrono::Duration::from_std(task.timeout(self.default_timeout))
                    .unwrap_or_else(|_| chrono::Duration::zero())
        });
        let outcomes = dispatcher
            .run(task.name(), jobs, deadline, nodes.len())
            .await;

        let mut finished = task.clone();
        finished.status.end_timestamp = Some(Utc::now());
        let report = match self
            .aggregator
            .aggregate_and_persist(cluster, &finished, &outcomes, &merged.totals, client.as_ref())
            .await
        {
            Ok(report) => Some(report.name().to_string()),
            Err(e) => {
                warn!("集群 {} 的巡检报告生成失败: {}", cluster, e);
                None
            }
        };

        Ok(ClusterRun { outcomes, report })
    }
}
