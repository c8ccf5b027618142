use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use inspector_domain::constants::FINALIZER;
use inspector_domain::{
    ClusterInfo, ClusterProvider, InspectTask, ObjectKind, Phase, TaskNotifier, TaskStore,
};
use inspector_errors::InspectorResult;

use crate::coordinator::MultiClusterCoordinator;
use crate::state::{completed_count, evaluate_running, final_phase, RunningVerdict, TaskCache};

/// 一次调和之后的后续动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Done,
    Requeue(Duration),
}

/// 巡检任务的状态机驱动
///
/// `Pending → Running → {Succeeded, Failed}`。首次观察到任务时记录开始时间、
/// 采集集群信息并执行巡检；删除中的任务清理缓存、注销通知后移除 finalizer。
pub struct InspectTaskReconciler {
    store: Arc<dyn TaskStore>,
    provider: Arc<dyn ClusterProvider>,
    notifier: Arc<dyn TaskNotifier>,
    coordinator: MultiClusterCoordinator,
    cache: Arc<TaskCache>,
    default_timeout: Duration,
    requeue_interval: Duration,
}

impl InspectTaskReconciler {
    pub fn new(
        store: Arc<dyn TaskStore>,
        provider: Arc<dyn ClusterProvider>,
        notifier: Arc<dyn TaskNotifier>,
        coordinator: MultiClusterCoordinator,
        default_timeout: Duration,
        requeue_interval: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            coordinator,
            cache: Arc::new(TaskCache::new()),
            default_timeout,
            requeue_interval,
        }
    }

    pub fn cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    pub async fn reconcile(&self, name: &str) -> InspectorResult<ReconcileAction> {
        let Some(mut task) = self.store.get_task(name).await? else {
            debug!("任务 {} 不存在，清理缓存", name);
            self.cache.purge(name).await;
            return Ok(ReconcileAction::Done);
        };

        if task.metadata.is_deleting() {
            return self.finalize(task).await;
        }

        if task.metadata.add_finalizer(FINALIZER) {
            task = self.store.update_task(&task).await?;
        }

        if !task.is_started() {
            return self.start(task).await;
        }

        if task.status.phase.is_terminal() {
            return Ok(ReconcileAction::Done);
        }

        if self.cache.is_in_flight(name).await {
            return Ok(ReconcileAction::Requeue(self.requeue_interval));
        }

        match evaluate_running(&task, Utc::now(), self.default_timeout) {
            RunningVerdict::Complete(phase) => self.conclude(task, phase).await,
            RunningVerdict::TimedOut => {
                warn!("任务 {} 已超时", name);
                self.conclude(task, Phase::Failed).await
            }
            RunningVerdict::Pending => {
                info!("任务 {} 仍在超时窗口内，恢复执行", name);
                self.execute(task).await
            }
        }
    }

    async fn finalize(&self, task: InspectTask) -> InspectorResult<ReconcileAction> {
        let name = task.name().to_string();
        info!("任务 {} 正在删除", name);
        self.cache.purge(&name).await;
        if let Err(e) = self.notifier.unregister(&name).await {
            error!("注销任务 {} 的通知失败: {}", name, e);
        }

        let mut task = task;
        if task.metadata.remove_finalizer(FINALIZER) {
            self.store.update_task(&task).await?;
        }
        Ok(ReconcileAction::Done)
    }

    async fn start(&self, mut task: InspectTask) -> InspectorResult<ReconcileAction> {
        if self.cache.is_in_flight(task.name()).await {
            return Ok(ReconcileAction::Requeue(self.requeue_interval));
        }

        task.status.start_timestamp = Some(Utc::now());
        task.status.phase = Phase::Running;
        task.status.cluster_info = self.cluster_info().await;
        self.store.update_task_status(&task).await?;
        info!("任务 {} 开始执行", task.name());

        self.update_plan(&task, Phase::Running).await;
        self.execute(task).await
    }

    async fn execute(&self, mut task: InspectTask) -> InspectorResult<ReconcileAction> {
        let name = task.name().to_string();
        if !self.cache.try_begin(&name).await {
            return Ok(ReconcileAction::Requeue(self.requeue_interval));
        }

        let rules = match self.store.list_rules(task.rule_group()).await {
            Ok(rules) => rules,
            Err(e) => {
                self.cache.purge(&name).await;
                return Err(e);
            }
        };

        self.coordinator
            .run(&task, Arc::new(rules), self.cache.clone())
            .await;
        let progress = self.cache.finish(&name).await;

        task.status.completed_category_count = completed_count(&progress.category_outcomes);
        task.status.job_phases = progress.job_phases;
        task.status.category_outcomes = progress.category_outcomes;
        let phase = final_phase(&task.status);
        debug!("任务 {} 生成报告: {:?}", name, progress.reports);
        self.conclude(task, phase).await
    }

    async fn conclude(&self, mut task: InspectTask, phase: Phase) -> InspectorResult<ReconcileAction> {
        task.status.phase = phase;
        task.status.end_timestamp = Some(Utc::now());
        match self.store.update_task_status(&task).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!("任务 {} 已被删除，放弃更新状态", task.name());
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e),
        }
        info!(
            "任务 {} 执行结束: {}，完成类别 {}/{}",
            task.name(),
            phase,
            task.status.completed_category_count,
            task.status.category_outcomes.len()
        );
        self.update_plan(&task, phase).await;
        Ok(ReconcileAction::Done)
    }

    async fn update_plan(&self, task: &InspectTask, phase: Phase) {
        let Some(plan) = task.plan_name() else {
            return;
        };
        if let Err(e) = self.store.update_plan_status(plan, task.name(), phase).await {
            error!("更新巡检计划 {} 的状态失败: {}", plan, e);
        }
    }

    /// 采集本集群的版本、节点数与命名空间数，单项失败只记录日志
    async fn cluster_info(&self) -> ClusterInfo {
        let client = self.provider.local();
        let mut info = ClusterInfo::default();

        match client.server_version().await {
            Ok(version) => info.version = version.short(),
            Err(e) => error!("获取集群版本失败: {}", e),
        }
        match client.count_objects(ObjectKind::Nodes).await {
            Ok(count) => info.node_count = count,
            Err(e) => error!("统计节点数量失败: {}", e),
        }
        match client.count_objects(ObjectKind::Namespaces).await {
            Ok(count) => info.namespace_count = count,
            Err(e) => error!("统计命名空间数量失败: {}", e),
        }

        info
    }
}
