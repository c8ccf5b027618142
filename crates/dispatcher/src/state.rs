//! 任务状态判定
//!
//! 完成策略：每个(集群, 类别)组合在该类别所有 Job 都成功时才算成功；
//! 至少存在一个组合且全部成功时任务成功，否则失败。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use inspector_domain::{
    CategoryOutcome, InspectTask, JobOutcome, JobPhase, Phase, RuleCategory, TaskStatus,
};

/// 把单个集群的 Job 结果归并为类别结果
pub fn category_outcomes(cluster: &str, outcomes: &[JobOutcome]) -> Vec<CategoryOutcome> {
    let mut phases: BTreeMap<RuleCategory, JobPhase> = BTreeMap::new();
    for outcome in outcomes {
        let phase = phases.entry(outcome.category).or_insert(JobPhase::Succeeded);
        if outcome.phase == JobPhase::Failed {
            *phase = JobPhase::Failed;
        }
    }
    phases
        .into_iter()
        .map(|(category, phase)| CategoryOutcome {
            cluster: cluster.to_string(),
            category,
            phase,
        })
        .collect()
}

pub fn completed_count(outcomes: &[CategoryOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| o.phase == JobPhase::Succeeded)
        .count()
}

/// 所有集群执行结束后的最终阶段
pub fn final_phase(status: &TaskStatus) -> Phase {
    let total = status.category_outcomes.len();
    if total > 0 && status.completed_category_count == total {
        Phase::Succeeded
    } else {
        Phase::Failed
    }
}

/// 重新观察到运行中任务时的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningVerdict {
    /// 已记录的类别结果足以得出终态
    Complete(Phase),
    TimedOut,
    /// 仍在超时窗口内且没有结论
    Pending,
}

pub fn evaluate_running(
    task: &InspectTask,
    now: DateTime<Utc>,
    default_timeout: Duration,
) -> RunningVerdict {
    let status = &task.status;
    let total = status.category_outcomes.len();
    if total > 0 && status.completed_category_count == total {
        return RunningVerdict::Complete(Phase::Succeeded);
    }
    if status
        .category_outcomes
        .iter()
        .any(|o| o.phase == JobPhase::Failed)
    {
        return RunningVerdict::Complete(Phase::Failed);
    }
    if task.is_timed_out(now, default_timeout) {
        return RunningVerdict::TimedOut;
    }
    RunningVerdict::Pending
}

/// 一次执行中逐个集群累积的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskProgress {
    pub job_phases: Vec<JobOutcome>,
    pub category_outcomes: Vec<CategoryOutcome>,
    pub reports: Vec<String>,
}

#[derive(Default)]
struct CacheState {
    in_flight: HashSet<String>,
    pending: HashMap<String, TaskProgress>,
}

/// 控制器持有的任务级缓存：执行中的任务集合与待汇总的集群结果
///
/// 任务被删除或不存在时必须调用 [`TaskCache::purge`]。
#[derive(Default)]
pub struct TaskCache {
    state: Mutex<CacheState>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记任务开始执行，已在执行中时返回 false
    pub async fn try_begin(&self, task: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.in_flight.insert(task.to_string()) {
            return false;
        }
        state.pending.insert(task.to_string(), TaskProgress::default());
        true
    }

    pub async fn is_in_flight(&self, task: &str) -> bool {
        self.state.lock().await.in_flight.contains(task)
    }

    /// 记录单个集群的执行结果
    pub async fn record(
        &self,
        task: &str,
        cluster: &str,
        outcomes: Vec<JobOutcome>,
        report: Option<String>,
    ) {
        let categories = category_outcomes(cluster, &outcomes);
        let mut state = self.state.lock().await;
        let progress = state.pending.entry(task.to_string()).or_default();
        progress.category_outcomes.extend(categories);
        progress.job_phases.extend(outcomes);
        progress.reports.extend(report);
    }

    /// 结束执行并取出累积的结果
    pub async fn finish(&self, task: &str) -> TaskProgress {
        let mut state = self.state.lock().await;
        state.in_flight.remove(task);
        state.pending.remove(task).unwrap_or_default()
    }

    pub async fn purge(&self, task: &str) {
        let mut state = self.state.lock().await;
        state.in_flight.remove(task);
        state.pending.remove(task);
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.in_flight.len().max(state.pending.len())
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
