use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use inspector_config::{AppConfig, JobConfig};
use inspector_domain::constants::{
    LABEL_INSPECT_RULE_GROUP, LABEL_NODE_NAME, LABEL_RULE_TYPE, LABEL_TASK_NAME, TEMP_RULE_GROUP,
};
use inspector_domain::{
    ClusterClient, ConfigArtifact, DeletePropagation, JobOutcome, JobPhase, JobSpec, LabelSelector,
};
use inspector_errors::InspectorResult;
use inspector_rules::sort_policy_last;

use crate::template::build_job_template;

/// 并发预算：`max(min, round(节点数 + 0.1 * 类别数))`
///
/// `category_count` 是待下发 Job 中不同类别的个数，不是 Job 总数。
pub fn concurrency_budget(node_count: usize, category_count: usize, min: usize) -> usize {
    let computed = (node_count as f64 + 0.1 * category_count as f64).round() as usize;
    computed.max(min)
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub namespace: String,
    pub poll_interval: Duration,
    pub min_concurrency: usize,
    pub job: JobConfig,
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            namespace: config.engine.namespace.clone(),
            poll_interval: config.engine.poll_interval(),
            min_concurrency: config.engine.min_concurrency,
            job: config.job.clone(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// 单个集群内的 Job 下发器
pub struct Dispatcher {
    client: Arc<dyn ClusterClient>,
    settings: Arc<DispatchSettings>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn ClusterClient>, settings: DispatchSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
        }
    }

    /// 接管上一轮执行遗留在集群中的 Job
    ///
    /// 临时规则仍在时直接沿用其中的 Job 规格。否则按 (类别, 节点) 把新规划的 Job
    /// 对应到带本任务标签的遗留 Job 或结果片段，只有一一对应时才沿用遗留名称；
    /// 无法对应的遗留 Job 以后台级联方式删除。
    pub async fn adopt_leftovers(
        &self,
        task_name: &str,
        mut planned: Vec<JobSpec>,
    ) -> InspectorResult<Vec<JobSpec>> {
        let namespace = &self.settings.namespace;

        if let Some(artifact) = self.client.get_config_artifact(namespace, task_name).await? {
            if artifact.label(LABEL_INSPECT_RULE_GROUP) == Some(TEMP_RULE_GROUP) {
                match serde_json::from_slice::<Vec<JobSpec>>(&artifact.data) {
                    Ok(jobs) if !jobs.is_empty() => {
                        info!("任务 {} 沿用已下发的临时规则，共 {} 个Job", task_name, jobs.len());
                        return Ok(jobs);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("任务 {} 的临时规则无法解析: {}", task_name, e),
                }
            }
        }

        let mut selector = LabelSelector::new();
        selector.insert(LABEL_TASK_NAME.to_string(), task_name.to_string());
        let jobs = self.client.list_jobs(namespace, &selector).await?;
        let fragments = self.client.list_config_artifacts(namespace, &selector).await?;
        if jobs.is_empty() && fragments.is_empty() {
            return Ok(planned);
        }

        let mut leftovers: BTreeMap<String, JobKey> = BTreeMap::new();
        for job in &jobs {
            let key = JobKey::from_labels(job.label(LABEL_RULE_TYPE), job.label(LABEL_NODE_NAME));
            leftovers.insert(job.name.clone(), key);
        }
        for fragment in &fragments {
            leftovers.entry(fragment.name.clone()).or_insert_with(|| {
                JobKey::from_labels(fragment.label(LABEL_RULE_TYPE), fragment.label(LABEL_NODE_NAME))
            });
        }

        let mut by_key: BTreeMap<&JobKey, Vec<&String>> = BTreeMap::new();
        for (name, key) in &leftovers {
            by_key.entry(key).or_default().push(name);
        }
        let mut planned_per_key: BTreeMap<JobKey, usize> = BTreeMap::new();
        for spec in &planned {
            *planned_per_key.entry(JobKey::of(spec)).or_default() += 1;
        }

        let mut adopted = HashSet::new();
        for spec in &mut planned {
            let key = JobKey::of(spec);
            let Some(names) = by_key.get(&key) else {
                continue;
            };
            if names.len() == 1 && planned_per_key.get(&key) == Some(&1) {
                debug!("Job {} 沿用遗留名称 {}", spec.job_name, names[0]);
                spec.job_name = names[0].clone();
                adopted.insert(names[0].clone());
            }
        }

        for job in jobs.iter().filter(|j| !adopted.contains(&j.name)) {
            warn!("删除任务 {} 无法接管的遗留Job {}", task_name, job.name);
            if let Err(e) = self
                .client
                .delete_job(namespace, &job.name, DeletePropagation::Background)
                .await
            {
                warn!("删除遗留Job {} 失败: {}", job.name, e);
            }
        }

        info!(
            "任务 {} 接管 {} 个遗留Job，共 {} 个遗留对象",
            task_name,
            adopted.len(),
            leftovers.len()
        );
        Ok(planned)
    }

    /// 下发本次执行的规则集：策略类 Job 排到最后，先删除同名的旧规则再重新创建
    pub async fn distribute_rules(
        &self,
        task_name: &str,
        mut jobs: Vec<JobSpec>,
    ) -> InspectorResult<Vec<JobSpec>> {
        sort_policy_last(&mut jobs);
        let data = serde_json::to_vec(&jobs)?;
        let namespace = &self.settings.namespace;

        if self
            .client
            .get_config_artifact(namespace, task_name)
            .await?
            .is_some()
        {
            if let Err(e) = self.client.delete_config_artifact(namespace, task_name).await {
                warn!("删除旧的临时规则 {} 失败: {}", task_name, e);
            }
        }

        let mut labels = BTreeMap::new();
        labels.insert(
            LABEL_INSPECT_RULE_GROUP.to_string(),
            TEMP_RULE_GROUP.to_string(),
        );
        self.client
            .create_config_artifact(&ConfigArtifact {
                name: task_name.to_string(),
                namespace: namespace.clone(),
                labels,
                data,
            })
            .await?;

        debug!("任务 {} 下发临时规则，共 {} 个Job", task_name, jobs.len());
        Ok(jobs)
    }

    /// 按并发预算执行所有 Job，返回每个 Job 的终态
    ///
    /// 结果按完成先后排列，与提交顺序无关。
    pub async fn run(
        &self,
        task_name: &str,
        jobs: Vec<JobSpec>,
        deadline: DateTime<Utc>,
        node_count: usize,
    ) -> Vec<JobOutcome> {
        let started = Instant::now();
        let total = jobs.len();
        let category_count = jobs.iter().map(|j| j.category).collect::<HashSet<_>>().len();
        let budget = concurrency_budget(node_count, category_count, self.settings.min_concurrency);
        let workers = budget.min(total);

        info!(
            "任务 {} 开始下发 {} 个Job，并发预算 {}",
            task_name, total, budget
        );

        let runner = JobRunner {
            client: self.client.clone(),
            settings: self.settings.clone(),
            task_name: task_name.to_string(),
            deadline,
        };
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let runner = runner.clone();
                let queue = queue.clone();
                let outcomes = outcomes.clone();
                tokio::spawn(async move {
                    loop {
                        let Some(spec) = queue.lock().await.pop_front() else {
                            break;
                        };
                        debug!("工作协程 {} 处理Job {}", worker_id, spec.job_name);
                        let phase = runner.run_job(&spec).await;
                        counter!(
                            "inspector_jobs_total",
                            "category" => spec.category.to_string(),
                            "phase" => phase.as_str()
                        )
                        .increment(1);
                        let outcome = match phase {
                            JobPhase::Succeeded => JobOutcome::succeeded(&spec),
                            JobPhase::Failed => JobOutcome::failed(&spec),
                        };
                        outcomes.lock().await.push(outcome);
                    }
                })
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Job工作协程异常退出: {}", e);
            }
        }

        if let Err(e) = self.clear_rules().await {
            warn!("清理临时规则失败: {}", e);
        }

        histogram!("inspector_dispatch_duration_seconds").record(started.elapsed().as_secs_f64());

        let outcomes = std::mem::take(&mut *outcomes.lock().await);
        info!(
            "任务 {} 的Job全部结束，成功 {}/{}",
            task_name,
            outcomes.iter().filter(|o| o.is_succeeded()).count(),
            outcomes.len()
        );
        outcomes
    }

    /// 按临时规则组标签删除本次执行创建的规则
    pub async fn clear_rules(&self) -> InspectorResult<()> {
        let mut selector = BTreeMap::new();
        selector.insert(
            LABEL_INSPECT_RULE_GROUP.to_string(),
            TEMP_RULE_GROUP.to_string(),
        );
        self.client
            .delete_config_artifacts(&self.settings.namespace, &selector)
            .await
    }
}

/// 遗留对象与新规划 Job 的对应键：类别标签与节点标签
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct JobKey {
    category: Option<String>,
    node: Option<String>,
}

impl JobKey {
    fn of(spec: &JobSpec) -> Self {
        Self {
            category: Some(spec.category.to_string()),
            node: spec.node_name.clone(),
        }
    }

    fn from_labels(category: Option<&str>, node: Option<&str>) -> Self {
        Self {
            category: category.map(str::to_string),
            node: node.map(str::to_string),
        }
    }
}

#[derive(Clone)]
struct JobRunner {
    client: Arc<dyn ClusterClient>,
    settings: Arc<DispatchSettings>,
    task_name: String,
    deadline: DateTime<Utc>,
}

impl JobRunner {
    async fn run_job(&self, spec: &JobSpec) -> JobPhase {
        let namespace = &self.settings.namespace;

        if Utc::now() > self.deadline {
            warn!("任务 {} 已超时，跳过Job {}", self.task_name, spec.job_name);
            return JobPhase::Failed;
        }

        match self.client.get_config_artifact(namespace, &spec.job_name).await {
            Ok(Some(_)) => {
                info!("Job {} 的结果已存在，跳过创建", spec.job_name);
                return JobPhase::Succeeded;
            }
            Ok(None) => {}
            Err(e) => {
                error!("查询Job {} 的结果失败: {}", spec.job_name, e);
                return JobPhase::Failed;
            }
        }

        let template = build_job_template(&self.task_name, namespace, spec, &self.settings.job);
        match self.client.create_job(&template).await {
            Ok(()) => info!("Job {} 已创建", spec.job_name),
            Err(e) if e.is_already_exists() => info!("Job {} 已在运行，等待其完成", spec.job_name),
            Err(e) => {
                error!("创建Job {} 失败: {}", spec.job_name, e);
                return JobPhase::Failed;
            }
        }

        self.wait_for_completion(&spec.job_name).await
    }

    async fn wait_for_completion(&self, job_name: &str) -> JobPhase {
        let namespace = &self.settings.namespace;
        loop {
            match self.client.get_job(namespace, job_name).await {
                Ok(Some(state)) if state.is_complete() => {
                    info!("Job {} 已完成", job_name);
                    return JobPhase::Succeeded;
                }
                Ok(Some(state)) if state.is_failed() => {
                    warn!("Job {} 执行失败", job_name);
                    return JobPhase::Failed;
                }
                Ok(Some(_)) => debug!("等待Job {} 完成", job_name),
                Ok(None) => {
                    error!("Job {} 不存在", job_name);
                    return JobPhase::Failed;
                }
                Err(e) => {
                    error!("查询Job {} 状态失败: {}", job_name, e);
                    return JobPhase::Failed;
                }
            }

            if Utc::now() > self.deadline {
                warn!("Job {} 超时，删除该Job", job_name);
                if let Err(e) = self
                    .client
                    .delete_job(namespace, job_name, DeletePropagation::Background)
                    .await
                {
                    warn!("删除超时Job {} 失败: {}", job_name, e);
                }
                return JobPhase::Failed;
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_budget() {
        assert_eq!(concurrency_budget(3, 2, 5), 5);
        assert_eq!(concurrency_budget(50, 10, 5), 51);
        assert_eq!(concurrency_budget(0, 0, 5), 5);
        assert_eq!(concurrency_budget(7, 5, 5), 8);
        assert_eq!(concurrency_budget(7, 4, 5), 7);
        assert_eq!(concurrency_budget(2, 1, 1), 2);
    }
}
