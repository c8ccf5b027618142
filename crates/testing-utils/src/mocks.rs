//! Mock implementations of the engine's ports
//!
//! All mocks keep their state behind `Arc<Mutex<..>>` so tests can clone a
//! handle, pass it to the code under test and inspect what happened afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use inspector_domain::constants::{
    LABEL_NODE_NAME, LABEL_RULE_GROUP, LABEL_RULE_TYPE, LABEL_TASK_NAME,
};
use inspector_domain::{
    ClusterClient, ClusterProvider, ClusterRole, ClusterRoleBinding, ConfigArtifact,
    DeletePropagation, InspectTask, JobState, JobSummary, JobTemplate, LabelSelector, Node,
    ObjectKind, Phase,
    Report, Rule, RuleCategory, ServerVersion, ServiceAccount, TaskNotifier, TaskStore,
};
use inspector_errors::{InspectorError, InspectorResult};

/// 模拟 Job 在集群中的运行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBehavior {
    /// 第 n 次读取状态时完成
    CompleteAfter(u32),
    /// 一直处于运行中
    Never,
    /// 重试耗尽失败
    Fail,
}

impl Default for JobBehavior {
    fn default() -> Self {
        JobBehavior::CompleteAfter(1)
    }
}

#[derive(Debug, Clone)]
struct MockJob {
    template: Option<JobTemplate>,
    behavior: JobBehavior,
    polls: u32,
    finished: bool,
    counted: bool,
}

#[derive(Default)]
struct ClusterState {
    nodes: Vec<Node>,
    jobs: HashMap<String, MockJob>,
    default_behavior: JobBehavior,
    category_behaviors: HashMap<RuleCategory, JobBehavior>,
    result_payloads: HashMap<RuleCategory, Vec<u8>>,
    artifacts: BTreeMap<String, ConfigArtifact>,
    created_jobs: Vec<JobTemplate>,
    deleted_jobs: Vec<(String, DeletePropagation)>,
    created_artifacts: Vec<String>,
    running_jobs: usize,
    peak_running_jobs: usize,
    fail_list_nodes: bool,
    fail_get_job: bool,
    namespaces: HashSet<String>,
    roles: HashMap<String, ClusterRole>,
    bindings: HashMap<String, ClusterRoleBinding>,
    service_accounts: HashMap<(String, String), ServiceAccount>,
    version: ServerVersion,
    namespace_count: usize,
}

/// 内存中的集群：Job 按预设行为推进，完成时写入结果片段
#[derive(Clone)]
pub struct MockClusterClient {
    state: Arc<Mutex<ClusterState>>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        let state = ClusterState {
            version: ServerVersion {
                major: "1".to_string(),
                minor: "28".to_string(),
                git_version: "v1.28.2".to_string(),
            },
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_nodes(self, names: &[&str]) -> Self {
        self.state.lock().unwrap().nodes = names.iter().map(|n| Node::new(*n)).collect();
        self
    }

    pub fn with_node(self, node: Node) -> Self {
        self.state.lock().unwrap().nodes.push(node);
        self
    }

    pub fn with_default_behavior(self, behavior: JobBehavior) -> Self {
        self.state.lock().unwrap().default_behavior = behavior;
        self
    }

    pub fn with_category_behavior(self, category: RuleCategory, behavior: JobBehavior) -> Self {
        self.state
            .lock()
            .unwrap()
            .category_behaviors
            .insert(category, behavior);
        self
    }

    /// 类别 Job 完成时写入的结果内容，默认策略检查为 `{}`，其余为 `[]`
    pub fn with_result_payload(self, category: RuleCategory, payload: serde_json::Value) -> Self {
        let data = serde_json::to_vec(&payload).unwrap();
        self.state
            .lock()
            .unwrap()
            .result_payloads
            .insert(category, data);
        self
    }

    /// 预先存在的 Job，模拟上一次执行遗留的对象
    pub fn with_existing_job(self, name: &str, behavior: JobBehavior) -> Self {
        self.state.lock().unwrap().jobs.insert(
            name.to_string(),
            MockJob {
                template: None,
                behavior,
                polls: 0,
                finished: false,
                counted: false,
            },
        );
        self
    }

    /// 上一次执行按模板创建、仍留在集群中的 Job，可按标签列出
    pub fn with_leftover_job(self, template: JobTemplate, behavior: JobBehavior) -> Self {
        self.state.lock().unwrap().jobs.insert(
            template.name.clone(),
            MockJob {
                template: Some(template),
                behavior,
                polls: 0,
                finished: false,
                counted: false,
            },
        );
        self
    }

    pub fn with_artifact(self, artifact: ConfigArtifact) -> Self {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .insert(artifact.name.clone(), artifact);
        self
    }

    pub fn with_namespace_count(self, count: usize) -> Self {
        self.state.lock().unwrap().namespace_count = count;
        self
    }

    pub fn with_cluster_role(self, role: ClusterRole) -> Self {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(role.name.clone(), role);
        self
    }

    pub fn with_cluster_role_binding(self, binding: ClusterRoleBinding) -> Self {
        self.state
            .lock()
            .unwrap()
            .bindings
            .insert(binding.name.clone(), binding);
        self
    }

    pub fn with_service_account(self, account: ServiceAccount) -> Self {
        self.state.lock().unwrap().service_accounts.insert(
            (account.namespace.clone(), account.name.clone()),
            account,
        );
        self
    }

    pub fn fail_list_nodes(&self) {
        self.state.lock().unwrap().fail_list_nodes = true;
    }

    pub fn fail_get_job(&self) {
        self.state.lock().unwrap().fail_get_job = true;
    }

    pub fn created_jobs(&self) -> Vec<JobTemplate> {
        self.state.lock().unwrap().created_jobs.clone()
    }

    pub fn create_job_count(&self) -> usize {
        self.state.lock().unwrap().created_jobs.len()
    }

    /// 同一时刻已创建且未结束的 Job 数量峰值
    pub fn peak_running_jobs(&self) -> usize {
        self.state.lock().unwrap().peak_running_jobs
    }

    pub fn deleted_jobs(&self) -> Vec<(String, DeletePropagation)> {
        self.state.lock().unwrap().deleted_jobs.clone()
    }

    pub fn created_artifacts(&self) -> Vec<String> {
        self.state.lock().unwrap().created_artifacts.clone()
    }

    pub fn artifact(&self, name: &str) -> Option<ConfigArtifact> {
        self.state.lock().unwrap().artifacts.get(name).cloned()
    }

    pub fn artifact_count(&self) -> usize {
        self.state.lock().unwrap().artifacts.len()
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains(name)
    }

    pub fn has_cluster_role(&self, name: &str) -> bool {
        self.state.lock().unwrap().roles.contains_key(name)
    }

    pub fn has_cluster_role_binding(&self, name: &str) -> bool {
        self.state.lock().unwrap().bindings.contains_key(name)
    }

    pub fn has_service_account(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .contains_key(&(namespace.to_string(), name.to_string()))
    }
}

impl Default for MockClusterClient {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(labels: &BTreeMap<String, String>, selector: &LabelSelector) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

fn result_fragment(state: &ClusterState, template: &JobTemplate) -> ConfigArtifact {
    let mut labels = BTreeMap::new();
    if let Some(task) = template.labels.get(LABEL_TASK_NAME) {
        labels.insert(LABEL_TASK_NAME.to_string(), task.clone());
    }
    labels.insert(
        LABEL_RULE_TYPE.to_string(),
        template.category.as_str().to_string(),
    );
    if let Some(node) = &template.node_name {
        labels.insert(LABEL_NODE_NAME.to_string(), node.clone());
    }
    let data = state
        .result_payloads
        .get(&template.category)
        .cloned()
        .unwrap_or_else(|| match template.category {
            RuleCategory::Opa => b"{}".to_vec(),
            _ => b"[]".to_vec(),
        });
    ConfigArtifact {
        name: template.name.clone(),
        namespace: template.namespace.clone(),
        labels,
        data,
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn list_nodes(&self) -> InspectorResult<Vec<Node>> {
        let state = self.state.lock().unwrap();
        if state.fail_list_nodes {
            return Err(InspectorError::cluster_api("list nodes failed"));
        }
        Ok(state.nodes.clone())
    }

    async fn get_job(&self, _namespace: &str, name: &str) -> InspectorResult<Option<JobState>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_get_job {
            return Err(InspectorError::cluster_api("get job failed"));
        }
        let Some(job) = state.jobs.get_mut(name) else {
            return Ok(None);
        };
        job.polls += 1;
        let job = job.clone();
        let tracked = job.counted && !job.finished;

        let job_state = match job.behavior {
            JobBehavior::CompleteAfter(n) if job.polls >= n => JobState {
                active: 0,
                succeeded: 1,
                failed: 0,
                completion_time: Some(Utc::now()),
            },
            JobBehavior::CompleteAfter(_) | JobBehavior::Never => JobState {
                active: 1,
                ..Default::default()
            },
            JobBehavior::Fail => JobState {
                active: 0,
                succeeded: 0,
                failed: 1,
                completion_time: None,
            },
        };

        if job_state.is_complete() || job_state.is_failed() {
            if let Some(entry) = state.jobs.get_mut(name) {
                entry.finished = true;
            }
            if tracked {
                state.running_jobs = state.running_jobs.saturating_sub(1);
            }
        }
        if job_state.is_complete() {
            if let Some(template) = &job.template {
                let fragment = result_fragment(&state, template);
                state.artifacts.insert(fragment.name.clone(), fragment);
            }
        }
        Ok(Some(job_state))
    }

    async fn list_jobs(
        &self,
        _namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<Vec<JobSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .filter_map(|(name, job)| {
                let labels = job.template.as_ref()?.labels.clone();
                matches(&labels, selector).then(|| JobSummary {
                    name: name.clone(),
                    labels,
                })
            })
            .collect())
    }

    async fn create_job(&self, job: &JobTemplate) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.jobs.contains_key(&job.name) {
            return Err(InspectorError::already_exists("Job", &job.name));
        }
        let behavior = state
            .category_behaviors
            .get(&job.category)
            .copied()
            .unwrap_or(state.default_behavior);
        state.jobs.insert(
            job.name.clone(),
            MockJob {
                template: Some(job.clone()),
                behavior,
                polls: 0,
                finished: false,
                counted: true,
            },
        );
        state.created_jobs.push(job.clone());
        state.running_jobs += 1;
        state.peak_running_jobs = state.peak_running_jobs.max(state.running_jobs);
        Ok(())
    }

    async fn delete_job(
        &self,
        _namespace: &str,
        name: &str,
        propagation: DeletePropagation,
    ) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.remove(name) {
            if job.counted && !job.finished {
                state.running_jobs = state.running_jobs.saturating_sub(1);
            }
        }
        state.deleted_jobs.push((name.to_string(), propagation));
        Ok(())
    }

    async fn create_config_artifact(&self, artifact: &ConfigArtifact) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.artifacts.contains_key(&artifact.name) {
            return Err(InspectorError::already_exists("ConfigMap", &artifact.name));
        }
        state
            .artifacts
            .insert(artifact.name.clone(), artifact.clone());
        state.created_artifacts.push(artifact.name.clone());
        Ok(())
    }

    async fn get_config_artifact(
        &self,
        _namespace: &str,
        name: &str,
    ) -> InspectorResult<Option<ConfigArtifact>> {
        Ok(self.state.lock().unwrap().artifacts.get(name).cloned())
    }

    async fn delete_config_artifact(&self, _namespace: &str, name: &str) -> InspectorResult<()> {
        self.state.lock().unwrap().artifacts.remove(name);
        Ok(())
    }

    async fn list_config_artifacts(
        &self,
        _namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<Vec<ConfigArtifact>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .artifacts
            .values()
            .filter(|a| matches(&a.labels, selector))
            .cloned()
            .collect())
    }

    async fn delete_config_artifacts(
        &self,
        _namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<()> {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .retain(|_, a| !matches(&a.labels, selector));
        Ok(())
    }

    async fn namespace_exists(&self, name: &str) -> InspectorResult<bool> {
        Ok(self.state.lock().unwrap().namespaces.contains(name))
    }

    async fn create_namespace(&self, name: &str) -> InspectorResult<()> {
        if !self.state.lock().unwrap().namespaces.insert(name.to_string()) {
            return Err(InspectorError::already_exists("Namespace", name));
        }
        Ok(())
    }

    async fn get_cluster_role(&self, name: &str) -> InspectorResult<Option<ClusterRole>> {
        Ok(self.state.lock().unwrap().roles.get(name).cloned())
    }

    async fn create_cluster_role(&self, role: &ClusterRole) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.roles.contains_key(&role.name) {
            return Err(InspectorError::already_exists("ClusterRole", &role.name));
        }
        state.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    async fn get_cluster_role_binding(
        &self,
        name: &str,
    ) -> InspectorResult<Option<ClusterRoleBinding>> {
        Ok(self.state.lock().unwrap().bindings.get(name).cloned())
    }

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.bindings.contains_key(&binding.name) {
            return Err(InspectorError::already_exists(
                "ClusterRoleBinding",
                &binding.name,
            ));
        }
        state.bindings.insert(binding.name.clone(), binding.clone());
        Ok(())
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> InspectorResult<Option<ServiceAccount>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .service_accounts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_service_account(&self, account: &ServiceAccount) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = (account.namespace.clone(), account.name.clone());
        if state.service_accounts.contains_key(&key) {
            return Err(InspectorError::already_exists(
                "ServiceAccount",
                &account.name,
            ));
        }
        state.service_accounts.insert(key, account.clone());
        Ok(())
    }

    async fn server_version(&self) -> InspectorResult<ServerVersion> {
        Ok(self.state.lock().unwrap().version.clone())
    }

    async fn count_objects(&self, kind: ObjectKind) -> InspectorResult<usize> {
        let state = self.state.lock().unwrap();
        Ok(match kind {
            ObjectKind::Nodes => state.nodes.len(),
            ObjectKind::Namespaces => state.namespace_count,
        })
    }
}

/// 本地集群加按名称注册的远端集群
#[derive(Clone)]
pub struct MockClusterProvider {
    local: MockClusterClient,
    clusters: Arc<Mutex<HashMap<String, MockClusterClient>>>,
}

impl MockClusterProvider {
    pub fn new(local: MockClusterClient) -> Self {
        Self {
            local,
            clusters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_cluster(self, name: &str, client: MockClusterClient) -> Self {
        self.clusters
            .lock()
            .unwrap()
            .insert(name.to_string(), client);
        self
    }

    pub fn local_mock(&self) -> &MockClusterClient {
        &self.local
    }

    pub fn cluster(&self, name: &str) -> Option<MockClusterClient> {
        self.clusters.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl ClusterProvider for MockClusterProvider {
    fn local(&self) -> Arc<dyn ClusterClient> {
        Arc::new(self.local.clone())
    }

    async fn client_for(&self, cluster: &str) -> InspectorResult<Arc<dyn ClusterClient>> {
        match self.clusters.lock().unwrap().get(cluster) {
            Some(client) => Ok(Arc::new(client.clone())),
            None => Err(InspectorError::cluster_api(format!(
                "unknown cluster {cluster}"
            ))),
        }
    }
}

#[derive(Default)]
struct StoreState {
    tasks: HashMap<String, InspectTask>,
    rules: Vec<Rule>,
    plan_statuses: Vec<(String, String, Phase)>,
    results: HashMap<String, Report>,
    status_updates: Vec<InspectTask>,
}

/// 内存中的任务、规则与结果记录
#[derive(Clone, Default)]
pub struct MockTaskStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: InspectTask) -> Self {
        self.state
            .lock()
            .unwrap()
            .tasks
            .insert(task.name().to_string(), task);
        self
    }

    pub fn with_rules(self, rules: Vec<Rule>) -> Self {
        self.state.lock().unwrap().rules.extend(rules);
        self
    }

    pub fn with_result(self, report: Report) -> Self {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(report.name().to_string(), report);
        self
    }

    pub fn task(&self, name: &str) -> Option<InspectTask> {
        self.state.lock().unwrap().tasks.get(name).cloned()
    }

    pub fn result(&self, name: &str) -> Option<Report> {
        self.state.lock().unwrap().results.get(name).cloned()
    }

    pub fn result_count(&self) -> usize {
        self.state.lock().unwrap().results.len()
    }

    pub fn remove_task(&self, name: &str) {
        self.state.lock().unwrap().tasks.remove(name);
    }

    pub fn plan_statuses(&self) -> Vec<(String, String, Phase)> {
        self.state.lock().unwrap().plan_statuses.clone()
    }

    pub fn status_updates(&self) -> Vec<InspectTask> {
        self.state.lock().unwrap().status_updates.clone()
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn get_task(&self, name: &str) -> InspectorResult<Option<InspectTask>> {
        Ok(self.state.lock().unwrap().tasks.get(name).cloned())
    }

    async fn update_task(&self, task: &InspectTask) -> InspectorResult<InspectTask> {
        let mut state = self.state.lock().unwrap();
        match state.tasks.get_mut(task.name()) {
            Some(stored) => {
                stored.metadata = task.metadata.clone();
                stored.spec = task.spec.clone();
                Ok(stored.clone())
            }
            None => Err(InspectorError::task_not_found(task.name())),
        }
    }

    async fn update_task_status(&self, task: &InspectTask) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.tasks.get_mut(task.name()) {
            Some(stored) => {
                stored.status = task.status.clone();
                state.status_updates.push(task.clone());
                Ok(())
            }
            None => Err(InspectorError::task_not_found(task.name())),
        }
    }

    async fn list_rules(&self, rule_group: Option<&str>) -> InspectorResult<Vec<Rule>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rules
            .iter()
            .filter(|r| match rule_group {
                Some(group) => r.metadata.label(LABEL_RULE_GROUP) == Some(group),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn update_plan_status(
        &self,
        plan: &str,
        task: &str,
        phase: Phase,
    ) -> InspectorResult<()> {
        self.state.lock().unwrap().plan_statuses.push((
            plan.to_string(),
            task.to_string(),
            phase,
        ));
        Ok(())
    }

    async fn create_result(&self, report: &Report) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.results.contains_key(report.name()) {
            return Err(InspectorError::already_exists("InspectResult", report.name()));
        }
        state
            .results
            .insert(report.name().to_string(), report.clone());
        Ok(())
    }

    async fn get_result(&self, name: &str) -> InspectorResult<Option<Report>> {
        Ok(self.state.lock().unwrap().results.get(name).cloned())
    }

    async fn update_result(&self, report: &Report) -> InspectorResult<Report> {
        let mut state = self.state.lock().unwrap();
        match state.results.get_mut(report.name()) {
            Some(stored) => {
                stored.metadata = report.metadata.clone();
                Ok(stored.clone())
            }
            None => Err(InspectorError::not_found("InspectResult", report.name())),
        }
    }

    async fn update_result_status(&self, report: &Report) -> InspectorResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.results.get_mut(report.name()) {
            Some(stored) => {
                stored.status = report.status.clone();
                Ok(())
            }
            None => Err(InspectorError::not_found("InspectResult", report.name())),
        }
    }
}

/// 记录被注销的任务名
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    unregistered: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.unregistered.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskNotifier for RecordingNotifier {
    async fn unregister(&self, task: &str) -> InspectorResult<()> {
        self.unregistered.lock().unwrap().push(task.to_string());
        Ok(())
    }
}
