use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::{
    ClusterRole, ClusterRoleBinding, ConfigArtifact, DeletePropagation, JobState, JobTemplate,
    JobSummary, Node, ObjectKind, ServerVersion, ServiceAccount,
};
use crate::InspectorResult;

/// 按标签精确匹配的选择器
pub type LabelSelector = BTreeMap<String, String>;

/// 单个集群的 API 能力面
///
/// `get_*` 在对象不存在时返回 `Ok(None)`，`create_*` 在对象已存在时返回
/// `InspectorError::AlreadyExists`。
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_nodes(&self) -> InspectorResult<Vec<Node>>;

    async fn get_job(&self, namespace: &str, name: &str) -> InspectorResult<Option<JobState>>;
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<Vec<JobSummary>>;
    async fn create_job(&self, job: &JobTemplate) -> InspectorResult<()>;
    async fn delete_job(
        &self,
        namespace: &str,
        name: &str,
        propagation: DeletePropagation,
    ) -> InspectorResult<()>;

    async fn create_config_artifact(&self, artifact: &ConfigArtifact) -> InspectorResult<()>;
    async fn get_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> InspectorResult<Option<ConfigArtifact>>;
    async fn delete_config_artifact(&self, namespace: &str, name: &str) -> InspectorResult<()>;
    async fn list_config_artifacts(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<Vec<ConfigArtifact>>;
    async fn delete_config_artifacts(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> InspectorResult<()>;

    async fn namespace_exists(&self, name: &str) -> InspectorResult<bool>;
    async fn create_namespace(&self, name: &str) -> InspectorResult<()>;
    async fn get_cluster_role(&self, name: &str) -> InspectorResult<Option<ClusterRole>>;
    async fn create_cluster_role(&self, role: &ClusterRole) -> InspectorResult<()>;
    async fn get_cluster_role_binding(
        &self,
        name: &str,
    ) -> InspectorResult<Option<ClusterRoleBinding>>;
    async fn create_cluster_role_binding(&self, binding: &ClusterRoleBinding)
        -> InspectorResult<()>;
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> InspectorResult<Option<ServiceAccount>>;
    async fn create_service_account(&self, account: &ServiceAccount) -> InspectorResult<()>;

    async fn server_version(&self) -> InspectorResult<ServerVersion>;
    async fn count_objects(&self, kind: ObjectKind) -> InspectorResult<usize>;
}

/// 按集群名解析客户端
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// 控制器自身所在的集群
    fn local(&self) -> Arc<dyn ClusterClient>;

    async fn client_for(&self, cluster: &str) -> InspectorResult<Arc<dyn ClusterClient>>;
}
