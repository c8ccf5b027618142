use std::sync::Arc;

use tracing::{debug, info};

use inspector_config::EngineConfig;
use inspector_domain::{ClusterClient, ClusterRole, ClusterRoleBinding, ServiceAccount};
use inspector_errors::{InspectorError, InspectorResult};

/// 远端集群巡检前的初始化
///
/// 确保命名空间、ClusterRole、ClusterRoleBinding 与 ServiceAccount 存在，
/// 缺失时按本集群中的同名对象创建。
pub struct ClusterBootstrap {
    local: Arc<dyn ClusterClient>,
    namespace: String,
    role: String,
    role_binding: String,
    service_account: String,
}

impl ClusterBootstrap {
    pub fn new(local: Arc<dyn ClusterClient>, config: &EngineConfig) -> Self {
        Self {
            local,
            namespace: config.namespace.clone(),
            role: config.manager_role.clone(),
            role_binding: config.manager_role_binding.clone(),
            service_account: config.service_account.clone(),
        }
    }

    pub async fn ensure(&self, cluster: &str, remote: &dyn ClusterClient) -> InspectorResult<()> {
        self.ensure_namespace(remote)
            .await
            .map_err(|e| InspectorError::bootstrap(cluster, format!("命名空间: {e}")))?;
        self.ensure_role(remote)
            .await
            .map_err(|e| InspectorError::bootstrap(cluster, format!("ClusterRole: {e}")))?;
        self.ensure_role_binding(remote)
            .await
            .map_err(|e| InspectorError::bootstrap(cluster, format!("ClusterRoleBinding: {e}")))?;
        self.ensure_service_account(remote)
            .await
            .map_err(|e| InspectorError::bootstrap(cluster, format!("ServiceAccount: {e}")))?;
        info!("集群 {} 巡检环境初始化完成", cluster);
        Ok(())
    }

    async fn ensure_namespace(&self, remote: &dyn ClusterClient) -> InspectorResult<()> {
        if remote.namespace_exists(&self.namespace).await? {
            return Ok(());
        }
        debug!("创建命名空间 {}", self.namespace);
        ignore_exists(remote.create_namespace(&self.namespace).await)
    }

    async fn ensure_role(&self, remote: &dyn ClusterClient) -> InspectorResult<()> {
        if remote.get_cluster_role(&self.role).await?.is_some() {
            return Ok(());
        }
        let template = self
            .local
            .get_cluster_role(&self.role)
            .await?
            .ok_or_else(|| InspectorError::not_found("ClusterRole", &self.role))?;
        let role = ClusterRole {
            name: template.name,
            rules: template.rules,
        };
        debug!("创建ClusterRole {}", role.name);
        ignore_exists(remote.create_cluster_role(&role).await)
    }

    async fn ensure_role_binding(&self, remote: &dyn ClusterClient) -> InspectorResult<()> {
        if remote
            .get_cluster_role_binding(&self.role_binding)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let template = self
            .local
            .get_cluster_role_binding(&self.role_binding)
            .await?
            .ok_or_else(|| InspectorError::not_found("ClusterRoleBinding", &self.role_binding))?;
        let binding = ClusterRoleBinding {
            name: template.name,
            role_name: template.role_name,
            subjects: template.subjects,
        };
        debug!("创建ClusterRoleBinding {}", binding.name);
        ignore_exists(remote.create_cluster_role_binding(&binding).await)
    }

    async fn ensure_service_account(&self, remote: &dyn ClusterClient) -> InspectorResult<()> {
        if remote
            .get_service_account(&self.namespace, &self.service_account)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let template = self
            .local
            .get_service_account(&self.namespace, &self.service_account)
            .await?
            .ok_or_else(|| InspectorError::not_found("ServiceAccount", &self.service_account))?;
        let account = ServiceAccount {
            name: template.name,
            namespace: template.namespace,
        };
        debug!("创建ServiceAccount {}", account.name);
        ignore_exists(remote.create_service_account(&account).await)
    }
}

/// 并发初始化时可能已被其他执行创建
fn ignore_exists(result: InspectorResult<()>) -> InspectorResult<()> {
    match result {
        Err(e) if e.is_already_exists() => Ok(()),
        other => other,
    }
}
