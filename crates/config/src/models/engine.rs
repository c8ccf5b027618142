use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 巡检编排引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 巡检 Job 及临时规则所在的命名空间
    pub namespace: String,
    /// 聚合报告文件的存储根目录
    pub result_path: String,
    /// 任务未指定或无法解析超时时间时使用的默认值
    pub default_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    /// 并发预算下限
    pub min_concurrency: usize,
    pub requeue_interval_seconds: u64,
    pub manager_role: String,
    pub manager_role_binding: String,
    pub service_account: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "kubeeye-system".to_string(),
            result_path: "/hosthome/kubeeye/result".to_string(),
            default_timeout_seconds: 600,
            poll_interval_seconds: 10,
            min_concurrency: 5,
            requeue_interval_seconds: 3,
            manager_role: "kubeeye-manager-role".to_string(),
            manager_role_binding: "kubeeye-manager-rolebinding".to_string(),
            service_account: "kubeeye-controller-manager".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_seconds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            return Err(anyhow::anyhow!("巡检命名空间不能为空"));
        }

        if self.result_path.is_empty() {
            return Err(anyhow::anyhow!("报告存储路径不能为空"));
        }

        if self.default_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("默认超时时间必须大于0"));
        }

        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("Job轮询间隔必须大于0"));
        }

        if self.min_concurrency == 0 {
            return Err(anyhow::anyhow!("最小并发数必须大于0"));
        }

        for (field, value) in [
            ("manager_role", &self.manager_role),
            ("manager_role_binding", &self.manager_role_binding),
            ("service_account", &self.service_account),
        ] {
            if value.is_empty() {
                return Err(anyhow::anyhow!("{field} 不能为空"));
            }
        }

        Ok(())
    }
}
