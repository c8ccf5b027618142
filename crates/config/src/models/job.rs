use serde::{Deserialize, Serialize};

/// 巡检 Job 模板配置，作用于每一个下发的 Job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub image: String,
    pub image_pull_policy: String,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,
    pub cpu_limit: String,
    pub memory_limit: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            image: "kubespheredev/kubeeye-job:latest".to_string(),
            image_pull_policy: "IfNotPresent".to_string(),
            backoff_limit: 5,
            ttl_seconds_after_finished: 60,
            cpu_limit: "1000m".to_string(),
            memory_limit: "512Mi".to_string(),
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.image.is_empty() {
            return Err(anyhow::anyhow!("Job镜像不能为空"));
        }

        let valid_policies = ["Always", "IfNotPresent", "Never"];
        if !valid_policies.contains(&self.image_pull_policy.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的镜像拉取策略: {}，支持的策略: {:?}",
                self.image_pull_policy,
                valid_policies
            ));
        }

        if self.backoff_limit < 0 {
            return Err(anyhow::anyhow!("backoff_limit 不能为负数"));
        }

        if self.ttl_seconds_after_finished < 0 {
            return Err(anyhow::anyhow!("ttl_seconds_after_finished 不能为负数"));
        }

        Ok(())
    }
}
