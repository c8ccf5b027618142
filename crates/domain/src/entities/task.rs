use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cluster::ClusterInfo;
use super::job::{CategoryOutcome, JobOutcome};
use super::meta::ObjectMeta;
use crate::constants::{DEFAULT_CLUSTER, LABEL_PLAN_NAME, LABEL_RULE_GROUP};
use crate::time::parse_timeout;
use crate::{InspectPolicy, NodeTarget, Phase};

/// 任务引用的规则名，可附带节点定位覆盖
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSelector {
    pub name: String,
    #[serde(flatten)]
    pub target: NodeTarget,
}

impl RuleSelector {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: NodeTarget::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default)]
    pub rule_names: Vec<RuleSelector>,
    #[serde(default)]
    pub cluster_names: Vec<String>,
    /// 形如 `10m`、`1h30m` 的超时时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default)]
    pub inspect_policy: InspectPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_phases: Vec<JobOutcome>,
    #[serde(default)]
    pub category_outcomes: Vec<CategoryOutcome>,
    #[serde(default)]
    pub completed_category_count: usize,
    #[serde(default)]
    pub cluster_info: ClusterInfo,
}

/// 一次巡检执行的定义与实时状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectTask {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskSpec,
    #[serde(default)]
    pub status: TaskStatus,
}

impl InspectTask {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn timeout(&self, default: Duration) -> Duration {
        parse_timeout(self.spec.timeout.as_deref(), default)
    }

    /// 截止时间 = 创建时间 + 超时；没有创建时间时视为没有截止时间
    pub fn deadline(&self, default: Duration) -> Option<DateTime<Utc>> {
        let created = self.metadata.creation_timestamp?;
        let timeout = chrono::Duration::from_std(self.timeout(default)).ok()?;
        created.checked_add_signed(timeout)
    }

    /// 从开始执行算起是否已经超时
    pub fn is_timed_out(&self, now: DateTime<Utc>, default: Duration) -> bool {
        let Some(start) = self.status.start_timestamp else {
            return false;
        };
        match chrono::Duration::from_std(self.timeout(default)) {
            Ok(timeout) => now - start > timeout,
            Err(_) => false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.status.start_timestamp.is_some()
    }

    /// 目标集群列表，未指定时只有隐式的 `default`
    pub fn target_clusters(&self) -> Vec<String> {
        if self.spec.cluster_names.is_empty() {
            vec![DEFAULT_CLUSTER.to_string()]
        } else {
            self.spec.cluster_names.clone()
        }
    }

    pub fn rule_group(&self) -> Option<&str> {
        self.metadata.label(LABEL_RULE_GROUP)
    }

    pub fn plan_name(&self) -> Option<&str> {
        self.metadata.label(LABEL_PLAN_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(timeout: Option<&str>) -> InspectTask {
        let mut task = InspectTask::default();
        task.metadata.name = "nightly".to_string();
        task.metadata.creation_timestamp = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        task.spec.timeout = timeout.map(str::to_string);
        task
    }

    #[test]
    fn test_deadline_uses_parsed_timeout() {
        let default = Duration::from_secs(600);
        let deadline = task(Some("1h")).deadline(default).unwrap();
        assert_eq!(deadline, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());

        let deadline = task(Some("bogus")).deadline(default).unwrap();
        assert_eq!(deadline, Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap());
    }

    #[test]
    fn test_timed_out_measured_from_start() {
        let default = Duration::from_secs(600);
        let mut task = task(Some("5m"));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        assert!(!task.is_timed_out(now, default));

        task.status.start_timestamp = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 20, 0).unwrap());
        assert!(task.is_timed_out(now, default));

        task.status.start_timestamp = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 28, 0).unwrap());
        assert!(!task.is_timed_out(now, default));
    }

    #[test]
    fn test_target_clusters_default() {
        let mut task = task(None);
        assert_eq!(task.target_clusters(), vec!["default".to_string()]);
        task.spec.cluster_names = vec!["east".to_string(), "west".to_string()];
        assert_eq!(task.target_clusters().len(), 2);
    }

    #[test]
    fn test_rule_selector_deserializes_override() {
        let selector: RuleSelector = serde_json::from_value(serde_json::json!({
            "name": "baseline",
            "nodeSelector": {"zone": "a"}
        }))
        .unwrap();
        assert_eq!(selector.name, "baseline");
        assert!(selector.target.has_selector());
        assert!(!selector.target.has_node_name());
    }
}
