use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RuleCategory;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerVersion {
    pub major: String,
    pub minor: String,
    #[serde(default)]
    pub git_version: String,
}

impl ServerVersion {
    /// `major.minor`
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

/// 任务开始时记录的集群元数据快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub node_count: usize,
    #[serde(default)]
    pub namespace_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Nodes,
    Namespaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePropagation {
    Background,
    Foreground,
    Orphan,
}

/// 集群中实际创建的 Job 对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTemplate {
    pub name: String,
    pub namespace: String,
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub image: String,
    pub image_pull_policy: String,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,
    pub cpu_limit: String,
    pub memory_limit: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// 轮询时读取到的 Job 状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub completion_time: Option<DateTime<Utc>>,
}

impl JobState {
    /// 已记录完成时间且没有活跃的 Pod
    pub fn is_complete(&self) -> bool {
        self.completion_time.is_some() && self.active == 0
    }

    /// 重试耗尽：没有成功的 Pod 且不再有活跃的 Pod
    pub fn is_failed(&self) -> bool {
        self.completion_time.is_none() && self.active == 0 && self.succeeded == 0 && self.failed > 0
    }
}

/// 按标签列出的已存在 Job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl JobSummary {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// 以二进制数据保存内容的配置对象（规则分发、Job 结果片段）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigArtifact {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub data: Vec<u8>,
}

impl ConfigArtifact {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default)]
    pub api_groups: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterRole {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
    pub name: String,
    pub role_name: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
}
