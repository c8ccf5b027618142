use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::InspectorError;

/// 巡检规则类别
///
/// 序列化名称与 Job 参数、`rule-type` 标签值一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Opa,
    Prometheus,
    #[serde(rename = "serviceconnect")]
    ServiceConnect,
    #[serde(rename = "filechange")]
    FileChange,
    Sysctl,
    Systemd,
    #[serde(rename = "filefilter")]
    FileFilter,
    #[serde(rename = "customcommand")]
    CustomCommand,
    #[serde(rename = "nodeinfo")]
    NodeInfo,
    Component,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 10] = [
        RuleCategory::Opa,
        RuleCategory::Prometheus,
        RuleCategory::ServiceConnect,
        RuleCategory::FileChange,
        RuleCategory::Sysctl,
        RuleCategory::Systemd,
        RuleCategory::FileFilter,
        RuleCategory::CustomCommand,
        RuleCategory::NodeInfo,
        RuleCategory::Component,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Opa => "opa",
            RuleCategory::Prometheus => "prometheus",
            RuleCategory::ServiceConnect => "serviceconnect",
            RuleCategory::FileChange => "filechange",
            RuleCategory::Sysctl => "sysctl",
            RuleCategory::Systemd => "systemd",
            RuleCategory::FileFilter => "filefilter",
            RuleCategory::CustomCommand => "customcommand",
            RuleCategory::NodeInfo => "nodeinfo",
            RuleCategory::Component => "component",
        }
    }

    /// 集群级类别只生成一个 Job，不按节点拆分
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            RuleCategory::Opa
                | RuleCategory::Prometheus
                | RuleCategory::ServiceConnect
                | RuleCategory::Component
        )
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = InspectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| InspectorError::config_error(format!("未知的规则类别: {s}")))
    }
}

/// 检查结果的严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "danger")]
    Danger,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "ignore")]
    Ignore,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Danger => f.write_str("danger"),
            Level::Warning => f.write_str("warning"),
            Level::Ignore => f.write_str("ignore"),
        }
    }
}

/// 规则项的节点定位：显式节点名或节点标签选择器
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
}

impl NodeTarget {
    pub fn node(name: impl Into<String>) -> Self {
        Self {
            node_name: Some(name.into()),
            node_selector: None,
        }
    }

    pub fn selector<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            node_name: None,
            node_selector: Some(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// 既没有节点名也没有选择器
    pub fn is_unset(&self) -> bool {
        self.node_name.as_deref().is_none_or(str::is_empty)
            && self.node_selector.as_ref().is_none_or(BTreeMap::is_empty)
    }

    pub fn has_node_name(&self) -> bool {
        self.node_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn has_selector(&self) -> bool {
        self.node_selector.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// 选择器中的每一个键值对都必须在节点标签中出现
    pub fn selector_matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match &self.node_selector {
            Some(selector) if !selector.is_empty() => selector
                .iter()
                .all(|(key, value)| labels.get(key) == Some(value)),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// 单个 Job 的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    Succeeded,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Succeeded => "Succeeded",
            JobPhase::Failed => "Failed",
        }
    }
}

impl From<JobPhase> for Phase {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Succeeded => Phase::Succeeded,
            JobPhase::Failed => Phase::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectPolicy {
    #[default]
    Single,
    Cycle,
}

impl fmt::Display for InspectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectPolicy::Single => f.write_str("single"),
            InspectPolicy::Cycle => f.write_str("cycle"),
        }
    }
}
