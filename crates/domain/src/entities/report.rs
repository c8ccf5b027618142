use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use crate::{InspectPolicy, Level, RuleCategory};

/// 单条检查结果
///
/// `assert` 为 true 表示该检查命中了问题，只有命中的结果参与级别统计。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub assert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// 策略检查的预统计结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaResult {
    #[serde(default)]
    pub dangerous: usize,
    #[serde(default)]
    pub warning: usize,
    #[serde(default)]
    pub ignore: usize,
    #[serde(default)]
    pub resources: Vec<ResultItem>,
}

impl OpaResult {
    pub fn merge(&mut self, other: OpaResult) {
        self.dangerous += other.dangerous;
        self.warning += other.warning;
        self.ignore += other.ignore;
        self.resources.extend(other.resources);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpec {
    #[serde(default)]
    pub inspect_rule_total: BTreeMap<RuleCategory, usize>,
    #[serde(default)]
    pub opa_result: OpaResult,
    /// 各类别的结果片段，策略类别的结果记录在 `opa_result` 中
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub results: BTreeMap<RuleCategory, Vec<ResultItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatus {
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub policy: InspectPolicy,
    #[serde(default)]
    pub task_start_time: String,
    #[serde(default)]
    pub task_end_time: String,
    #[serde(default)]
    pub level: BTreeMap<Level, usize>,
}

/// 单个集群的巡检聚合报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ReportSpec,
    #[serde(default)]
    pub status: ReportStatus,
}

impl Report {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// 对外可见的结果记录只携带元数据与统计，不包含结果片段
    pub fn record(&self) -> Report {
        Report {
            metadata: self.metadata.clone(),
            spec: ReportSpec {
                inspect_rule_total: self.spec.inspect_rule_total.clone(),
                ..Default::default()
            },
            status: self.status.clone(),
        }
    }

    pub fn fragments(&self, category: RuleCategory) -> &[ResultItem] {
        self.spec
            .results
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
