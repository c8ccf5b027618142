use serde::{Deserialize, Serialize};

use crate::{JobPhase, RuleCategory};

/// 一个可下发的执行单元
///
/// `job_name` 在一次任务的单个集群内唯一，负载是规则项的 JSON 数组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub job_name: String,
    #[serde(rename = "ruleType")]
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(with = "json_payload")]
    pub run_rule: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job_name: String,
    pub category: RuleCategory,
    pub phase: JobPhase,
}

impl JobOutcome {
    pub fn succeeded(spec: &JobSpec) -> Self {
        Self {
            job_name: spec.job_name.clone(),
            category: spec.category,
            phase: JobPhase::Succeeded,
        }
    }

    pub fn failed(spec: &JobSpec) -> Self {
        Self {
            job_name: spec.job_name.clone(),
            category: spec.category,
            phase: JobPhase::Failed,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.phase == JobPhase::Succeeded
    }
}

/// 单个集群上某一类别的汇总结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutcome {
    pub cluster: String,
    pub category: RuleCategory,
    pub phase: JobPhase,
}

/// 负载在序列化时以内嵌 JSON 呈现，便于直接查看规则分发内容
mod json_payload {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(<S::Error as serde::ser::Error>::custom)?;
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        serde_json::to_vec(&value).map_err(serde::de::Error::custom)
    }
}
