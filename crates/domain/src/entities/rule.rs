use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use crate::{InspectorError, InspectorResult, Level, NodeTarget, RuleCategory};

/// 所有规则项共有的字段，`name` 在同一类别内唯一
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleItemBase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

impl RuleItemBase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConnectRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub target: NodeTarget,
}

/// sysctl 与 systemd 规则共用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(flatten)]
    pub target: NodeTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFilterRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub target: NodeTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCommandRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default)]
    pub command: String,
    #[serde(flatten)]
    pub target: NodeTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoRule {
    #[serde(flatten)]
    pub base: RuleItemBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    #[serde(flatten)]
    pub target: NodeTarget,
}

pub trait RuleItem {
    fn base(&self) -> &RuleItemBase;

    fn name(&self) -> &str {
        &self.base().name
    }
}

/// 需要落到具体节点上执行的规则项
pub trait NodeScopedItem: RuleItem + Clone {
    fn target(&self) -> &NodeTarget;
    fn target_mut(&mut self) -> &mut NodeTarget;
}

macro_rules! impl_rule_item {
    ($($ty:ty),* $(,)?) => {
        $(impl RuleItem for $ty {
            fn base(&self) -> &RuleItemBase {
                &self.base
            }
        })*
    };
}

macro_rules! impl_node_scoped {
    ($($ty:ty),* $(,)?) => {
        $(impl NodeScopedItem for $ty {
            fn target(&self) -> &NodeTarget {
                &self.target
            }
            fn target_mut(&mut self) -> &mut NodeTarget {
                &mut self.target
            }
        })*
    };
}

impl_rule_item!(
    OpaRule,
    PrometheusRule,
    ServiceConnectRule,
    FileChangeRule,
    SysRule,
    FileFilterRule,
    CustomCommandRule,
    NodeInfoRule,
);

impl_node_scoped!(
    FileChangeRule,
    SysRule,
    FileFilterRule,
    CustomCommandRule,
    NodeInfoRule
);

/// 按类别分组的规则项，每个变体携带自己的规则项类型
///
/// `Component` 携带的是需要排除的组件名列表，而不是检查项。
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryItems {
    Opa(Vec<OpaRule>),
    Prometheus(Vec<PrometheusRule>),
    ServiceConnect(Vec<ServiceConnectRule>),
    FileChange(Vec<FileChangeRule>),
    Sysctl(Vec<SysRule>),
    Systemd(Vec<SysRule>),
    FileFilter(Vec<FileFilterRule>),
    CustomCommand(Vec<CustomCommandRule>),
    NodeInfo(Vec<NodeInfoRule>),
    Component(Vec<String>),
}

/// 对每个变体展开同一段代码，`Component` 单独处理
macro_rules! each_items {
    ($value:expr, $items:ident => $body:expr, $excluded:ident => $component:expr) => {
        match $value {
            CategoryItems::Opa($items) => $body,
            CategoryItems::Prometheus($items) => $body,
            CategoryItems::ServiceConnect($items) => $body,
            CategoryItems::FileChange($items) => $body,
            CategoryItems::Sysctl($items) => $body,
            CategoryItems::Systemd($items) => $body,
            CategoryItems::FileFilter($items) => $body,
            CategoryItems::CustomCommand($items) => $body,
            CategoryItems::NodeInfo($items) => $body,
            CategoryItems::Component($excluded) => $component,
        }
    };
}

/// 线性扫描去重，保留首次出现的项
fn dedup_first_by<T>(items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|existing| key(existing) == key(&item)) {
            kept.push(item);
        }
    }
    kept
}

impl CategoryItems {
    pub fn empty(category: RuleCategory) -> Self {
        match category {
            RuleCategory::Opa => CategoryItems::Opa(Vec::new()),
            RuleCategory::Prometheus => CategoryItems::Prometheus(Vec::new()),
            RuleCategory::ServiceConnect => CategoryItems::ServiceConnect(Vec::new()),
            RuleCategory::FileChange => CategoryItems::FileChange(Vec::new()),
            RuleCategory::Sysctl => CategoryItems::Sysctl(Vec::new()),
            RuleCategory::Systemd => CategoryItems::Systemd(Vec::new()),
            RuleCategory::FileFilter => CategoryItems::FileFilter(Vec::new()),
            RuleCategory::CustomCommand => CategoryItems::CustomCommand(Vec::new()),
            RuleCategory::NodeInfo => CategoryItems::NodeInfo(Vec::new()),
            RuleCategory::Component => CategoryItems::Component(Vec::new()),
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self {
            CategoryItems::Opa(_) => RuleCategory::Opa,
            CategoryItems::Prometheus(_) => RuleCategory::Prometheus,
            CategoryItems::ServiceConnect(_) => RuleCategory::ServiceConnect,
            CategoryItems::FileChange(_) => RuleCategory::FileChange,
            CategoryItems::Sysctl(_) => RuleCategory::Sysctl,
            CategoryItems::Systemd(_) => RuleCategory::Systemd,
            CategoryItems::FileFilter(_) => RuleCategory::FileFilter,
            CategoryItems::CustomCommand(_) => RuleCategory::CustomCommand,
            CategoryItems::NodeInfo(_) => RuleCategory::NodeInfo,
            CategoryItems::Component(_) => RuleCategory::Component,
        }
    }

    pub fn len(&self) -> usize {
        each_items!(self, items => items.len(), excluded => excluded.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        each_items!(
            self,
            items => items.iter().map(|i| i.name().to_string()).collect(),
            excluded => excluded.clone()
        )
    }

    /// 追加同类别的规则项，保持原有顺序
    pub fn append(&mut self, other: CategoryItems) -> InspectorResult<()> {
        match (self, other) {
            (CategoryItems::Opa(a), CategoryItems::Opa(b)) => a.extend(b),
            (CategoryItems::Prometheus(a), CategoryItems::Prometheus(b)) => a.extend(b),
            (CategoryItems::ServiceConnect(a), CategoryItems::ServiceConnect(b)) => a.extend(b),
            (CategoryItems::FileChange(a), CategoryItems::FileChange(b)) => a.extend(b),
            (CategoryItems::Sysctl(a), CategoryItems::Sysctl(b)) => a.extend(b),
            (CategoryItems::Systemd(a), CategoryItems::Systemd(b)) => a.extend(b),
            (CategoryItems::FileFilter(a), CategoryItems::FileFilter(b)) => a.extend(b),
            (CategoryItems::CustomCommand(a), CategoryItems::CustomCommand(b)) => a.extend(b),
            (CategoryItems::NodeInfo(a), CategoryItems::NodeInfo(b)) => a.extend(b),
            (CategoryItems::Component(a), CategoryItems::Component(b)) => a.extend(b),
            (this, other) => {
                return Err(InspectorError::Internal(format!(
                    "无法合并不同类别的规则项: {} <- {}",
                    this.category(),
                    other.category()
                )))
            }
        }
        Ok(())
    }

    /// 按名称去重，同名项保留首次出现的那一个
    pub fn dedup_by_name(&mut self) {
        each_items!(
            self,
            items => *items = dedup_first_by(std::mem::take(items), |i| i.name()),
            excluded => *excluded = dedup_first_by(std::mem::take(excluded), |s| s.as_str())
        )
    }

    /// 序列化为 Job 负载（JSON 数组）
    pub fn to_payload(&self) -> InspectorResult<Vec<u8>> {
        let bytes = each_items!(
            self,
            items => serde_json::to_vec(items)?,
            excluded => serde_json::to_vec(excluded)?
        );
        Ok(bytes)
    }

    pub fn from_payload(category: RuleCategory, payload: &[u8]) -> InspectorResult<Self> {
        let items = match category {
            RuleCategory::Opa => CategoryItems::Opa(serde_json::from_slice(payload)?),
            RuleCategory::Prometheus => CategoryItems::Prometheus(serde_json::from_slice(payload)?),
            RuleCategory::ServiceConnect => {
                CategoryItems::ServiceConnect(serde_json::from_slice(payload)?)
            }
            RuleCategory::FileChange => CategoryItems::FileChange(serde_json::from_slice(payload)?),
            RuleCategory::Sysctl => CategoryItems::Sysctl(serde_json::from_slice(payload)?),
            RuleCategory::Systemd => CategoryItems::Systemd(serde_json::from_slice(payload)?),
            RuleCategory::FileFilter => CategoryItems::FileFilter(serde_json::from_slice(payload)?),
            RuleCategory::CustomCommand => {
                CategoryItems::CustomCommand(serde_json::from_slice(payload)?)
            }
            RuleCategory::NodeInfo => CategoryItems::NodeInfo(serde_json::from_slice(payload)?),
            RuleCategory::Component => CategoryItems::Component(serde_json::from_slice(payload)?),
        };
        Ok(items)
    }
}

/// 规则定义中的各类别规则项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opas: Vec<OpaRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prometheus: Vec<PrometheusRule>,
    /// 未声明 endpoint 的 prometheus 规则项使用该默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_connect: Vec<ServiceConnectRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_change: Vec<FileChangeRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sysctl: Vec<SysRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub systemd: Vec<SysRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_filter: Vec<FileFilterRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_command: Vec<CustomCommandRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_info: Vec<NodeInfoRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_exclude: Vec<String>,
}

impl RuleSpec {
    /// 转换为按类别分组的规则项，空类别不会出现在结果中
    pub fn category_items(&self) -> Vec<CategoryItems> {
        let all = [
            CategoryItems::Opa(self.opas.clone()),
            CategoryItems::Prometheus(self.prometheus.clone()),
            CategoryItems::ServiceConnect(self.service_connect.clone()),
            CategoryItems::FileChange(self.file_change.clone()),
            CategoryItems::Sysctl(self.sysctl.clone()),
            CategoryItems::Systemd(self.systemd.clone()),
            CategoryItems::FileFilter(self.file_filter.clone()),
            CategoryItems::CustomCommand(self.custom_command.clone()),
            CategoryItems::NodeInfo(self.node_info.clone()),
            CategoryItems::Component(self.component_exclude.clone()),
        ];
        all.into_iter().filter(|items| !items.is_empty()).collect()
    }

    /// 对所有节点级规则项的定位字段执行同一操作
    pub fn for_each_target_mut(&mut self, mut f: impl FnMut(&mut NodeTarget)) {
        self.file_change.iter_mut().for_each(|i| f(&mut i.target));
        self.sysctl.iter_mut().for_each(|i| f(&mut i.target));
        self.systemd.iter_mut().for_each(|i| f(&mut i.target));
        self.file_filter.iter_mut().for_each(|i| f(&mut i.target));
        self.custom_command.iter_mut().for_each(|i| f(&mut i.target));
        self.node_info.iter_mut().for_each(|i| f(&mut i.target));
    }
}

/// 巡检规则，按名称被任务引用，读取后在一次执行中不再变化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub spec: RuleSpec,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sysctl(name: &str) -> SysRule {
        SysRule {
            base: RuleItemBase::named(name),
            target: NodeTarget::default(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = sysctl("net.ipv4.ip_forward");
        first.base.desc = Some("first".to_string());
        let mut second = sysctl("net.ipv4.ip_forward");
        second.base.desc = Some("second".to_string());

        let mut items = CategoryItems::Sysctl(vec![first, sysctl("vm.swappiness"), second]);
        items.dedup_by_name();

        assert_eq!(items.names(), vec!["net.ipv4.ip_forward", "vm.swappiness"]);
        match items {
            CategoryItems::Sysctl(list) => assert_eq!(list[0].base.desc.as_deref(), Some("first")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_append_rejects_mismatched_category() {
        let mut items = CategoryItems::Sysctl(vec![sysctl("a")]);
        assert!(items.append(CategoryItems::Systemd(vec![sysctl("b")])).is_err());
        assert!(items.append(CategoryItems::Sysctl(vec![sysctl("b")])).is_ok());
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_payload_roundtrip_keeps_targeting() {
        let mut item = sysctl("kernel.pid_max");
        item.target = NodeTarget::node("node-1");
        let items = CategoryItems::Sysctl(vec![item]);

        let payload = items.to_payload().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(json[0]["name"], "kernel.pid_max");
        assert_eq!(json[0]["nodeName"], "node-1");

        let decoded = CategoryItems::from_payload(RuleCategory::Sysctl, &payload).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_rule_spec_category_items_skips_empty() {
        let spec: RuleSpec = serde_json::from_value(serde_json::json!({
            "opas": [{"name": "privileged", "module": "package kubeeye"}],
            "sysctl": [{"name": "a", "nodeSelector": {"zone": "a"}}],
            "componentExclude": ["coredns"]
        }))
        .unwrap();

        let categories: Vec<_> = spec
            .category_items()
            .iter()
            .map(CategoryItems::category)
            .collect();
        assert_eq!(
            categories,
            vec![
                RuleCategory::Opa,
                RuleCategory::Sysctl,
                RuleCategory::Component
            ]
        );
        assert!(spec.sysctl[0].target.has_selector());
    }
}
