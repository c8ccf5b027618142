use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use inspector_domain::{CategoryItems, InspectTask, NodeTarget, Rule, RuleCategory, RuleSelector};
use inspector_errors::InspectorResult;

/// 合并去重后的规则项及各类别数量
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedRules {
    #[serde(skip)]
    pub items: BTreeMap<RuleCategory, CategoryItems>,
    pub totals: BTreeMap<RuleCategory, usize>,
}

impl MergedRules {
    pub fn get(&self, category: RuleCategory) -> Option<&CategoryItems> {
        self.items.get(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = RuleCategory> + '_ {
        self.items.keys().copied()
    }
}

pub struct RuleEngine;

impl RuleEngine {
    /// 解析任务引用的规则：选择、节点覆盖、默认 endpoint、合并去重
    pub fn build(available: &[Rule], task: &InspectTask) -> InspectorResult<MergedRules> {
        let mut selected = select_with_overrides(available, &task.spec.rule_names);
        if selected.len() < task.spec.rule_names.len() {
            warn!(
                "任务 {} 引用了 {} 条规则，找到 {} 条",
                task.name(),
                task.spec.rule_names.len(),
                selected.len()
            );
        }
        propagate_default_endpoint(&mut selected);
        let merged = merge_and_dedup(&selected)?;
        debug!("任务 {} 规则合并完成: {:?}", task.name(), merged.totals);
        Ok(merged)
    }
}

/// 按请求顺序选择规则，找不到的名称直接忽略
pub fn select_rules(available: &[Rule], requested: &[RuleSelector]) -> Vec<Rule> {
    requested
        .iter()
        .filter_map(|selector| find_rule(available, &selector.name).cloned())
        .collect()
}

fn find_rule<'a>(available: &'a [Rule], name: &str) -> Option<&'a Rule> {
    available.iter().find(|rule| rule.name() == name)
}

fn select_with_overrides(available: &[Rule], requested: &[RuleSelector]) -> Vec<Rule> {
    requested
        .iter()
        .filter_map(|selector| {
            let mut rule = find_rule(available, &selector.name)?.clone();
            apply_node_override(&mut rule, &selector.target);
            Some(rule)
        })
        .collect()
}

/// 将规则级的节点定位注入到未声明定位的规则项中，已声明定位的项保持不变
pub fn apply_node_override(rule: &mut Rule, target: &NodeTarget) {
    if target.is_unset() {
        return;
    }
    rule.spec.for_each_target_mut(|item_target| {
        if item_target.is_unset() {
            *item_target = target.clone();
        }
    });
}

/// prometheus 规则项未声明 endpoint 时使用规则的默认 endpoint
pub fn propagate_default_endpoint(rules: &mut [Rule]) {
    for rule in rules.iter_mut() {
        let Some(endpoint) = rule
            .spec
            .prometheus_endpoint
            .clone()
            .filter(|e| !e.is_empty())
        else {
            continue;
        };
        for item in rule.spec.prometheus.iter_mut() {
            if item.endpoint.as_deref().map_or(true, str::is_empty) {
                item.endpoint = Some(endpoint.clone());
            }
        }
    }
}

/// 按选择顺序拼接各规则的规则项后按名称去重
///
/// `component` 类别的数量固定为 1，表示始终执行的组件检查。
pub fn merge_and_dedup(rules: &[Rule]) -> InspectorResult<MergedRules> {
    let mut items: BTreeMap<RuleCategory, CategoryItems> = BTreeMap::new();
    for rule in rules {
        for category_items in rule.spec.category_items() {
            let category = category_items.category();
            items
                .entry(category)
                .or_insert_with(|| CategoryItems::empty(category))
                .append(category_items)?;
        }
    }

    let mut totals = BTreeMap::new();
    for (category, list) in items.iter_mut() {
        list.dedup_by_name();
        totals.insert(*category, list.len());
    }
    totals.insert(RuleCategory::Component, 1);

    Ok(MergedRules { items, totals })
}
