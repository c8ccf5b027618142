//! Test data builders for creating test entities
//!
//! Builders start from sensible defaults and expose `with_*` methods for
//! the fields a test cares about.

use chrono::{DateTime, Utc};

use inspector_domain::constants::{LABEL_PLAN_NAME, LABEL_RULE_GROUP};
use inspector_domain::{
    FileChangeRule, InspectPolicy, InspectTask, NodeInfoRule, NodeTarget, ObjectMeta, OpaRule,
    Phase, PrometheusRule, Rule, RuleItemBase, RuleSelector, SysRule,
};

/// Builder for creating test InspectTask entities
pub struct TaskBuilder {
    task: InspectTask,
}

impl TaskBuilder {
    pub fn new(name: &str) -> Self {
        let mut metadata = ObjectMeta::named(name);
        metadata.creation_timestamp = Some(Utc::now());
        Self {
            task: InspectTask {
                metadata,
                ..Default::default()
            },
        }
    }

    pub fn with_rule(mut self, name: &str) -> Self {
        self.task.spec.rule_names.push(RuleSelector::named(name));
        self
    }

    pub fn with_rule_override(mut self, name: &str, target: NodeTarget) -> Self {
        self.task.spec.rule_names.push(RuleSelector {
            name: name.to_string(),
            target,
        });
        self
    }

    pub fn with_clusters(mut self, clusters: &[&str]) -> Self {
        self.task.spec.cluster_names = clusters.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.task.spec.timeout = Some(timeout.to_string());
        self
    }

    pub fn with_policy(mut self, policy: InspectPolicy) -> Self {
        self.task.spec.inspect_policy = policy;
        self
    }

    pub fn with_plan(mut self, plan: &str) -> Self {
        self.task
            .metadata
            .labels
            .insert(LABEL_PLAN_NAME.to_string(), plan.to_string());
        self
    }

    pub fn with_rule_group(mut self, group: &str) -> Self {
        self.task
            .metadata
            .labels
            .insert(LABEL_RULE_GROUP.to_string(), group.to_string());
        self
    }

    pub fn with_created_at(mut self, created: DateTime<Utc>) -> Self {
        self.task.metadata.creation_timestamp = Some(created);
        self
    }

    pub fn with_finalizer(mut self, finalizer: &str) -> Self {
        self.task.metadata.add_finalizer(finalizer);
        self
    }

    pub fn deleting(mut self) -> Self {
        self.task.metadata.deletion_timestamp = Some(Utc::now());
        self
    }

    /// 已开始执行，处于给定阶段
    pub fn started(mut self, started: DateTime<Utc>, phase: Phase) -> Self {
        self.task.status.start_timestamp = Some(started);
        self.task.status.phase = phase;
        self
    }

    pub fn build(self) -> InspectTask {
        self.task
    }
}

/// Builder for creating test Rule entities
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            rule: Rule {
                metadata: ObjectMeta::named(name),
                ..Default::default()
            },
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.rule
            .metadata
            .labels
            .insert(LABEL_RULE_GROUP.to_string(), group.to_string());
        self
    }

    pub fn with_opa(mut self, name: &str) -> Self {
        self.rule.spec.opas.push(OpaRule {
            base: RuleItemBase::named(name),
            ..Default::default()
        });
        self
    }

    pub fn with_prometheus(mut self, name: &str, endpoint: Option<&str>) -> Self {
        self.rule.spec.prometheus.push(PrometheusRule {
            base: RuleItemBase::named(name),
            endpoint: endpoint.map(str::to_string),
        });
        self
    }

    pub fn with_prometheus_endpoint(mut self, endpoint: &str) -> Self {
        self.rule.spec.prometheus_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_sysctl(mut self, name: &str, target: NodeTarget) -> Self {
        self.rule.spec.sysctl.push(sys_rule(name, target));
        self
    }

    pub fn with_systemd(mut self, name: &str, target: NodeTarget) -> Self {
        self.rule.spec.systemd.push(sys_rule(name, target));
        self
    }

    pub fn with_file_change(mut self, name: &str, path: &str, target: NodeTarget) -> Self {
        self.rule.spec.file_change.push(FileChangeRule {
            base: RuleItemBase::named(name),
            path: path.to_string(),
            target,
        });
        self
    }

    pub fn with_node_info(mut self, name: &str, target: NodeTarget) -> Self {
        self.rule.spec.node_info.push(NodeInfoRule {
            base: RuleItemBase::named(name),
            target,
            ..Default::default()
        });
        self
    }

    pub fn with_component_exclude(mut self, component: &str) -> Self {
        self.rule
            .spec
            .component_exclude
            .push(component.to_string());
        self
    }

    pub fn build(self) -> Rule {
        self.rule
    }
}

fn sys_rule(name: &str, target: NodeTarget) -> SysRule {
    SysRule {
        base: RuleItemBase::named(name),
        target,
    }
}
