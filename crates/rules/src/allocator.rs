use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use tracing::debug;

use inspector_domain::{CategoryItems, JobSpec, Node, NodeScopedItem, RuleCategory};
use inspector_errors::InspectorResult;

use crate::engine::MergedRules;

const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const SUFFIX_LEN: usize = 5;

/// 把合并后的规则项划分为 Job 规格
///
/// 集群级类别各生成一个 Job；节点级类别按节点分桶，每个非空桶一个 Job，
/// 未声明定位的规则项整体广播到每个节点。
pub struct JobAllocator {
    task_name: String,
    used_names: HashSet<String>,
}

impl JobAllocator {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            used_names: HashSet::new(),
        }
    }

    pub fn partition(&mut self, merged: &MergedRules, nodes: &[Node]) -> InspectorResult<Vec<JobSpec>> {
        let mut jobs = Vec::new();

        for (category, items) in &merged.items {
            if *category == RuleCategory::Component {
                continue;
            }
            let mut category_jobs = match items {
                CategoryItems::FileChange(list) => {
                    self.node_jobs(list, nodes, CategoryItems::FileChange)?
                }
                CategoryItems::Sysctl(list) => self.node_jobs(list, nodes, CategoryItems::Sysctl)?,
                CategoryItems::Systemd(list) => {
                    self.node_jobs(list, nodes, CategoryItems::Systemd)?
                }
                CategoryItems::FileFilter(list) => {
                    self.node_jobs(list, nodes, CategoryItems::FileFilter)?
                }
                CategoryItems::CustomCommand(list) => {
                    self.node_jobs(list, nodes, CategoryItems::CustomCommand)?
                }
                CategoryItems::NodeInfo(list) => {
                    self.node_jobs(list, nodes, CategoryItems::NodeInfo)?
                }
                CategoryItems::Opa(_)
                | CategoryItems::Prometheus(_)
                | CategoryItems::ServiceConnect(_)
                | CategoryItems::Component(_) => {
                    if items.is_empty() {
                        Vec::new()
                    } else {
                        vec![self.job(items, None)?]
                    }
                }
            };
            debug!("类别 {} 生成 {} 个Job", category, category_jobs.len());
            jobs.append(&mut category_jobs);
        }

        // component 总是生成一个 Job，排除列表可以为空
        let component = merged
            .get(RuleCategory::Component)
            .cloned()
            .unwrap_or_else(|| CategoryItems::empty(RuleCategory::Component));
        jobs.push(self.job(&component, None)?);

        Ok(jobs)
    }

    fn node_jobs<T: NodeScopedItem>(
        &mut self,
        items: &[T],
        nodes: &[Node],
        wrap: fn(Vec<T>) -> CategoryItems,
    ) -> InspectorResult<Vec<JobSpec>> {
        let (buckets, broadcast) = bucket_by_node(items, nodes);
        let mut jobs = Vec::with_capacity(buckets.len() + nodes.len());

        for (node, bucket) in buckets {
            jobs.push(self.job(&wrap(bucket), Some(node))?);
        }

        if !broadcast.is_empty() {
            for node in nodes {
                let annotated = broadcast
                    .iter()
                    .cloned()
                    .map(|mut item| {
                        item.target_mut().node_name = Some(node.name.clone());
                        item
                    })
                    .collect();
                jobs.push(self.job(&wrap(annotated), Some(node.name.clone()))?);
            }
        }

        Ok(jobs)
    }

    fn job(&mut self, items: &CategoryItems, node_name: Option<String>) -> InspectorResult<JobSpec> {
        let category = items.category();
        Ok(JobSpec {
            job_name: self.unique_name(category),
            category,
            node_name,
            run_rule: items.to_payload()?,
        })
    }

    /// `<task>-<category>-<5位随机后缀>`，同一个分配器内不会重复
    fn unique_name(&mut self, category: RuleCategory) -> String {
        loop {
            let name = format!("{}-{}-{}", self.task_name, category, random_suffix());
            if self.used_names.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// 有节点名的项进入该节点的桶；有选择器的项复制到每个匹配节点的桶中并写入节点名；
/// 两者都没有的项作为广播项返回
fn bucket_by_node<T: NodeScopedItem>(
    items: &[T],
    nodes: &[Node],
) -> (BTreeMap<String, Vec<T>>, Vec<T>) {
    let mut buckets: BTreeMap<String, Vec<T>> = BTreeMap::new();
    let mut broadcast = Vec::new();

    for item in items {
        let target = item.target();
        if let Some(node_name) = target.node_name.as_ref().filter(|n| !n.is_empty()) {
            buckets
                .entry(node_name.clone())
                .or_default()
                .push(item.clone());
        } else if target.has_selector() {
            for node in nodes.iter().filter(|n| target.selector_matches(&n.labels)) {
                let mut copy = item.clone();
                copy.target_mut().node_name = Some(node.name.clone());
                buckets.entry(node.name.clone()).or_default().push(copy);
            }
        } else {
            broadcast.push(item.clone());
        }
    }

    (buckets, broadcast)
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// 策略类 Job 移到列表末尾，其余 Job 保持原有顺序
pub fn sort_policy_last(jobs: &mut [JobSpec]) {
    jobs.sort_by_key(|job| job.category == RuleCategory::Opa);
}
