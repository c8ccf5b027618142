use std::collections::BTreeMap;

use inspector_config::JobConfig;
use inspector_domain::constants::{LABEL_NODE_NAME, LABEL_RULE_TYPE, LABEL_TASK_NAME};
use inspector_domain::{JobSpec, JobTemplate};

/// 根据 Job 规格与模板配置生成集群中实际创建的 Job
pub fn build_job_template(
    task_name: &str,
    namespace: &str,
    spec: &JobSpec,
    config: &JobConfig,
) -> JobTemplate {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_TASK_NAME.to_string(), task_name.to_string());
    labels.insert(LABEL_RULE_TYPE.to_string(), spec.category.to_string());
    if let Some(node) = &spec.node_name {
        labels.insert(LABEL_NODE_NAME.to_string(), node.clone());
    }

    JobTemplate {
        name: spec.job_name.clone(),
        namespace: namespace.to_string(),
        category: spec.category,
        node_name: spec.node_name.clone(),
        image: config.image.clone(),
        image_pull_policy: config.image_pull_policy.clone(),
        backoff_limit: config.backoff_limit,
        ttl_seconds_after_finished: config.ttl_seconds_after_finished,
        cpu_limit: config.cpu_limit.clone(),
        memory_limit: config.memory_limit.clone(),
        labels,
        args: vec![
            "inspect".to_string(),
            spec.category.to_string(),
            "--task-name".to_string(),
            task_name.to_string(),
            "--job-name".to_string(),
            spec.job_name.clone(),
        ],
    }
}
