use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use inspector_domain::constants::{
    ANNOTATION_END_TIME, ANNOTATION_INSPECT_CLUSTER, ANNOTATION_INSPECT_POLICY,
    ANNOTATION_START_TIME, LABEL_NODE_NAME, LABEL_RULE_TYPE, LABEL_TASK_NAME,
};
use inspector_domain::time::format_timestamp;
use inspector_domain::{
    ClusterClient, ConfigArtifact, InspectTask, JobOutcome, LabelSelector, ObjectMeta, Report,
    ReportSpec, RuleCategory, TaskStore,
};
use inspector_errors::InspectorResult;

use crate::extractor::ExtractorRegistry;
use crate::storage::ReportStorage;

/// `<集群>-<任务>-result`
pub fn report_name(cluster: &str, task: &str) -> String {
    format!("{cluster}-{task}-result")
}

fn task_selector(task_name: &str) -> LabelSelector {
    let mut selector = BTreeMap::new();
    selector.insert(LABEL_TASK_NAME.to_string(), task_name.to_string());
    selector
}

/// 把 Job 结果片段聚合为集群报告并持久化
pub struct ResultAggregator {
    store: Arc<dyn TaskStore>,
    storage: ReportStorage,
    registry: ExtractorRegistry,
    namespace: String,
}

impl ResultAggregator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        storage: ReportStorage,
        registry: ExtractorRegistry,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            registry,
            namespace: namespace.into(),
        }
    }

    pub fn storage(&self) -> &ReportStorage {
        &self.storage
    }

    /// 读取任务在该集群上产生的结果片段
    pub async fn collect_fragments(
        &self,
        client: &dyn ClusterClient,
        task_name: &str,
    ) -> InspectorResult<Vec<ConfigArtifact>> {
        client
            .list_config_artifacts(&self.namespace, &task_selector(task_name))
            .await
    }

    /// 合并成功 Job 的结果片段
    ///
    /// 片段按 Job 名匹配，类别与节点名取自片段的标签。无法识别的类别、缺少提取器
    /// 或内容无法解析的片段只记录警告。
    pub fn aggregate(
        &self,
        cluster: &str,
        task: &InspectTask,
        outcomes: &[JobOutcome],
        totals: &BTreeMap<RuleCategory, usize>,
        fragments: &[ConfigArtifact],
    ) -> Report {
        let now = Utc::now();
        let start = task.status.start_timestamp.unwrap_or(now);
        let end = task.status.end_timestamp.unwrap_or(now);

        let mut metadata = ObjectMeta::named(report_name(cluster, task.name()));
        metadata
            .labels
            .insert(LABEL_TASK_NAME.to_string(), task.name().to_string());
        for (key, value) in [
            (ANNOTATION_START_TIME, format_timestamp(&start)),
            (ANNOTATION_END_TIME, format_timestamp(&end)),
            (ANNOTATION_INSPECT_POLICY, task.spec.inspect_policy.to_string()),
            (ANNOTATION_INSPECT_CLUSTER, cluster.to_string()),
        ] {
            metadata.annotations.insert(key.to_string(), value);
        }

        let mut report = Report {
            metadata,
            spec: ReportSpec {
                inspect_rule_total: totals.clone(),
                ..Default::default()
            },
            status: Default::default(),
        };

        let by_name: HashMap<&str, &ConfigArtifact> =
            fragments.iter().map(|f| (f.name.as_str(), f)).collect();

        for outcome in outcomes.iter().filter(|o| o.is_succeeded()) {
            let Some(fragment) = by_name.get(outcome.job_name.as_str()) else {
                debug!("Job {} 没有结果片段", outcome.job_name);
                continue;
            };
            let Some(category) = fragment
                .label(LABEL_RULE_TYPE)
                .and_then(|t| t.parse::<RuleCategory>().ok())
            else {
                warn!(
                    "结果片段 {} 的类别无法识别: {:?}",
                    fragment.name,
                    fragment.label(LABEL_RULE_TYPE)
                );
                continue;
            };
            let Some(extractor) = self.registry.get(category) else {
                warn!("类别 {} 没有注册结果提取器", category);
                continue;
            };
            debug!("提取Job {} 的结果", outcome.job_name);
            if let Err(e) =
                extractor.extract(fragment.label(LABEL_NODE_NAME), &fragment.data, &mut report)
            {
                warn!("提取Job {} 的结果失败: {}", outcome.job_name, e);
            }
        }

        report
    }

    /// 写入报告文件，创建结果记录，最后删除任务的结果片段
    ///
    /// 结果记录已存在视为成功；无论记录是否创建成功，结果片段都会被删除。
    pub async fn persist(
        &self,
        report: &Report,
        task_name: &str,
        client: &dyn ClusterClient,
    ) -> InspectorResult<()> {
        let recorded = match self.storage.save(report).await {
            Ok(_) => match self.store.create_result(&report.record()).await {
                Err(e) if e.is_already_exists() => {
                    info!("结果记录 {} 已存在，沿用已有记录", report.name());
                    Ok(())
                }
                other => other,
            },
            Err(e) => Err(e),
        };
        client
            .delete_config_artifacts(&self.namespace, &task_selector(task_name))
            .await?;
        recorded?;
        counter!("inspector_reports_total").increment(1);
        info!("报告 {} 已生成", report.name());
        Ok(())
    }

    pub async fn aggregate_and_persist(
        &self,
        cluster: &str,
        task: &InspectTask,
        outcomes: &[JobOutcome],
        totals: &BTreeMap<RuleCategory, usize>,
        client: &dyn ClusterClient,
    ) -> InspectorResult<Report> {
        let fragments = self.collect_fragments(client, task.name()).await?;
        let report = self.aggregate(cluster, task, outcomes, totals, &fragments);
        self.persist(&report, task.name(), client).await?;
        Ok(report)
    }
}
