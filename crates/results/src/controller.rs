use std::sync::Arc;

use tracing::{error, info};

use inspector_domain::constants::{
    ANNOTATION_END_TIME, ANNOTATION_START_TIME, FINALIZER, LABEL_TASK_NAME,
};
use inspector_domain::time::{format_duration, parse_timestamp};
use inspector_domain::TaskStore;
use inspector_errors::{InspectorError, InspectorResult};

use crate::levels::count_levels;
use crate::storage::ReportStorage;

/// 结果记录的调和：补全时长、级别统计等状态，删除时清理报告文件
pub struct InspectResultReconciler {
    store: Arc<dyn TaskStore>,
    storage: ReportStorage,
}

impl InspectResultReconciler {
    pub fn new(store: Arc<dyn TaskStore>, storage: ReportStorage) -> Self {
        Self { store, storage }
    }

    pub async fn reconcile(&self, name: &str) -> InspectorResult<()> {
        let Some(mut result) = self.store.get_result(name).await? else {
            info!("结果记录 {} 不存在", name);
            return Ok(());
        };

        if result.metadata.is_deleting() {
            info!("结果记录 {} 正在删除", name);
            if let Err(e) = self.storage.remove(name).await {
                error!("删除报告文件 {} 失败: {}", name, e);
            }
            if result.metadata.remove_finalizer(FINALIZER) {
                self.store.update_result(&result).await?;
            }
            return Ok(());
        }

        if result.metadata.add_finalizer(FINALIZER) {
            result = self.store.update_result(&result).await?;
        }

        if result.status.complete {
            return Ok(());
        }

        let task_name = result
            .metadata
            .label(LABEL_TASK_NAME)
            .ok_or_else(|| InspectorError::not_found("任务标签", name))?
            .to_string();
        let task = self
            .store
            .get_task(&task_name)
            .await?
            .ok_or_else(|| InspectorError::task_not_found(&task_name))?;

        let start = result
            .metadata
            .annotation(ANNOTATION_START_TIME)
            .unwrap_or_default()
            .to_string();
        let end = result
            .metadata
            .annotation(ANNOTATION_END_TIME)
            .unwrap_or_default()
            .to_string();
        let duration = parse_timestamp(&end)? - parse_timestamp(&start)?;

        let report = self.storage.load(name).await?;

        result.status.policy = task.spec.inspect_policy;
        result.status.duration = format_duration(duration);
        result.status.task_start_time = start;
        result.status.task_end_time = end;
        result.status.level = count_levels(&report);
        result.status.complete = true;

        self.store.update_result_status(&result).await?;
        info!("结果记录 {} 状态已更新，耗时 {}", name, result.status.duration);
        Ok(())
    }
}
