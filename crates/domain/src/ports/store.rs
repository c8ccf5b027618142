use async_trait::async_trait;

use crate::entities::{InspectTask, Report, Rule};
use crate::{InspectorResult, Phase};

/// 巡检任务、规则与结果记录的存取
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, name: &str) -> InspectorResult<Option<InspectTask>>;
    /// 更新元数据（标签、finalizer 等），返回更新后的对象
    async fn update_task(&self, task: &InspectTask) -> InspectorResult<InspectTask>;
    async fn update_task_status(&self, task: &InspectTask) -> InspectorResult<()>;

    /// 列出规则，指定规则组时只返回该组的规则
    async fn list_rules(&self, rule_group: Option<&str>) -> InspectorResult<Vec<Rule>>;

    async fn update_plan_status(&self, plan: &str, task: &str, phase: Phase)
        -> InspectorResult<()>;

    async fn create_result(&self, report: &Report) -> InspectorResult<()>;
    async fn get_result(&self, name: &str) -> InspectorResult<Option<Report>>;
    async fn update_result(&self, report: &Report) -> InspectorResult<Report>;
    async fn update_result_status(&self, report: &Report) -> InspectorResult<()>;
}

/// 外部通知注册表
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    /// 移除任务的注册信息，任务不存在时不报错
    async fn unregister(&self, task: &str) -> InspectorResult<()>;
}
