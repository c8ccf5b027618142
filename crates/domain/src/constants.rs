//! 标签、注解与 finalizer 常量

pub const LABEL_TASK_NAME: &str = "kubeeye.kubesphere.io/task-name";
pub const LABEL_RULE_TYPE: &str = "kubeeye.kubesphere.io/rule-type";
pub const LABEL_NODE_NAME: &str = "kubeeye.kubesphere.io/node-name";
pub const LABEL_RULE_GROUP: &str = "kubeeye.kubesphere.io/rule-group";
pub const LABEL_PLAN_NAME: &str = "kubeeye.kubesphere.io/inspect-plan";
pub const LABEL_INSPECT_RULE_GROUP: &str = "kubeeye.kubesphere.io/inspect-rule-group";

/// 临时规则组标签值，每次下发前后都会按此标签清理
pub const TEMP_RULE_GROUP: &str = "inspect-rule-temp";

pub const ANNOTATION_START_TIME: &str = "kubeeye.kubesphere.io/task-start-time";
pub const ANNOTATION_END_TIME: &str = "kubeeye.kubesphere.io/task-end-time";
pub const ANNOTATION_INSPECT_POLICY: &str = "kubeeye.kubesphere.io/task-inspect-policy";
pub const ANNOTATION_INSPECT_CLUSTER: &str = "kubeeye.kubesphere.io/task-inspect-cluster";

pub const FINALIZER: &str = "kubeeye.finalizers.kubesphere.io";

/// 任务未指定目标集群时使用的隐式集群名
pub const DEFAULT_CLUSTER: &str = "default";
