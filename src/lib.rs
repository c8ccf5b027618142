//! Kubernetes 集群巡检编排引擎
//!
//! 组合根：把规则解析、Job 下发、结果聚合与状态机组装为 [`Application`]，
//! 集群与存储的具体实现通过端口 trait 注入。

pub mod app;
pub mod logging;

pub use app::{plan, Application, JobPlan};
pub use logging::init_logging;
