//! 巡检调度
//!
//! 在单个集群内按并发预算下发并轮询 Job（[`Dispatcher`]），跨集群并行执行完整巡检流程
//! （[`MultiClusterCoordinator`]），并由 [`InspectTaskReconciler`] 驱动任务状态流转。

pub mod bootstrap;
pub mod controller;
pub mod coordinator;
pub mod dispatcher;
pub mod state;
pub mod template;

pub use bootstrap::*;
pub use controller::*;
pub use coordinator::*;
pub use dispatcher::*;
pub use state::*;
pub use template::*;
