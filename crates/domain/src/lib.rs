//! 巡检领域模型
//!
//! 定义巡检任务、规则、Job 规格、聚合报告等核心数据结构，
//! 以及编排引擎消费的外部能力接口（集群客户端、资源存储、通知注册表）。

pub mod constants;
pub mod entities;
pub mod ports;
pub mod time;
pub mod value_objects;

pub use entities::*;
pub use inspector_errors::{InspectorError, InspectorResult};
pub use ports::*;
pub use value_objects::*;
