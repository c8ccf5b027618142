//! 编排引擎消费的外部能力
//!
//! 集群客户端、资源存储与通知注册表都以 trait 的形式注入，
//! 生产环境与测试分别提供各自的实现。

mod cluster;
mod store;

pub use cluster::{ClusterClient, ClusterProvider, LabelSelector};
pub use store::{TaskNotifier, TaskStore};
