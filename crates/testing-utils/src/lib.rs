//! # Inspector Testing Utils
//!
//! 各 crate 共用的测试工具：
//!
//! - **Mock 端口实现**：内存中的集群客户端、集群解析、任务存储与通知注册表
//! - **测试数据构建器**：任务、规则与节点
//!
//! ```toml
//! [dev-dependencies]
//! inspector-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
