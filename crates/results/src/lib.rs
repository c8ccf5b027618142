//! 巡检结果聚合
//!
//! 把各 Job 上报的结果片段合并为每个集群一份的报告，统计严重级别，
//! 写入报告文件并创建对外可见的结果记录。

pub mod aggregator;
pub mod controller;
pub mod extractor;
pub mod levels;
pub mod storage;

pub use aggregator::*;
pub use controller::*;
pub use extractor::*;
pub use levels::*;
pub use storage::*;
