//! 规则解析与作业划分
//!
//! [`RuleEngine`] 负责选择、覆盖、合并与去重规则项并统计各类别数量，
//! [`JobAllocator`] 把合并后的规则项划分为可下发的 [`JobSpec`](inspector_domain::JobSpec)。

pub mod allocator;
pub mod engine;

pub use allocator::*;
pub use engine::*;
