mod cluster;
mod job;
mod meta;
mod report;
mod rule;
mod task;

pub use cluster::*;
pub use job::*;
pub use meta::*;
pub use report::*;
pub use rule::*;
pub use task::*;
