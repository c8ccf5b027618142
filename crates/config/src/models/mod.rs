pub mod app_config;
pub mod engine;
pub mod job;
pub mod observability;

pub use app_config::AppConfig;
pub use engine::EngineConfig;
pub use job::JobConfig;
pub use observability::{LogFormat, ObservabilityConfig};
