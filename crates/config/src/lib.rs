//! 巡检引擎配置
//!
//! 配置加载顺序：内置默认值 → TOML 配置文件 → `INSPECTOR` 前缀的环境变量。

pub mod models;


pub use models::{AppConfig, EngineConfig, JobConfig, LogFormat, ObservabilityConfig};
