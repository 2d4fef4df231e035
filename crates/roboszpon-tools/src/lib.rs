//! # Roboszpon Tools - 共享数据格式
//!
//! **依赖原则**: 只依赖 `roboszpon-protocol`，不依赖驱动层
//!
//! ## 包含模块
//!
//! - `parameter_file` - 参数集文件（名称 → 值，TOML）
//! - `config` - 站点配置文件

pub mod config;
pub mod parameter_file;

pub use config::{PipelineSettings, StationConfig, TelemetrySettings};
pub use parameter_file::{ParameterFileError, ParameterSet};
