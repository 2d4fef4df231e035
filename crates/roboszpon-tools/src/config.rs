//! # 站点配置
//!
//! 操作站运行参数的 TOML 文件格式。所有字段均有默认值，文件中只需写
//! 需要覆盖的部分：
//!
//! ```toml
//! [pipeline]
//! tick_interval_ms = 100
//! liveness_timeout_ms = 1500
//!
//! [telemetry]
//! signal_capacity = 20000
//! ```

use crate::parameter_file::ParameterFileError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 站点配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub pipeline: PipelineSettings,
    pub telemetry: TelemetrySettings,
}

impl StationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ParameterFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ParameterFileError> {
        Ok(toml::to_string(self)?)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterFileError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ParameterFileError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// 接收线程与超时设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// 总线接收超时（ms）
    pub receive_timeout_ms: u64,
    /// 周期任务间隔（ms）
    pub tick_interval_ms: u64,
    /// 节点存活超时（ms）
    pub liveness_timeout_ms: u64,
    /// 参数读取默认超时（ms）
    pub default_read_timeout_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 2,
            tick_interval_ms: 100,
            liveness_timeout_ms: 1_000,
            default_read_timeout_ms: 500,
        }
    }
}

/// 遥测历史设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// 每个遥测量保留的样本数
    pub signal_capacity: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            signal_capacity: 10_000,
        }
    }
}
