//! # 参数集文件
//!
//! 节点参数的扁平 名称 → 值 映射，以 TOML 持久化：
//!
//! ```toml
//! encoder_resolution = 4096.0
//! gear_ratio = 36.0
//! velocity_pid_kp = 0.25
//! ```
//!
//! 文件中的名称在加载时不做校验，由 [`ParameterSet::validate`] 统一检查，
//! 以便导入前一次性拒绝整个文件。

use roboszpon_protocol::{PARAMETER_TABLE, Parameter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// 参数文件错误
#[derive(Error, Debug)]
pub enum ParameterFileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse parameter file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize parameter set: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown parameter: {0:?}")]
    UnknownParameter(String),
}

/// 参数集（名称 → f32）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, f32>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按参数写入（覆盖同名值）
    pub fn insert(&mut self, parameter: Parameter, value: f32) -> Option<f32> {
        self.values.insert(parameter.name().to_string(), value)
    }

    /// 按名称写入，不做校验
    pub fn insert_raw(&mut self, name: impl Into<String>, value: f32) -> Option<f32> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, parameter: Parameter) -> Option<f32> {
        self.values.get(parameter.name()).copied()
    }

    pub fn get_raw(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按名称字典序迭代
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// 不在参数表中的名称（字典序）
    pub fn unknown_names(&self) -> Vec<&str> {
        self.values
            .keys()
            .filter(|name| Parameter::from_name(name).is_none())
            .map(String::as_str)
            .collect()
    }

    /// 参数表中有、本集合缺少的参数
    pub fn missing(&self) -> Vec<Parameter> {
        PARAMETER_TABLE
            .iter()
            .copied()
            .filter(|p| !self.values.contains_key(p.name()))
            .collect()
    }

    /// 校验所有名称，返回按参数 ID 排序的条目
    ///
    /// 遇到第一个未知名称（字典序）即返回错误。
    pub fn validate(&self) -> Result<Vec<(Parameter, f32)>, ParameterFileError> {
        let mut entries = Vec::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let parameter = Parameter::from_name(name)
                .ok_or_else(|| ParameterFileError::UnknownParameter(name.clone()))?;
            entries.push((parameter, *value));
        }
        entries.sort_by_key(|(parameter, _)| *parameter);
        Ok(entries)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ParameterFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ParameterFileError> {
        Ok(toml::to_string(self)?)
    }

    /// 从文件加载
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ParameterFileError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 保存到文件（覆盖）
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ParameterFileError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

impl FromIterator<(Parameter, f32)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (Parameter, f32)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (parameter, value) in iter {
            set.insert(parameter, value);
        }
        set
    }
}
