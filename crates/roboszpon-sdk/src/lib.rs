//! Roboszpon SDK - roboszpon 电机控制器操作站
//!
//! # 架构设计
//!
//! 分层结构，从底层到高层：
//!
//! - **总线层** (`can`): 收发能力抽象，具体传输由调用方注入
//! - **协议层** (`protocol`): 帧 ID、负载编解码、参数表
//! - **驱动层** (`driver`): RX 线程、设备注册表、参数读取关联、存活检测
//! - **工具层** (`tools`): 参数集文件与站点配置
//!
//! # 快速开始
//!
//! ```rust
//! use roboszpon_sdk::prelude::*;
//! # use roboszpon_sdk::can::MockBus;
//!
//! # let (_bus, adapter) = MockBus::new();
//! let station = StationBuilder::new().build(adapter)?;
//! station.emergency_stop()?;
//! # Ok::<(), DriverError>(())
//! ```

pub mod config;
pub mod prelude;
pub mod transfer;

pub use roboszpon_can as can;
pub use roboszpon_driver as driver;
pub use roboszpon_protocol as protocol;
pub use roboszpon_tools as tools;

// 常用类型
pub use can::{CanAdapter, CanError, RoboszponFrame, SplittableAdapter};
pub use driver::{DeviceSnapshot, DriverError, PipelineConfig, Station, StationBuilder};
pub use protocol::{Message, Mode, Parameter, ProtocolError};
pub use tools::{ParameterSet, StationConfig};
pub use transfer::{TransferError, export_parameters, import_parameters};

/// 初始化日志输出
///
/// 使用 `tracing_subscriber::fmt`，过滤规则取自 `RUST_LOG` 环境变量。
/// 已经安装过全局 subscriber 时返回 `false`。
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
