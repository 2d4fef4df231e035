//! 驱动层模块
//!
//! 本模块提供 roboszpon 节点的设备驱动功能，包括：
//! - RX 线程管理与周期任务
//! - 设备注册表与遥测历史
//! - 异步参数读取关联（含超时与取消）
//! - 存活检测
//! - 钩子系统：帧级订阅
//!
//! # 使用场景
//!
//! 大多数用户应该通过 `roboszpon-sdk` 使用；需要直接控制帧收发时使用本 crate。

mod builder;
pub mod correlator;
mod error;
pub mod heartbeat;
pub mod hooks;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod signal;
pub mod state;
mod station;

pub use builder::StationBuilder;
pub use correlator::{Completion, Correlator, ReadCallback, ReadHandle};
pub use error::DriverError;
pub use heartbeat::{LivenessChange, LivenessMonitor, duration_micros, duration_millis, monotonic_micros};
pub use hooks::{ChannelHook, FrameCallback, HookManager};
pub use metrics::{MetricsSnapshot, StationMetrics};
pub use pipeline::{PipelineConfig, rx_loop};
pub use registry::{Device, DeviceSnapshot, Registry, SignalKind};
pub use signal::{DEFAULT_SIGNAL_CAPACITY, Signal};
pub use state::StationContext;
pub use station::{FrameSubscription, Station};
