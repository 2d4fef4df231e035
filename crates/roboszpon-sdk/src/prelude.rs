//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use roboszpon_sdk::prelude::*;
//! ```

// 驱动层
pub use crate::driver::{
    DeviceSnapshot, LivenessChange, PipelineConfig, ReadHandle, SignalKind, Station,
    StationBuilder,
};

// 协议层
pub use crate::protocol::{ActionId, Message, Mode, MotorCommandType, Parameter, StatusFlags};

// 总线层（常用 Trait）
pub use crate::can::{CanAdapter, RoboszponFrame, SplittableAdapter};

// 工具层
pub use crate::tools::{ParameterSet, StationConfig};

// 批量传输
pub use crate::transfer::{export_parameters, import_parameters};

// 错误类型
pub use crate::can::CanError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::transfer::TransferError;
