//! # Roboszpon Bus Adapter Layer
//!
//! 总线能力抽象：核心只依赖 "发送一帧 / 接收一帧" 这一窄接口，
//! 具体传输（SocketCAN、USB 适配器等）由使用方注入。

use std::time::Duration;
use thiserror::Error;

// 重新导出 roboszpon-protocol 中的 RoboszponFrame
pub use roboszpon_protocol::RoboszponFrame;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, MockCanAdapter, MockRxAdapter, MockTxAdapter};

/// 总线适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
}

impl CanError {
    /// 是否为不可恢复错误（接收线程遇到后应退出）
    pub fn is_fatal(&self) -> bool {
        match self {
            CanError::Device(e) => e.is_fatal(),
            CanError::BusOff | CanError::NotStarted => true,
            _ => false,
        }
    }
}

/// 设备错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    /// 暂时无法收发（队列满等），可重试
    Busy,
    /// 设备已不存在，接收线程应退出
    NoDevice,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == CanDeviceErrorKind::NoDevice
    }
}

/// 完整的总线能力（收 + 发）
pub trait CanAdapter {
    fn send(&mut self, frame: RoboszponFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<RoboszponFrame, CanError>;
    /// 接收超时；拆分前设置，之后由接收半边沿用
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
}

/// 接收半边（由接收线程独占）
pub trait RxAdapter {
    /// 接收一帧；无数据时应在有限时间内返回 `CanError::Timeout`
    fn receive(&mut self) -> Result<RoboszponFrame, CanError>;
}

/// 发送半边（由调用方线程加锁使用）
pub trait TxAdapter {
    fn send(&mut self, frame: RoboszponFrame) -> Result<(), CanError>;
}

/// 可拆分为独立收发半边的适配器
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}
