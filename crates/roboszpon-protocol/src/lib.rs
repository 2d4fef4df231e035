//! # Roboszpon Protocol
//!
//! roboszpon 电机控制器总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 帧 ID 组合/拆分与消息类型
//! - `feedback`: 反馈帧解析（状态、轴、电机、参数应答）
//! - `control`: 控制帧构建（电机指令、动作请求、参数读写、急停）
//! - `parameters`: 参数名称 → 参数 ID 静态表
//!
//! ## 字节序
//!
//! 8 字节负载整体按大端字节序视为一个 `u64`，字段从最高位向最低位排列。
//! 浮点数统一为 IEEE-754 binary32，通过位重解释（而非数值转换）进出负载。

pub mod control;
pub mod feedback;
pub mod ids;
pub mod parameters;

// 重新导出常用类型
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use parameters::*;

/// 总线帧的统一抽象
///
/// `RoboszponFrame` 是协议层和总线层之间的中间抽象：
///
/// ```text
/// Protocol Layer (roboszpon-protocol)
///     ↓ decode_frame() 解析 / to_frame() 构建
/// RoboszponFrame (此类型)
///     ↓ 由注入的总线能力收发
/// Bus Layer (roboszpon-can)
/// ```
///
/// - **Copy**：固定 8 字节数据，无堆分配
/// - **时间戳**：`timestamp_us` 为接收时间（单调时钟，微秒），0 表示未打戳
///
/// # 示例
///
/// ```rust
/// use roboszpon_protocol::RoboszponFrame;
///
/// let frame = RoboszponFrame::new_standard(0x0C3, &[0, 0, 0, 0, 0, 0, 0, 1]);
/// assert_eq!(frame.id(), 0x0C3);
/// assert_eq!(frame.payload(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoboszponFrame {
    /// 帧 ID（标准帧只使用低 11 位）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID），本协议不使用
    pub is_extended: bool,

    /// 接收时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl RoboszponFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧（仅用于测试非法输入）
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    /// 由 64 位负载创建标准帧（大端，长度固定 8）
    pub fn from_payload(id: u16, payload: u64) -> Self {
        Self::new_standard(id, &payload.to_be_bytes())
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 设置接收时间戳
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取帧 ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 获取完整数据（8字节固定数组）
    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }

    /// 将 8 字节数据按大端解释为 `u64`
    pub fn payload(&self) -> u64 {
        u64::from_be_bytes(self.data)
    }
}

pub mod can {
    pub use super::RoboszponFrame;
}

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Extended frame 0x{id:X} is not part of the protocol")]
    ExtendedFrame { id: u32 },

    #[error("Invalid CAN ID: 0x{id:X}")]
    InvalidCanId { id: u32 },

    #[error("Invalid node ID: {0} (expected 0..=31)")]
    InvalidNodeId(u8),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}

/// 浮点数 → 32 位模式（位重解释）
pub fn f32_to_bits(value: f32) -> u32 {
    value.to_bits()
}

/// 32 位模式 → 浮点数（位重解释）
pub fn bits_to_f32(bits: u32) -> f32 {
    f32::from_bits(bits)
}

/// 打包 "选择字节 + 浮点值" 负载
///
/// 布局：Bit 63-56 为选择字节，Bit 55-24 为浮点位模式，Bit 23-0 为 0。
/// 电机指令、参数写入、参数应答共用此布局。
pub fn pack_selector_f32(selector: u8, value: f32) -> u64 {
    ((selector as u64) << 56) | ((f32_to_bits(value) as u64) << 24)
}

/// 拆分 "选择字节 + 浮点值" 负载（忽略低 24 位）
pub fn unpack_selector_f32(payload: u64) -> (u8, f32) {
    let selector = (payload >> 56) as u8;
    let bits = ((payload >> 24) & 0xFFFF_FFFF) as u32;
    (selector, bits_to_f32(bits))
}

/// 打包两个浮点值（高 32 位 || 低 32 位）
pub fn pack_f32_pair(high: f32, low: f32) -> u64 {
    ((f32_to_bits(high) as u64) << 32) | f32_to_bits(low) as u64
}

/// 拆分两个浮点值（高 32 位, 低 32 位）
pub fn unpack_f32_pair(payload: u64) -> (f32, f32) {
    (
        bits_to_f32((payload >> 32) as u32),
        bits_to_f32(payload as u32),
    )
}
