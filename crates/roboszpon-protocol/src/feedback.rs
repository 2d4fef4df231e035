//! 反馈帧结构体定义与帧解码
//!
//! 包含节点上报的状态/轴/电机/参数应答帧，以及把任意 `RoboszponFrame`
//! 解码为类型化 [`Message`] 的入口 [`decode_frame`]。

use crate::can::RoboszponFrame;
use crate::control::{ActionRequest, MotorCommand, ParameterRead, ParameterWrite};
use crate::ids::{ID_EMERGENCY_STOP, MessageKind, STANDARD_ID_MAX, decode_frame_id, encode_frame_id};
use crate::{ProtocolError, pack_f32_pair, pack_selector_f32, unpack_f32_pair, unpack_selector_f32};
use bilge::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 协议规定的负载长度
pub const PAYLOAD_LEN: usize = 8;

/// 温度原始值比例（0.1 °C / LSB）
pub const TEMPERATURE_SCALE: f32 = 0.1;

// ============================================================================
// 枚举类型定义
// ============================================================================

/// 节点运行模式（状态报告 Bit 63-62）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Mode {
    /// 停止（仅此模式下参数有定义，可读写）
    #[default]
    Stopped = 0x00,
    /// 运行
    Running = 0x01,
    /// 故障
    Error = 0x02,
}

/// 故障/状态标志位（16 位）
///
/// 当前协议代只定义 16 位标志，早期 62 位格式已废弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlags(pub u16);

impl StatusFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// 指定位（0-15）是否置位；超出范围返回 false
    pub fn contains(&self, bit: u8) -> bool {
        bit < 16 && self.0 & (1 << bit) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// 所有置位的位序号（从低到高）
    pub fn active_bits(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..16).filter(move |bit| self.contains(*bit))
    }
}

// ============================================================================
// 位域结构定义（使用 bilge）
// ============================================================================

/// 状态报告负载位域（64 位，bilge 字段顺序从 LSB 开始）
///
/// ```text
/// Bit 63-62: mode
/// Bit 61-48: 保留
/// Bit 47-16: 温度原始值（i32，0.1 °C）
/// Bit 15-0 : flags
/// ```
#[bitsize(64)]
#[derive(FromBits, DebugBits, Clone, Copy)]
pub struct StatusWord {
    pub flags: u16,           // Bit 15-0
    pub temperature_raw: u32, // Bit 47-16
    pub reserved: u14,        // Bit 61-48
    pub mode: u2,             // Bit 63-62
}

// ============================================================================
// 反馈结构体
// ============================================================================

/// 状态报告 (kind = 0x03)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusReport {
    pub node_id: u8,
    pub mode: Mode,
    pub flags: StatusFlags,
    /// 温度（°C）
    pub temperature: f32,
}

impl StatusReport {
    pub fn from_payload(node_id: u8, payload: u64) -> Result<Self, ProtocolError> {
        let word = StatusWord::from(payload);
        let raw_mode = word.mode().value();
        let mode = Mode::try_from(raw_mode).map_err(|_| ProtocolError::InvalidValue {
            field: "Mode".to_string(),
            value: raw_mode,
        })?;
        let temperature = word.temperature_raw() as i32 as f32 * TEMPERATURE_SCALE;

        Ok(Self {
            node_id,
            mode,
            flags: StatusFlags(word.flags()),
            temperature,
        })
    }

    /// 编码为负载（温度按 0.1 °C 取整）
    pub fn payload(&self) -> u64 {
        let raw_temperature = (self.temperature / TEMPERATURE_SCALE).round() as i32 as u32;
        ((u8::from(self.mode) as u64) << 62)
            | ((raw_temperature as u64) << 16)
            | self.flags.bits() as u64
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::StatusReport.into());
        RoboszponFrame::from_payload(id, self.payload())
    }
}

/// 轴报告 (kind = 0x04)：位置 || 速度
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisReport {
    pub node_id: u8,
    pub position: f32, // Byte 0-3
    pub velocity: f32, // Byte 4-7
}

impl AxisReport {
    pub fn from_payload(node_id: u8, payload: u64) -> Self {
        let (position, velocity) = unpack_f32_pair(payload);
        Self {
            node_id,
            position,
            velocity,
        }
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::AxisReport.into());
        RoboszponFrame::from_payload(id, pack_f32_pair(self.position, self.velocity))
    }
}

/// 电机报告 (kind = 0x05)：电流 || 占空比
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorReport {
    pub node_id: u8,
    pub current: f32, // Byte 0-3
    pub duty: f32,    // Byte 4-7
}

impl MotorReport {
    pub fn from_payload(node_id: u8, payload: u64) -> Self {
        let (current, duty) = unpack_f32_pair(payload);
        Self {
            node_id,
            current,
            duty,
        }
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::MotorReport.into());
        RoboszponFrame::from_payload(id, pack_f32_pair(self.current, self.duty))
    }
}

/// 参数读取应答 (kind = 0x08)
///
/// 负载布局：Bit 63-56 参数 ID，Bit 55-24 参数值，低 24 位未使用。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterResponse {
    pub node_id: u8,
    pub parameter_id: u8,
    pub value: f32,
}

impl ParameterResponse {
    pub fn new(node_id: u8, parameter_id: u8, value: f32) -> Self {
        Self {
            node_id,
            parameter_id,
            value,
        }
    }

    pub fn from_payload(node_id: u8, payload: u64) -> Self {
        let (parameter_id, value) = unpack_selector_f32(payload);
        Self::new(node_id, parameter_id, value)
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::ParameterResponse.into());
        RoboszponFrame::from_payload(id, pack_selector_f32(self.parameter_id, self.value))
    }
}

// ============================================================================
// 类型化消息
// ============================================================================

/// 解码后的消息
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    MotorCommand(MotorCommand),
    ActionRequest(ActionRequest),
    StatusReport(StatusReport),
    AxisReport(AxisReport),
    MotorReport(MotorReport),
    ParameterWrite(ParameterWrite),
    ParameterRead(ParameterRead),
    ParameterResponse(ParameterResponse),
    /// 急停广播（0x001，全零负载）
    EmergencyStop,
    /// 未知消息类型，原样透传
    Raw { node_id: u8, kind: u8, payload: u64 },
}

impl Message {
    /// 消息所属节点；急停广播没有节点
    pub fn node_id(&self) -> Option<u8> {
        match self {
            Message::MotorCommand(m) => Some(m.node_id),
            Message::ActionRequest(m) => Some(m.node_id),
            Message::StatusReport(m) => Some(m.node_id),
            Message::AxisReport(m) => Some(m.node_id),
            Message::MotorReport(m) => Some(m.node_id),
            Message::ParameterWrite(m) => Some(m.node_id),
            Message::ParameterRead(m) => Some(m.node_id),
            Message::ParameterResponse(m) => Some(m.node_id),
            Message::EmergencyStop => None,
            Message::Raw { node_id, .. } => Some(*node_id),
        }
    }

    /// 已知消息类型；未知类型与急停返回 None
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Message::MotorCommand(_) => Some(MessageKind::MotorCommand),
            Message::ActionRequest(_) => Some(MessageKind::ActionRequest),
            Message::StatusReport(_) => Some(MessageKind::StatusReport),
            Message::AxisReport(_) => Some(MessageKind::AxisReport),
            Message::MotorReport(_) => Some(MessageKind::MotorReport),
            Message::ParameterWrite(_) => Some(MessageKind::ParameterWrite),
            Message::ParameterRead(_) => Some(MessageKind::ParameterRead),
            Message::ParameterResponse(_) => Some(MessageKind::ParameterResponse),
            Message::EmergencyStop | Message::Raw { .. } => None,
        }
    }
}

/// 按消息类型解析 64 位负载
///
/// 未知类型不是错误，返回 [`Message::Raw`]。
pub fn decode_payload(node_id: u8, kind: u8, payload: u64) -> Result<Message, ProtocolError> {
    let Ok(kind) = MessageKind::try_from(kind) else {
        return Ok(Message::Raw {
            node_id,
            kind,
            payload,
        });
    };

    let message = match kind {
        MessageKind::MotorCommand => {
            Message::MotorCommand(MotorCommand::from_payload(node_id, payload)?)
        },
        MessageKind::ActionRequest => {
            Message::ActionRequest(ActionRequest::from_payload(node_id, payload)?)
        },
        MessageKind::StatusReport => {
            Message::StatusReport(StatusReport::from_payload(node_id, payload)?)
        },
        MessageKind::AxisReport => Message::AxisReport(AxisReport::from_payload(node_id, payload)),
        MessageKind::MotorReport => {
            Message::MotorReport(MotorReport::from_payload(node_id, payload))
        },
        MessageKind::ParameterWrite => {
            Message::ParameterWrite(ParameterWrite::from_payload(node_id, payload))
        },
        MessageKind::ParameterRead => {
            Message::ParameterRead(ParameterRead::from_payload(node_id, payload))
        },
        MessageKind::ParameterResponse => {
            Message::ParameterResponse(ParameterResponse::from_payload(node_id, payload))
        },
    };
    Ok(message)
}

/// 校验帧格式：标准帧、11 位 ID、8 字节负载
pub fn validate_frame(frame: &RoboszponFrame) -> Result<(), ProtocolError> {
    if frame.is_extended {
        return Err(ProtocolError::ExtendedFrame { id: frame.id });
    }
    if frame.id > STANDARD_ID_MAX {
        return Err(ProtocolError::InvalidCanId { id: frame.id });
    }
    if frame.len as usize != PAYLOAD_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: PAYLOAD_LEN,
            actual: frame.len as usize,
        });
    }
    Ok(())
}

/// 解码一帧
pub fn decode_frame(frame: &RoboszponFrame) -> Result<Message, ProtocolError> {
    validate_frame(frame)?;

    let payload = frame.payload();
    if frame.id == ID_EMERGENCY_STOP && payload == 0 {
        return Ok(Message::EmergencyStop);
    }

    let (node_id, kind) = decode_frame_id(frame.id);
    decode_payload(node_id, kind, payload)
}

impl TryFrom<RoboszponFrame> for Message {
    type Error = ProtocolError;

    fn try_from(frame: RoboszponFrame) -> Result<Self, Self::Error> {
        decode_frame(&frame)
    }
}
