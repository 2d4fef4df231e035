//! 控制帧结构体定义
//!
//! 包含所有上位机 → 节点方向的指令，提供构建 `RoboszponFrame` 的方法。
//! 所有构建函数均为纯函数，发送由注入的总线能力完成。

use crate::can::RoboszponFrame;
use crate::ids::{ID_EMERGENCY_STOP, MessageKind, encode_frame_id};
use crate::{ProtocolError, pack_selector_f32, unpack_selector_f32};
use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 电机设定值指令
// ============================================================================

/// 电机指令类型（负载 Bit 63-56）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MotorCommandType {
    /// 占空比
    Duty = 0x00,
    /// 速度
    Velocity = 0x01,
    /// 位置
    Position = 0x02,
}

/// 电机设定值指令 (kind = 0x01)
///
/// 负载布局：Bit 63-56 指令类型，Bit 55-24 设定值（f32 位模式）。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorCommand {
    pub node_id: u8,
    pub command_type: MotorCommandType,
    pub value: f32,
}

impl MotorCommand {
    pub fn new(node_id: u8, command_type: MotorCommandType, value: f32) -> Self {
        Self {
            node_id,
            command_type,
            value,
        }
    }

    pub fn duty(node_id: u8, value: f32) -> Self {
        Self::new(node_id, MotorCommandType::Duty, value)
    }

    pub fn velocity(node_id: u8, value: f32) -> Self {
        Self::new(node_id, MotorCommandType::Velocity, value)
    }

    pub fn position(node_id: u8, value: f32) -> Self {
        Self::new(node_id, MotorCommandType::Position, value)
    }

    /// 64 位负载
    pub fn payload(&self) -> u64 {
        pack_selector_f32(self.command_type.into(), self.value)
    }

    /// 从负载解析
    pub fn from_payload(node_id: u8, payload: u64) -> Result<Self, ProtocolError> {
        let (selector, value) = unpack_selector_f32(payload);
        let command_type =
            MotorCommandType::try_from(selector).map_err(|_| ProtocolError::InvalidValue {
                field: "MotorCommandType".to_string(),
                value: selector,
            })?;
        Ok(Self::new(node_id, command_type, value))
    }

    /// 转换为总线帧
    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::MotorCommand.into());
        RoboszponFrame::from_payload(id, self.payload())
    }
}

// ============================================================================
// 动作请求
// ============================================================================

/// 动作 ID（负载最低字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ActionId {
    /// 上电（使能功率级）
    Arm = 0x00,
    /// 断电
    Disarm = 0x01,
    /// 将当前参数写入非易失存储
    CommitConfig = 0x02,
    /// 从非易失存储恢复参数
    RestoreConfig = 0x03,
    /// 恢复出厂参数
    FactoryConfig = 0x04,
    /// 软件复位
    SoftwareReset = 0x05,
}

/// 动作请求 (kind = 0x02)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionRequest {
    pub node_id: u8,
    pub action: ActionId,
}

impl ActionRequest {
    pub fn new(node_id: u8, action: ActionId) -> Self {
        Self { node_id, action }
    }

    pub fn arm(node_id: u8) -> Self {
        Self::new(node_id, ActionId::Arm)
    }

    pub fn disarm(node_id: u8) -> Self {
        Self::new(node_id, ActionId::Disarm)
    }

    pub fn payload(&self) -> u64 {
        u8::from(self.action) as u64
    }

    pub fn from_payload(node_id: u8, payload: u64) -> Result<Self, ProtocolError> {
        let raw = payload as u8;
        let action = ActionId::try_from(raw).map_err(|_| ProtocolError::InvalidValue {
            field: "ActionId".to_string(),
            value: raw,
        })?;
        Ok(Self::new(node_id, action))
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::ActionRequest.into());
        RoboszponFrame::from_payload(id, self.payload())
    }
}

// ============================================================================
// 参数读写
// ============================================================================

/// 参数写入指令 (kind = 0x06)
///
/// 负载布局：Bit 63-56 参数 ID，Bit 55-24 参数值（f32 位模式）。
/// 参数的逻辑类型无论为何，线上一律以 f32 传输。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterWrite {
    pub node_id: u8,
    pub parameter_id: u8,
    pub value: f32,
}

impl ParameterWrite {
    pub fn new(node_id: u8, parameter_id: u8, value: f32) -> Self {
        Self {
            node_id,
            parameter_id,
            value,
        }
    }

    pub fn payload(&self) -> u64 {
        pack_selector_f32(self.parameter_id, self.value)
    }

    pub fn from_payload(node_id: u8, payload: u64) -> Self {
        let (parameter_id, value) = unpack_selector_f32(payload);
        Self::new(node_id, parameter_id, value)
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::ParameterWrite.into());
        RoboszponFrame::from_payload(id, self.payload())
    }
}

/// 参数读取请求 (kind = 0x07)
///
/// 负载只有最低字节有效（参数 ID），节点以 `ParameterResponse` 应答。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterRead {
    pub node_id: u8,
    pub parameter_id: u8,
}

impl ParameterRead {
    pub fn new(node_id: u8, parameter_id: u8) -> Self {
        Self {
            node_id,
            parameter_id,
        }
    }

    pub fn payload(&self) -> u64 {
        self.parameter_id as u64
    }

    pub fn from_payload(node_id: u8, payload: u64) -> Self {
        Self::new(node_id, payload as u8)
    }

    pub fn to_frame(self) -> RoboszponFrame {
        let id = encode_frame_id(self.node_id, MessageKind::ParameterRead.into());
        RoboszponFrame::from_payload(id, self.payload())
    }
}

// ============================================================================
// 急停
// ============================================================================

/// 急停广播指令 (0x001)
///
/// 固定帧 ID、全零负载，所有节点同时响应。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmergencyStopCommand;

impl EmergencyStopCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn to_frame(self) -> RoboszponFrame {
        RoboszponFrame::from_payload(ID_EMERGENCY_STOP as u16, 0)
    }
}
