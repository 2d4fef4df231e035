//! 帧 ID 定义
//!
//! 11 位标准帧 ID 由节点 ID（高 5 位）和消息类型（低 6 位）组成：
//!
//! ```text
//! bit 10 ........ 6 5 ........... 0
//!     [ node (5)  ] [  kind (6)   ]
//! ```

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 最大节点 ID（5 位）
pub const NODE_ID_MAX: u8 = 0x1F;

/// 最大消息类型值（6 位）
pub const MESSAGE_KIND_MAX: u8 = 0x3F;

/// 标准帧 ID 上限（11 位）
pub const STANDARD_ID_MAX: u32 = 0x7FF;

/// 急停广播帧 ID（所有节点同时响应，与节点 ID 无关）
pub const ID_EMERGENCY_STOP: u32 = 0x001;

const NODE_SHIFT: u32 = 6;

/// 消息类型（6 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageKind {
    /// 电机设定值指令（上位机 → 节点）
    MotorCommand = 0x01,
    /// 动作请求：上电/断电/配置保存等（上位机 → 节点）
    ActionRequest = 0x02,
    /// 状态报告：模式、温度、故障标志（节点 → 上位机）
    StatusReport = 0x03,
    /// 轴报告：位置、速度（节点 → 上位机）
    AxisReport = 0x04,
    /// 电机报告：电流、占空比（节点 → 上位机）
    MotorReport = 0x05,
    /// 参数写入（上位机 → 节点）
    ParameterWrite = 0x06,
    /// 参数读取请求（上位机 → 节点）
    ParameterRead = 0x07,
    /// 参数读取应答（节点 → 上位机）
    ParameterResponse = 0x08,
}

impl MessageKind {
    /// 是否为节点上报的反馈类消息
    pub fn is_report(self) -> bool {
        matches!(
            self,
            MessageKind::StatusReport
                | MessageKind::AxisReport
                | MessageKind::MotorReport
                | MessageKind::ParameterResponse
        )
    }
}

/// 组合 11 位帧 ID
///
/// 超出范围的节点 ID / 消息类型会被按位截断（与固件库行为一致），
/// 需要严格校验时先调用 [`validate_node_id`]。
pub fn encode_frame_id(node_id: u8, kind: u8) -> u16 {
    (((node_id & NODE_ID_MAX) as u16) << NODE_SHIFT) | (kind & MESSAGE_KIND_MAX) as u16
}

/// 拆分 11 位帧 ID，返回 `(node_id, kind)`
pub fn decode_frame_id(id: u32) -> (u8, u8) {
    let node_id = ((id >> NODE_SHIFT) as u8) & NODE_ID_MAX;
    let kind = (id as u8) & MESSAGE_KIND_MAX;
    (node_id, kind)
}

/// 校验节点 ID 是否在 0..=31 范围内
pub fn validate_node_id(node_id: u8) -> Result<u8, ProtocolError> {
    if node_id > NODE_ID_MAX {
        return Err(ProtocolError::InvalidNodeId(node_id));
    }
    Ok(node_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_roundtrip_exhaustive() {
        for node in 0..=NODE_ID_MAX {
            for kind in 0..=MESSAGE_KIND_MAX {
                let id = encode_frame_id(node, kind);
                assert!(id as u32 <= STANDARD_ID_MAX);
                assert_eq!(decode_frame_id(id as u32), (node, kind));
            }
        }
    }

    #[test]
    fn test_encode_frame_id_layout() {
        // 与固件库一致：((node & 0b11111) << 6) + (kind & 0b111111)
        assert_eq!(encode_frame_id(3, MessageKind::StatusReport as u8), 0x0C3);
        assert_eq!(encode_frame_id(1, MessageKind::MotorCommand as u8), 0x041);
        assert_eq!(encode_frame_id(31, 63), 0x7FF);
    }

    #[test]
    fn test_encode_frame_id_masks_out_of_range() {
        assert_eq!(encode_frame_id(32, 1), encode_frame_id(0, 1));
        assert_eq!(encode_frame_id(2, 0x41), encode_frame_id(2, 0x01));
    }

    #[test]
    fn test_validate_node_id() {
        assert_eq!(validate_node_id(31), Ok(31));
        assert_eq!(validate_node_id(32), Err(ProtocolError::InvalidNodeId(32)));
    }

    #[test]
    fn test_message_kind_from_u8() {
        assert_eq!(MessageKind::try_from(0x01).unwrap(), MessageKind::MotorCommand);
        assert_eq!(MessageKind::try_from(0x08).unwrap(), MessageKind::ParameterResponse);
        assert!(MessageKind::try_from(0x00).is_err());
        assert!(MessageKind::try_from(0x09).is_err());
    }

    #[test]
    fn test_message_kind_is_report() {
        assert!(MessageKind::StatusReport.is_report());
        assert!(MessageKind::ParameterResponse.is_report());
        assert!(!MessageKind::ParameterRead.is_report());
        assert!(!MessageKind::MotorCommand.is_report());
    }

    #[test]
    fn test_emergency_stop_id() {
        // 0x001 与节点 0 的 MotorCommand 帧 ID 重合，由负载全零区分
        assert_eq!(ID_EMERGENCY_STOP, encode_frame_id(0, MessageKind::MotorCommand as u8) as u32);
    }
}
