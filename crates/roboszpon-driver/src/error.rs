//! 驱动层错误类型定义

use roboszpon_can::CanError;
use roboszpon_protocol::{Mode, ProtocolError};
use thiserror::Error;

/// 驱动层错误类型
///
/// 所有错误在调用点均可恢复，不会导致进程退出。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 总线错误（发送失败原样上报，不自动重试）
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 节点未注册（尚未收到其状态报告，或已被移除）
    #[error("Unknown device: node {0}")]
    UnknownDevice(u8),

    /// 节点不处于 Stopped 模式，参数读写前置条件不满足
    #[error("Device {node} is {mode:?}, parameters are only accessible while Stopped")]
    DeviceNotStopped { node: u8, mode: Mode },

    /// 参数读取在截止时间内没有应答
    #[error("No response from node {node} for parameter 0x{parameter_id:02X}")]
    NoResponse { node: u8, parameter_id: u8 },

    /// 结果通道已关闭（接收线程退出或请求被取消）
    #[error("Result channel closed")]
    ChannelClosed,

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use roboszpon_can::CanError;
    use roboszpon_protocol::{Mode, ProtocolError};

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Can(CanError::BusOff);
        assert_eq!(driver_error.to_string(), "CAN driver error: Bus off");

        let driver_error = DriverError::Protocol(ProtocolError::InvalidLength {
            expected: 8,
            actual: 4,
        });
        assert!(driver_error.to_string().contains("Invalid frame length"));

        let driver_error = DriverError::DeviceNotStopped {
            node: 3,
            mode: Mode::Running,
        };
        let msg = driver_error.to_string();
        assert!(msg.contains("Device 3") && msg.contains("Running"), "{}", msg);

        let driver_error = DriverError::NoResponse {
            node: 3,
            parameter_id: 0x05,
        };
        assert_eq!(
            driver_error.to_string(),
            "No response from node 3 for parameter 0x05"
        );

        assert_eq!(DriverError::UnknownDevice(9).to_string(), "Unknown device: node 9");
        assert_eq!(DriverError::Timeout.to_string(), "Operation timeout");
        assert_eq!(DriverError::ChannelClosed.to_string(), "Result channel closed");
    }

    /// 测试 From<CanError> 转换
    #[test]
    fn test_from_can_error() {
        let driver_error: DriverError = CanError::Timeout.into();
        assert!(matches!(driver_error, DriverError::Can(CanError::Timeout)));
    }

    /// 测试 From<ProtocolError> 转换
    #[test]
    fn test_from_protocol_error() {
        let driver_error: DriverError = ProtocolError::InvalidNodeId(40).into();
        match driver_error {
            DriverError::Protocol(ProtocolError::InvalidNodeId(id)) => assert_eq!(id, 40),
            other => panic!("Expected Protocol variant, got {:?}", other),
        }
    }
}
