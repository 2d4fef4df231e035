//! 参数表
//!
//! 参数名称 → 单字节参数 ID 的静态映射，跨协议版本保持稳定。
//! 参数值在线上一律为 f32，与参数的逻辑类型无关。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

macro_rules! parameter_table {
    ($( $(#[$doc:meta])* $variant:ident = $id:literal => $name:literal, )+) => {
        /// 节点参数
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum Parameter {
            $( $(#[$doc])* $variant = $id, )+
        }

        /// 按 ID 升序排列的完整参数表
        pub const PARAMETER_TABLE: &[Parameter] = &[ $( Parameter::$variant, )+ ];

        impl Parameter {
            /// 参数名称（持久化文件中使用的键）
            pub const fn name(self) -> &'static str {
                match self {
                    $( Parameter::$variant => $name, )+
                }
            }
        }
    };
}

parameter_table! {
    /// 指令超时（s），超时未收到设定值则停止
    CommandTimeout = 0x01 => "command_timeout",
    StatusReportInterval = 0x02 => "status_report_interval",
    AxisReportInterval = 0x03 => "axis_report_interval",
    MotorReportInterval = 0x04 => "motor_report_interval",
    EncoderResolution = 0x05 => "encoder_resolution",
    EncoderOffset = 0x06 => "encoder_offset",
    EncoderDirection = 0x07 => "encoder_direction",
    GearRatio = 0x08 => "gear_ratio",
    MotorPolePairs = 0x09 => "motor_pole_pairs",
    MotorMaxCurrent = 0x0A => "motor_max_current",
    MotorMaxDuty = 0x0B => "motor_max_duty",
    MotorMaxVelocity = 0x0C => "motor_max_velocity",
    MotorMaxAcceleration = 0x0D => "motor_max_acceleration",
    PositionLimitMin = 0x0E => "position_limit_min",
    PositionLimitMax = 0x0F => "position_limit_max",
    CurrentPidKp = 0x10 => "current_pid_kp",
    CurrentPidKi = 0x11 => "current_pid_ki",
    CurrentPidKd = 0x12 => "current_pid_kd",
    CurrentPidIntegralLimit = 0x13 => "current_pid_integral_limit",
    CurrentPidOutputLimit = 0x14 => "current_pid_output_limit",
    VelocityPidKp = 0x15 => "velocity_pid_kp",
    VelocityPidKi = 0x16 => "velocity_pid_ki",
    VelocityPidKd = 0x17 => "velocity_pid_kd",
    VelocityPidIntegralLimit = 0x18 => "velocity_pid_integral_limit",
    VelocityPidOutputLimit = 0x19 => "velocity_pid_output_limit",
    PositionPidKp = 0x1A => "position_pid_kp",
    PositionPidKi = 0x1B => "position_pid_ki",
    PositionPidKd = 0x1C => "position_pid_kd",
    PositionPidIntegralLimit = 0x1D => "position_pid_integral_limit",
    PositionPidOutputLimit = 0x1E => "position_pid_output_limit",
    CurrentFilterCutoff = 0x1F => "current_filter_cutoff",
    VelocityFilterCutoff = 0x20 => "velocity_filter_cutoff",
    PositionFilterCutoff = 0x21 => "position_filter_cutoff",
    /// 过温保护阈值（°C）
    TemperatureLimit = 0x22 => "temperature_limit",
    TemperatureHysteresis = 0x23 => "temperature_hysteresis",
    UndervoltageThreshold = 0x24 => "undervoltage_threshold",
    OvervoltageThreshold = 0x25 => "overvoltage_threshold",
    OvercurrentThreshold = 0x26 => "overcurrent_threshold",
    BrakeDuty = 0x27 => "brake_duty",
    HomingVelocity = 0x28 => "homing_velocity",
    HomingOffset = 0x29 => "homing_offset",
}

impl Parameter {
    /// 线上参数 ID
    pub fn id(self) -> u8 {
        self.into()
    }

    /// 按名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        PARAMETER_TABLE.iter().copied().find(|p| p.name() == name)
    }

    /// 按名称查找，未知名称返回带名称的错误
    pub fn parse_name(name: &str) -> Result<Self, ProtocolError> {
        Self::from_name(name).ok_or_else(|| ProtocolError::UnknownParameter(name.to_string()))
    }

    /// 按线上 ID 查找
    pub fn from_id(id: u8) -> Option<Self> {
        Self::try_from(id).ok()
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Parameter {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s)
    }
}
