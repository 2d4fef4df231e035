//! 设备注册表
//!
//! 维护 NodeId → [`Device`] 的映射（按首次出现顺序）。节点在第一次
//! 上报状态时创建，此后只能由操作员显式移除。

use crate::error::DriverError;
use crate::heartbeat::duration_micros;
use crate::signal::{DEFAULT_SIGNAL_CAPACITY, Signal};
use roboszpon_protocol::{Message, Mode, StatusFlags};
use std::time::Duration;
use tracing::{debug, info, trace};

/// 设备遥测量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalKind {
    Duty,
    Current,
    Velocity,
    Position,
    Temperature,
}

/// 单个节点的状态与遥测历史
#[derive(Debug, Clone)]
pub struct Device {
    node: u8,
    mode: Mode,
    flags: StatusFlags,
    /// 最后一次收到状态报告的时间（单调时钟，微秒）
    last_seen_us: u64,
    duty: Signal,
    current: Signal,
    velocity: Signal,
    position: Signal,
    temperature: Signal,
}

impl Device {
    fn new(node: u8, signal_capacity: usize) -> Self {
        Self {
            node,
            mode: Mode::default(),
            flags: StatusFlags::empty(),
            last_seen_us: 0,
            duty: Signal::with_capacity(signal_capacity),
            current: Signal::with_capacity(signal_capacity),
            velocity: Signal::with_capacity(signal_capacity),
            position: Signal::with_capacity(signal_capacity),
            temperature: Signal::with_capacity(signal_capacity),
        }
    }

    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn flags(&self) -> StatusFlags {
        self.flags
    }

    pub fn last_seen_us(&self) -> u64 {
        self.last_seen_us
    }

    pub fn signal(&self, kind: SignalKind) -> &Signal {
        match kind {
            SignalKind::Duty => &self.duty,
            SignalKind::Current => &self.current,
            SignalKind::Velocity => &self.velocity,
            SignalKind::Position => &self.position,
            SignalKind::Temperature => &self.temperature,
        }
    }

    /// 当前状态的只读副本（不含历史序列）
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            node: self.node,
            mode: self.mode,
            flags: self.flags,
            last_seen_us: self.last_seen_us,
            duty: self.duty.latest_value(),
            current: self.current.latest_value(),
            velocity: self.velocity.latest_value(),
            position: self.position.latest_value(),
            temperature: self.temperature.latest_value(),
        }
    }
}

/// 设备状态快照
///
/// 遥测量为最近一次样本；尚未收到对应报告时为 `None`。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceSnapshot {
    pub node: u8,
    pub mode: Mode,
    pub flags: StatusFlags,
    pub last_seen_us: u64,
    pub duty: Option<f32>,
    pub current: Option<f32>,
    pub velocity: Option<f32>,
    pub position: Option<f32>,
    pub temperature: Option<f32>,
}

/// 设备注册表
#[derive(Debug)]
pub struct Registry {
    devices: Vec<Device>,
    signal_capacity: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_signal_capacity(DEFAULT_SIGNAL_CAPACITY)
    }

    pub fn with_signal_capacity(signal_capacity: usize) -> Self {
        Self {
            devices: Vec::new(),
            signal_capacity,
        }
    }

    fn find(&self, node: u8) -> Option<&Device> {
        self.devices.iter().find(|d| d.node == node)
    }

    fn find_mut(&mut self, node: u8) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.node == node)
    }

    /// 处理状态报告：未知节点自动注册
    ///
    /// 返回 `true` 表示本次创建了新设备。
    pub fn on_status_report(
        &mut self,
        node: u8,
        mode: Mode,
        flags: StatusFlags,
        temperature: f32,
        timestamp_us: u64,
    ) -> bool {
        let created = if self.find(node).is_none() {
            info!("Device registered: node {}", node);
            self.devices.push(Device::new(node, self.signal_capacity));
            true
        } else {
            false
        };

        if let Some(device) = self.find_mut(node) {
            if device.mode != mode {
                debug!("Node {} mode {:?} -> {:?}", node, device.mode, mode);
            }
            device.mode = mode;
            device.flags = flags;
            device.last_seen_us = timestamp_us;
            device.temperature.append(temperature, timestamp_us);
        }
        created
    }

    /// 处理轴报告；未注册节点的报告被丢弃并返回 `false`
    pub fn on_axis_report(
        &mut self,
        node: u8,
        position: f32,
        velocity: f32,
        timestamp_us: u64,
    ) -> bool {
        let Some(device) = self.find_mut(node) else {
            trace!("Axis report from unregistered node {}, dropped", node);
            return false;
        };
        device.position.append(position, timestamp_us);
        device.velocity.append(velocity, timestamp_us);
        true
    }

    /// 处理电机报告；未注册节点的报告被丢弃并返回 `false`
    pub fn on_motor_report(&mut self, node: u8, current: f32, duty: f32, timestamp_us: u64) -> bool {
        let Some(device) = self.find_mut(node) else {
            trace!("Motor report from unregistered node {}, dropped", node);
            return false;
        };
        device.current.append(current, timestamp_us);
        device.duty.append(duty, timestamp_us);
        true
    }

    /// 把一条解码后的消息应用到注册表
    ///
    /// 只有三类报告影响注册表，其余消息返回 `false`。
    pub fn apply(&mut self, message: &Message, timestamp_us: u64) -> bool {
        match message {
            Message::StatusReport(report) => {
                self.on_status_report(
                    report.node_id,
                    report.mode,
                    report.flags,
                    report.temperature,
                    timestamp_us,
                );
                true
            },
            Message::AxisReport(report) => {
                self.on_axis_report(report.node_id, report.position, report.velocity, timestamp_us)
            },
            Message::MotorReport(report) => {
                self.on_motor_report(report.node_id, report.current, report.duty, timestamp_us)
            },
            _ => false,
        }
    }

    pub fn snapshot(&self, node: u8) -> Option<DeviceSnapshot> {
        self.find(node).map(Device::snapshot)
    }

    /// 全部设备快照（按注册顺序）
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        self.devices.iter().map(Device::snapshot).collect()
    }

    pub fn device(&self, node: u8) -> Option<&Device> {
        self.find(node)
    }

    /// `now - last_seen <= timeout`；未知节点返回 `false`
    pub fn is_live(&self, node: u8, now_us: u64, timeout: Duration) -> bool {
        self.find(node)
            .is_some_and(|device| now_us.saturating_sub(device.last_seen_us) <= duration_micros(timeout))
    }

    /// 参数读写前置条件：节点已注册且处于 Stopped 模式
    pub fn ensure_configurable(&self, node: u8) -> Result<(), DriverError> {
        let device = self.find(node).ok_or(DriverError::UnknownDevice(node))?;
        if device.mode != Mode::Stopped {
            return Err(DriverError::DeviceNotStopped {
                node,
                mode: device.mode,
            });
        }
        Ok(())
    }

    /// 移除设备（操作员显式操作）
    pub fn remove(&mut self, node: u8) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.node == node)?;
        info!("Device removed: node {}", node);
        Some(self.devices.remove(index))
    }

    /// 已注册节点（按注册顺序）
    pub fn nodes(&self) -> Vec<u8> {
        self.devices.iter().map(|d| d.node).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roboszpon_protocol::{AxisReport, MotorReport, ParameterResponse, StatusReport};

    fn register(registry: &mut Registry, node: u8, mode: Mode, ts: u64) {
        registry.on_status_report(node, mode, StatusFlags::empty(), 25.0, ts);
    }

    #[test]
    fn test_status_report_creates_device() {
        let mut registry = Registry::new();
        assert!(registry.snapshot(3).is_none());

        let created = registry.on_status_report(3, Mode::Stopped, StatusFlags(0x0002), 31.5, 1_000);
        assert!(created);

        let snapshot = registry.snapshot(3).unwrap();
        assert_eq!(snapshot.node, 3);
        assert_eq!(snapshot.mode, Mode::Stopped);
        assert_eq!(snapshot.flags, StatusFlags(0x0002));
        assert_eq!(snapshot.last_seen_us, 1_000);
        assert_eq!(snapshot.temperature, Some(31.5));
        assert_eq!(snapshot.position, None);

        assert!(!registry.on_status_report(3, Mode::Running, StatusFlags::empty(), 32.0, 2_000));
        let snapshot = registry.snapshot(3).unwrap();
        assert_eq!(snapshot.mode, Mode::Running);
        assert_eq!(snapshot.last_seen_us, 2_000);
        assert_eq!(registry.device(3).unwrap().signal(SignalKind::Temperature).len(), 2);
    }

    #[test]
    fn test_unregistered_axis_report_is_noop() {
        let mut registry = Registry::new();
        assert!(!registry.on_axis_report(5, 1.0, 2.0, 10));
        assert!(!registry.on_motor_report(5, 1.0, 2.0, 10));
        assert!(registry.is_empty());
        assert!(registry.snapshot(5).is_none());
    }

    #[test]
    fn test_axis_and_motor_reports_append() {
        let mut registry = Registry::new();
        register(&mut registry, 2, Mode::Running, 0);

        assert!(registry.on_axis_report(2, 1.25, -0.5, 100));
        assert!(registry.on_motor_report(2, 0.8, 0.3, 110));

        let snapshot = registry.snapshot(2).unwrap();
        assert_eq!(snapshot.position, Some(1.25));
        assert_eq!(snapshot.velocity, Some(-0.5));
        assert_eq!(snapshot.current, Some(0.8));
        assert_eq!(snapshot.duty, Some(0.3));
        // 遥测报告不刷新 last_seen
        assert_eq!(snapshot.last_seen_us, 0);

        let device = registry.device(2).unwrap();
        assert_eq!(device.signal(SignalKind::Position).latest(), Some((100, 1.25)));
    }

    #[test]
    fn test_is_live_window() {
        let mut registry = Registry::new();
        let t = 5_000_000;
        register(&mut registry, 1, Mode::Stopped, t);

        let timeout = Duration::from_secs(1);
        assert!(registry.is_live(1, t + 500_000, timeout));
        assert!(registry.is_live(1, t + 1_000_000, timeout));
        assert!(!registry.is_live(1, t + 1_500_000, timeout));
        assert!(!registry.is_live(9, t, timeout));
    }

    #[test]
    fn test_insertion_order_and_remove() {
        let mut registry = Registry::new();
        register(&mut registry, 7, Mode::Stopped, 0);
        register(&mut registry, 2, Mode::Stopped, 0);
        register(&mut registry, 11, Mode::Stopped, 0);
        register(&mut registry, 2, Mode::Running, 10);

        assert_eq!(registry.nodes(), vec![7, 2, 11]);
        assert!(registry.remove(2).is_some());
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.nodes(), vec![7, 11]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ensure_configurable() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.ensure_configurable(4),
            Err(DriverError::UnknownDevice(4))
        ));

        register(&mut registry, 4, Mode::Running, 0);
        assert!(matches!(
            registry.ensure_configurable(4),
            Err(DriverError::DeviceNotStopped {
                node: 4,
                mode: Mode::Running
            })
        ));

        register(&mut registry, 4, Mode::Stopped, 1);
        assert!(registry.ensure_configurable(4).is_ok());
    }

    #[test]
    fn test_apply_dispatches_reports() {
        let mut registry = Registry::with_signal_capacity(16);
        let status = Message::StatusReport(StatusReport {
            node_id: 6,
            mode: Mode::Stopped,
            flags: StatusFlags::empty(),
            temperature: 20.0,
        });
        let axis = Message::AxisReport(AxisReport {
            node_id: 6,
            position: 3.0,
            velocity: 0.0,
        });
        let motor = Message::MotorReport(MotorReport {
            node_id: 6,
            current: 1.0,
            duty: 0.1,
        });
        let response = Message::ParameterResponse(ParameterResponse::new(6, 1, 0.0));

        assert!(!registry.apply(&axis, 0));
        assert!(registry.apply(&status, 1));
        assert!(registry.apply(&axis, 2));
        assert!(registry.apply(&motor, 3));
        assert!(!registry.apply(&response, 4));
        assert!(!registry.apply(&Message::EmergencyStop, 5));

        let device = registry.device(6).unwrap();
        assert_eq!(device.signal(SignalKind::Position).capacity(), 16);
        assert_eq!(device.snapshot().position, Some(3.0));
    }
}
