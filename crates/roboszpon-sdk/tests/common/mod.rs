//! 集成测试公共工具：内存总线 + 节点模拟器

#![allow(dead_code)]

use roboszpon_sdk::can::{CanAdapter, MockBus};
use roboszpon_sdk::protocol::{
    Message, Mode, Parameter, ParameterResponse, StatusFlags, StatusReport, decode_frame,
};
use roboszpon_sdk::{PipelineConfig, Station, StationBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 测试用配置：缩短周期与超时
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        receive_timeout_ms: 2,
        tick_interval_ms: 10,
        liveness_timeout_ms: 1_000,
        default_read_timeout_ms: 200,
        signal_capacity: 128,
    }
}

pub fn setup() -> (MockBus, Station) {
    setup_with(fast_config())
}

pub fn setup_with(config: PipelineConfig) -> (MockBus, Station) {
    let (bus, mut adapter) = MockBus::new();
    adapter.set_receive_timeout(Duration::from_millis(config.receive_timeout_ms));
    let station = StationBuilder::new().pipeline_config(config).build(adapter).unwrap();
    (bus, station)
}

/// 轮询直到条件满足（最多 2 秒）
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

pub fn status_frame(node: u8, mode: Mode) -> roboszpon_sdk::RoboszponFrame {
    StatusReport {
        node_id: node,
        mode,
        flags: StatusFlags::empty(),
        temperature: 24.5,
    }
    .to_frame()
}

/// 注入状态报告并等待注册表反映该模式
pub fn announce(bus: &MockBus, station: &Station, node: u8, mode: Mode) {
    bus.inject(status_frame(node, mode));
    assert!(
        wait_until(|| station.snapshot(node).is_ok_and(|s| s.mode == mode)),
        "node {} never reached {:?}",
        node,
        mode
    );
}

/// 节点模拟器：保存参数值，应答读取、接受写入
#[derive(Clone, Default)]
pub struct NodeSimulator {
    pub values: Arc<Mutex<HashMap<(u8, u8), f32>>>,
    /// 不应答的参数 ID
    pub silent: Arc<Mutex<HashSet<u8>>>,
}

impl NodeSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `id * 0.5` 填充某节点的全部参数
    pub fn with_defaults(self, node: u8) -> Self {
        {
            let mut values = self.values.lock().unwrap();
            for parameter in roboszpon_sdk::protocol::PARAMETER_TABLE {
                values.insert((node, parameter.id()), parameter.id() as f32 * 0.5);
            }
        }
        self
    }

    pub fn silence(&self, parameter: Parameter) {
        self.silent.lock().unwrap().insert(parameter.id());
    }

    pub fn value(&self, node: u8, parameter: Parameter) -> Option<f32> {
        self.values.lock().unwrap().get(&(node, parameter.id())).copied()
    }

    /// 挂载到总线
    pub fn attach(&self, bus: &MockBus) {
        let sim = self.clone();
        bus.set_responder(move |frame| match decode_frame(frame) {
            Ok(Message::ParameterRead(read)) => {
                if sim.silent.lock().unwrap().contains(&read.parameter_id) {
                    return Vec::new();
                }
                let value = sim
                    .values
                    .lock()
                    .unwrap()
                    .get(&(read.node_id, read.parameter_id))
                    .copied()
                    .unwrap_or(0.0);
                vec![ParameterResponse::new(read.node_id, read.parameter_id, value).to_frame()]
            },
            Ok(Message::ParameterWrite(write)) => {
                sim.values
                    .lock()
                    .unwrap()
                    .insert((write.node_id, write.parameter_id), write.value);
                Vec::new()
            },
            _ => Vec::new(),
        });
    }
}
