//! 存活检测
//!
//! 周期性（默认 100ms）评估每个节点距离最后一次状态报告的时间，
//! 报告在线/离线状态的变化。时间统一使用以进程启动为零点的单调时钟，
//! 不受系统时钟调整影响。

use crate::registry::Registry;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 单调时钟零点（首次访问时设置）
static APP_START: OnceLock<Instant> = OnceLock::new();

/// 自进程启动以来的单调时间（微秒）
pub fn monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    duration_micros(start.elapsed())
}

/// 时长转微秒，超出 `u64` 时饱和
pub fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// 时长转毫秒，超出 `u64` 时饱和
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// 默认存活超时
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(1);

/// 存活状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LivenessChange {
    pub node: u8,
    /// 变化后的状态
    pub live: bool,
}

/// 存活监视器
///
/// 只保存上一次评估的结果，设备状态本身仍由 [`Registry`] 持有。
#[derive(Debug)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_state: HashMap<u8, bool>,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_state: HashMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 评估所有设备，返回状态发生变化的节点
    ///
    /// 首次出现的节点视为此前离线；已从注册表移除的节点被遗忘。
    pub fn tick(&mut self, registry: &Registry, now_us: u64) -> Vec<LivenessChange> {
        let mut changes = Vec::new();

        for node in registry.nodes() {
            let live = registry.is_live(node, now_us, self.timeout);
            let previous = self.last_state.insert(node, live).unwrap_or(false);
            if previous == live {
                continue;
            }

            if live {
                info!("Node {} online", node);
            } else {
                warn!("Node {} stale: no status report within {:?}", node, self.timeout);
            }
            changes.push(LivenessChange { node, live });
        }

        self.last_state.retain(|node, _| registry.device(*node).is_some());
        changes
    }

    /// 上一次评估的结果；从未评估过的节点返回 `None`
    pub fn last_known(&self, node: u8) -> Option<bool> {
        self.last_state.get(&node).copied()
    }
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_TIMEOUT)
    }
}
