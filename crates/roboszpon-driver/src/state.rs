//! 站点共享状态
//!
//! [`StationContext`] 由 RX 线程（唯一写者）与调用方线程（读者、发起请求）
//! 共享。注册表与关联器各由一把锁保护；回调一律在锁外执行。

use crate::correlator::Correlator;
use crate::heartbeat::{LivenessChange, LivenessMonitor};
use crate::hooks::HookManager;
use crate::metrics::StationMetrics;
use crate::registry::Registry;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use roboszpon_protocol::{Message, RoboszponFrame, decode_frame};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 站点上下文
pub struct StationContext {
    pub registry: Mutex<Registry>,
    pub correlator: Mutex<Correlator>,
    pub liveness: Mutex<LivenessMonitor>,
    pub hooks: RwLock<HookManager>,
    pub metrics: Arc<StationMetrics>,
    liveness_listeners: Mutex<Vec<Sender<LivenessChange>>>,
}

impl StationContext {
    pub fn new(signal_capacity: usize, liveness_timeout: Duration) -> Self {
        Self {
            registry: Mutex::new(Registry::with_signal_capacity(signal_capacity)),
            correlator: Mutex::new(Correlator::new()),
            liveness: Mutex::new(LivenessMonitor::new(liveness_timeout)),
            hooks: RwLock::new(HookManager::new()),
            metrics: Arc::new(StationMetrics::new()),
            liveness_listeners: Mutex::new(Vec::new()),
        }
    }

    /// 处理一帧入站数据：钩子 → 解码 → 注册表 → 关联器
    ///
    /// 格式错误的帧记录日志、计数后丢弃，返回 `None`。
    pub fn handle_frame(&self, frame: &RoboszponFrame) -> Option<Message> {
        let has_closed = {
            let hooks = self.hooks.read();
            hooks.trigger_all(frame);
            hooks.has_closed()
        };
        if has_closed {
            let pruned = self.hooks.write().prune_closed();
            debug!("Removed {} closed frame callbacks", pruned);
        }

        let message = match decode_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed frame 0x{:03X}: {}", frame.id, e);
                self.metrics.rx_frames_malformed.fetch_add(1, Ordering::Relaxed);
                return None;
            },
        };
        self.metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);

        if let Message::Raw { node_id, kind, .. } = message {
            trace!("Unknown message kind 0x{:02X} from node {}", kind, node_id);
            self.metrics.rx_frames_unknown.fetch_add(1, Ordering::Relaxed);
        }

        self.registry.lock().apply(&message, frame.timestamp_us);

        let completion = self.correlator.lock().dispatch(&message);
        if let Some(completion) = completion {
            self.metrics.reads_matched.fetch_add(1, Ordering::Relaxed);
            completion.complete();
        }

        Some(message)
    }

    /// 周期任务：过期参数读取 + 存活评估
    pub fn tick(&self, now_us: u64) -> Vec<LivenessChange> {
        let expired = self.correlator.lock().expire(now_us);
        for completion in expired {
            self.metrics.reads_timed_out.fetch_add(1, Ordering::Relaxed);
            completion.complete();
        }

        let changes = {
            let registry = self.registry.lock();
            self.liveness.lock().tick(&registry, now_us)
        };

        if !changes.is_empty() {
            let mut listeners = self.liveness_listeners.lock();
            listeners.retain(|listener| changes.iter().all(|change| listener.send(*change).is_ok()));
        }
        changes
    }

    /// 订阅存活状态变化；接收端被丢弃后自动退订
    pub fn subscribe_liveness(&self) -> Receiver<LivenessChange> {
        let (tx, rx) = unbounded();
        self.liveness_listeners.lock().push(tx);
        rx
    }
}
