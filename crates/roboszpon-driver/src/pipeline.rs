//! Pipeline IO 循环模块
//!
//! 后台 RX 线程：接收帧、打接收时间戳、交给 [`StationContext`] 处理，
//! 并按固定间隔执行周期任务（参数读取超时、存活评估）。帧处理与周期任务
//! 运行在同一线程上，注册表不会被二者并发修改。

use crate::heartbeat::monotonic_micros;
use crate::state::StationContext;
use roboszpon_can::{CanError, RxAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, trace};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use roboszpon_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     liveness_timeout_ms: 2_000,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(config.tick_interval_ms, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// 总线接收超时（毫秒），决定 RX 线程检查退出标志与周期任务的最大延迟
    pub receive_timeout_ms: u64,
    /// 周期任务间隔（毫秒）
    pub tick_interval_ms: u64,
    /// 节点存活超时（毫秒）
    pub liveness_timeout_ms: u64,
    /// 参数读取默认超时（毫秒）
    pub default_read_timeout_ms: u64,
    /// 每个遥测量保留的样本数
    pub signal_capacity: usize,
}

impl PipelineConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn default_read_timeout(&self) -> Duration {
        Duration::from_millis(self.default_read_timeout_ms)
    }

    /// 读取截止后、超时回调到达前的最长等待
    ///
    /// 超时由周期任务判定，可能晚一个周期；再加一次接收超时与固定余量。
    pub fn completion_grace(&self) -> Duration {
        self.tick_interval()
            .saturating_mul(2)
            .saturating_add(self.receive_timeout())
            .saturating_add(Duration::from_millis(100))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 2,
            tick_interval_ms: 100,
            liveness_timeout_ms: 1_000,
            default_read_timeout_ms: 500,
            signal_capacity: crate::signal::DEFAULT_SIGNAL_CAPACITY,
        }
    }
}

/// RX 线程循环
///
/// # 参数
/// - `rx`: 接收半边（线程独占）；`receive` 必须在有限时间内返回
/// - `ctx`: 共享状态上下文
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志，`false` 时退出；遇到致命总线错误时由本线程清除
pub fn rx_loop(
    mut rx: impl RxAdapter,
    ctx: Arc<StationContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) {
    let tick_interval_us = config.tick_interval_ms.max(1).saturating_mul(1_000);
    let mut next_tick_us = monotonic_micros().saturating_add(tick_interval_us);
    let metrics = ctx.metrics.clone();

    info!("RX thread started");

    loop {
        // Acquire: 看到 false 时，其他线程的清理写入也可见
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let now_us = monotonic_micros();
        if now_us >= next_tick_us {
            ctx.tick(now_us);
            next_tick_us = now_us.saturating_add(tick_interval_us);
        }

        let mut frame = match rx.receive() {
            Ok(frame) => {
                metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                frame
            },
            Err(CanError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                error!("RX thread: receive error: {}", e);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                if e.is_fatal() {
                    error!("RX thread: fatal error detected, setting is_running = false");
                    is_running.store(false, Ordering::Release);
                    break;
                }
                continue;
            },
        };

        // 存活判断与周期任务使用同一时钟，统一以主机接收时间为准
        frame.timestamp_us = monotonic_micros();
        trace!("RX frame 0x{:03X} payload {:016X}", frame.id, frame.payload());
        ctx.handle_frame(&frame);
    }

    info!("RX thread exited");
}
