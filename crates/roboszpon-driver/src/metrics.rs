//! 站点运行指标
//!
//! 原子计数器，可在任意线程无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 站点实时指标
///
/// ```rust
/// use roboszpon_driver::StationMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = StationMetrics::new();
/// metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct StationMetrics {
    /// RX 接收的总帧数
    pub rx_frames_total: AtomicU64,
    /// 成功解码的帧数
    pub rx_frames_valid: AtomicU64,
    /// 格式错误被丢弃的帧数（扩展帧、长度错误、ID 越界、非法字段值）
    pub rx_frames_malformed: AtomicU64,
    /// 未知消息类型的帧数（透传，不算错误）
    pub rx_frames_unknown: AtomicU64,
    /// RX 超时次数（无数据时正常出现）
    pub rx_timeouts: AtomicU64,
    /// 发送成功的帧数
    pub tx_frames_total: AtomicU64,
    /// 发送失败次数
    pub tx_failures: AtomicU64,
    /// 总线设备错误次数
    pub device_errors: AtomicU64,
    /// 匹配成功的参数读取
    pub reads_matched: AtomicU64,
    /// 超时的参数读取
    pub reads_timed_out: AtomicU64,
}

impl StationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_valid: self.rx_frames_valid.load(Ordering::Relaxed),
            rx_frames_malformed: self.rx_frames_malformed.load(Ordering::Relaxed),
            rx_frames_unknown: self.rx_frames_unknown.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_failures: self.tx_failures.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            reads_matched: self.reads_matched.load(Ordering::Relaxed),
            reads_timed_out: self.reads_timed_out.load(Ordering::Relaxed),
        }
    }

    /// 所有计数器归零
    pub fn reset(&self) {
        self.rx_frames_total.store(0, Ordering::Relaxed);
        self.rx_frames_valid.store(0, Ordering::Relaxed);
        self.rx_frames_malformed.store(0, Ordering::Relaxed);
        self.rx_frames_unknown.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.tx_frames_total.store(0, Ordering::Relaxed);
        self.tx_failures.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
        self.reads_matched.store(0, Ordering::Relaxed);
        self.reads_timed_out.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_frames_valid: u64,
    pub rx_frames_malformed: u64,
    pub rx_frames_unknown: u64,
    pub rx_timeouts: u64,
    pub tx_frames_total: u64,
    pub tx_failures: u64,
    pub device_errors: u64,
    pub reads_matched: u64,
    pub reads_timed_out: u64,
}

impl MetricsSnapshot {
    /// 格式错误帧占比（百分比）；`rx_frames_total` 为 0 时返回 0.0
    pub fn malformed_rate(&self) -> f64 {
        if self.rx_frames_total == 0 {
            return 0.0;
        }
        (self.rx_frames_malformed as f64 / self.rx_frames_total as f64) * 100.0
    }

    /// 参数读取超时占比（百分比）
    pub fn read_timeout_rate(&self) -> f64 {
        let finished = self.reads_matched + self.reads_timed_out;
        if finished == 0 {
            return 0.0;
        }
        (self.reads_timed_out as f64 / finished as f64) * 100.0
    }
}
