//! 遥测环形缓冲区
//!
//! 每个遥测量（占空比、电流、速度、位置、温度）保存一条有界的
//! `(timestamp_us, value)` 序列，满时丢弃最旧样本。

use std::collections::VecDeque;

/// 默认容量（样本数）
pub const DEFAULT_SIGNAL_CAPACITY: usize = 10_000;

/// 单个遥测量的有界时间序列
///
/// 值与时间戳一一对应，追加为 O(1)。
#[derive(Debug, Clone)]
pub struct Signal {
    samples: VecDeque<(u64, f32)>,
    capacity: usize,
}

impl Signal {
    /// 创建指定容量的序列；容量 0 按 1 处理
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_SIGNAL_CAPACITY)),
            capacity,
        }
    }

    /// 追加一个样本，满时先移除最旧样本
    pub fn append(&mut self, value: f32, timestamp_us: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp_us, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 最新样本 `(timestamp_us, value)`
    pub fn latest(&self) -> Option<(u64, f32)> {
        self.samples.back().copied()
    }

    /// 最新值
    pub fn latest_value(&self) -> Option<f32> {
        self.samples.back().map(|(_, value)| *value)
    }

    /// 按时间先后迭代 `(timestamp_us, value)`
    pub fn iter(&self) -> impl Iterator<Item = (u64, f32)> + '_ {
        self.samples.iter().copied()
    }

    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|(_, value)| *value).collect()
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.samples.iter().map(|(ts, _)| *ts).collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SIGNAL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_append_and_latest() {
        let mut signal = Signal::with_capacity(4);
        assert!(signal.is_empty());
        assert_eq!(signal.latest(), None);

        signal.append(1.5, 100);
        signal.append(2.5, 200);
        assert_eq!(signal.len(), 2);
        assert_eq!(signal.latest(), Some((200, 2.5)));
        assert_eq!(signal.latest_value(), Some(2.5));
    }

    #[test]
    fn test_eviction_drops_only_oldest() {
        let capacity = 10;
        let mut signal = Signal::with_capacity(capacity);
        for i in 0..=capacity {
            signal.append(i as f32, i as u64 * 10);
        }

        assert_eq!(signal.len(), capacity);
        let expected: Vec<f32> = (1..=capacity).map(|i| i as f32).collect();
        assert_eq!(signal.values(), expected);
        assert_eq!(signal.timestamps()[0], 10);
        assert_eq!(signal.latest(), Some((100, 10.0)));
    }

    #[test]
    fn test_default_capacity() {
        let signal = Signal::default();
        assert_eq!(signal.capacity(), DEFAULT_SIGNAL_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_keeps_one_sample() {
        let mut signal = Signal::with_capacity(0);
        signal.append(1.0, 1);
        signal.append(2.0, 2);
        assert_eq!(signal.len(), 1);
        assert_eq!(signal.latest(), Some((2, 2.0)));
    }

    proptest! {
        #[test]
        fn prop_values_and_timestamps_stay_aligned(
            capacity in 1usize..64,
            samples in proptest::collection::vec((any::<u64>(), -1000.0f32..1000.0), 0..200),
        ) {
            let mut signal = Signal::with_capacity(capacity);
            for (ts, value) in &samples {
                signal.append(*value, *ts);
            }

            let kept = samples.len().min(capacity);
            prop_assert_eq!(signal.len(), kept);

            let tail = &samples[samples.len() - kept..];
            let pairs: Vec<(u64, f32)> = signal.iter().collect();
            prop_assert_eq!(pairs.as_slice(), tail);
        }
    }
}
