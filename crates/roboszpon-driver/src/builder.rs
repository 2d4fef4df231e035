//! Builder 模式实现
//!
//! 提供链式构造 `Station` 实例的便捷方式。总线适配器由调用方注入。

use crate::error::DriverError;
use crate::heartbeat::duration_millis;
use crate::pipeline::PipelineConfig;
use crate::station::Station;
use roboszpon_can::SplittableAdapter;
use std::time::Duration;

/// Station Builder（链式构造）
///
/// # Example
///
/// ```
/// use roboszpon_driver::StationBuilder;
/// use roboszpon_can::MockBus;
/// use std::time::Duration;
///
/// let (_bus, adapter) = MockBus::new();
/// let station = StationBuilder::new()
///     .liveness_timeout(Duration::from_secs(2))
///     .signal_capacity(1_000)
///     .build(adapter)
///     .unwrap();
/// assert_eq!(station.config().liveness_timeout_ms, 2_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StationBuilder {
    pipeline_config: PipelineConfig,
}

impl StationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.receive_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.pipeline_config.tick_interval_ms = duration_millis(interval);
        self
    }

    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.liveness_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn default_read_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.default_read_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn signal_capacity(mut self, capacity: usize) -> Self {
        self.pipeline_config.signal_capacity = capacity;
        self
    }

    /// 应用接收超时并启动 Station
    pub fn build<C>(self, mut can: C) -> Result<Station, DriverError>
    where
        C: SplittableAdapter,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
    {
        if self.pipeline_config.tick_interval_ms == 0 {
            return Err(DriverError::InvalidInput(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        // 接收超时在拆分前设置，RX 线程据此定期检查退出标志
        can.set_receive_timeout(self.pipeline_config.receive_timeout());
        Station::new(can, self.pipeline_config)
    }
}
