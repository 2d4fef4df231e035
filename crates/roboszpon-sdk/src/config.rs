//! 配置文件到驱动配置的转换

use roboszpon_driver::{PipelineConfig, StationBuilder};
use roboszpon_tools::StationConfig;

/// 由站点配置生成 Pipeline 配置
pub fn pipeline_config(config: &StationConfig) -> PipelineConfig {
    PipelineConfig {
        receive_timeout_ms: config.pipeline.receive_timeout_ms,
        tick_interval_ms: config.pipeline.tick_interval_ms,
        liveness_timeout_ms: config.pipeline.liveness_timeout_ms,
        default_read_timeout_ms: config.pipeline.default_read_timeout_ms,
        signal_capacity: config.telemetry.signal_capacity,
    }
}

/// 由站点配置生成 Builder
pub fn station_builder(config: &StationConfig) -> StationBuilder {
    StationBuilder::new().pipeline_config(pipeline_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_agree() {
        assert_eq!(
            pipeline_config(&StationConfig::default()),
            PipelineConfig::default()
        );
    }

    #[test]
    fn test_overrides_carry_through() {
        let config = StationConfig::from_toml_str(
            r#"
            [pipeline]
            tick_interval_ms = 20
            [telemetry]
            signal_capacity = 64
            "#,
        )
        .unwrap();
        let pipeline = pipeline_config(&config);
        assert_eq!(pipeline.tick_interval_ms, 20);
        assert_eq!(pipeline.signal_capacity, 64);
        assert_eq!(pipeline.liveness_timeout_ms, 1_000);
    }
}
