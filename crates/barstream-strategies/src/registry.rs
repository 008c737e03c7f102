//! Strategy registry for building presets by name.

use std::collections::BTreeMap;

use barstream_core::error::StrategyError;
use barstream_core::num::Num;
use barstream_indicators::IndicatorContextBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::presets::{
    ChannelBreakoutConfig, MaCrossoverConfig, RsiReversionConfig, StrategyConfig,
};
use crate::strategy::Strategy;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

impl StrategyInfo {
    fn of<C: StrategyConfig>() -> Self {
        Self {
            name: C::NAME.to_string(),
            description: C::DESCRIPTION.to_string(),
            default_config: serde_json::to_value(C::default()).unwrap_or_default(),
        }
    }
}

/// Registry of the built-in preset strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, StrategyInfo>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert(MaCrossoverConfig::NAME, StrategyInfo::of::<MaCrossoverConfig>());
        strategies.insert(
            ChannelBreakoutConfig::NAME,
            StrategyInfo::of::<ChannelBreakoutConfig>(),
        );
        strategies.insert(RsiReversionConfig::NAME, StrategyInfo::of::<RsiReversionConfig>());
        Self { strategies }
    }

    /// List all available strategies, sorted by name.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    /// Build a strategy from JSON parameters, registering its indicators on
    /// `builder`. Missing parameters take their default value.
    pub fn build<N: Num>(
        &self,
        name: &str,
        params: serde_json::Value,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError> {
        match name {
            MaCrossoverConfig::NAME => build_preset::<MaCrossoverConfig, N>(params, builder),
            ChannelBreakoutConfig::NAME => build_preset::<ChannelBreakoutConfig, N>(params, builder),
            RsiReversionConfig::NAME => build_preset::<RsiReversionConfig, N>(params, builder),
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Build a strategy with its default configuration.
    pub fn build_default<N: Num>(
        &self,
        name: &str,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.build(name, info.default_config.clone(), builder)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn build_preset<C: StrategyConfig, N: Num>(
    params: serde_json::Value,
    builder: &mut IndicatorContextBuilder<N>,
) -> Result<Strategy<N>, StrategyError> {
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    let config: C =
        serde_json::from_value(params).map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    debug!(strategy = C::NAME, timeframe = %builder.timeframe(), "building preset");
    config.build(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use barstream_core::types::Timeframe;
    use barstream_indicators::IndicatorContext;

    fn builder() -> IndicatorContextBuilder<f64> {
        IndicatorContext::builder("registry", Timeframe::Minute5)
    }

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["channel_breakout", "ma_crossover", "rsi_reversion"]
        );
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_registry_get() {
        let registry = StrategyRegistry::new();

        let info = registry.get("ma_crossover").unwrap();
        assert_eq!(info.default_config["fast_period"], 12);
        assert!(registry.get("unknown").is_none());
        assert!(registry.exists("rsi_reversion"));
    }

    #[test]
    fn test_build_default() {
        let registry = StrategyRegistry::new();
        let mut builder = builder();

        let strategy = registry.build_default("ma_crossover", &mut builder).unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
        assert!(builder.id_of("ema(12)").is_some());
        assert!(builder.id_of("ema(26)").is_some());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_with_params() {
        let registry = StrategyRegistry::new();
        let mut builder = builder();
        let params = serde_json::json!({ "fast_period": 5, "slow_period": 10, "use_ema": false });

        registry.build("ma_crossover", params, &mut builder).unwrap();
        assert!(builder.id_of("sma(5)").is_some());
    }

    #[test]
    fn test_null_params_mean_defaults() {
        let registry = StrategyRegistry::new();
        let mut builder = builder();
        assert!(registry
            .build("channel_breakout", serde_json::Value::Null, &mut builder)
            .is_ok());
    }

    #[test]
    fn test_two_presets_share_indicators() {
        let registry = StrategyRegistry::new();
        let mut builder = builder();
        registry.build_default("ma_crossover", &mut builder).unwrap();
        let before = builder.len();
        registry.build_default("ma_crossover", &mut builder).unwrap();
        assert_eq!(builder.len(), before);
    }

    #[test]
    fn test_invalid_params() {
        let registry = StrategyRegistry::new();
        let mut builder = builder();

        let bad_type = serde_json::json!({ "period": "fourteen" });
        assert!(matches!(
            registry.build("rsi_reversion", bad_type, &mut builder),
            Err(StrategyError::InvalidConfig(_))
        ));

        let bad_value = serde_json::json!({ "fast_period": 30, "slow_period": 10 });
        assert!(matches!(
            registry.build("ma_crossover", bad_value, &mut builder),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_strategy() {
        let registry = StrategyRegistry::new();
        assert!(matches!(
            registry.build_default("unknown", &mut builder()),
            Err(StrategyError::NotFound(_))
        ));
    }
}
