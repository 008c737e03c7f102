//! Backtesting engine.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use barstream_core::aggregation::BarAggregator;
use barstream_core::error::{ConfigurationError, EngineResult};
use barstream_core::num::Num;
use barstream_core::record::{CostModelSpec, TradingRecord};
use barstream_core::router::MultiTimeFrameRouter;
use barstream_core::series::{BarSeries, SeriesRetention};
use barstream_core::types::{CandleEvent, Side, Timeframe};
use barstream_indicators::IndicatorContext;
use barstream_strategies::StrategyRegistry;

use crate::report::BacktestReport;
use crate::session::TradingSession;
use crate::statistics::{BacktestStats, PositionSummary};

/// Backtest configuration shared by every plan of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Timeframe of the input candles
    pub base_timeframe: Timeframe,
    pub retention: SeriesRetention,
    /// Capital the equity curve starts from
    pub initial_capital: f64,
    /// Amount traded by every fill
    pub trade_amount: f64,
    pub starting_side: Side,
    pub transaction_cost: CostModelSpec,
    pub holding_cost: CostModelSpec,
    /// Exit open positions at the last close
    pub close_at_end: bool,
    /// Evaluate the trailing partial aggregate at the end of the data
    pub flush_at_end: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            base_timeframe: Timeframe::Minute1,
            retention: SeriesRetention::CurrentOnly,
            initial_capital: 100_000.0,
            trade_amount: 1.0,
            starting_side: Side::Buy,
            transaction_cost: CostModelSpec::Zero,
            holding_cost: CostModelSpec::Zero,
            close_at_end: true,
            flush_at_end: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.trade_amount.is_finite() || self.trade_amount <= 0.0 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "trade amount must be positive, got {}",
                self.trade_amount
            )));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        self.transaction_cost.validate()?;
        self.holding_cost.validate()
    }
}

/// One strategy to run on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlan {
    /// Registry name of the preset
    pub strategy: String,
    pub timeframe: Timeframe,
    /// Preset parameters; missing fields take their defaults
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl StrategyPlan {
    pub fn new(strategy: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            strategy: strategy.into(),
            timeframe,
            params: serde_json::Value::Null,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// Runs strategy plans over a candle history.
///
/// Plans are independent: each owns its router, aggregator, contexts and
/// record, so they run in parallel over the shared candles.
pub struct BacktestEngine {
    config: BacktestConfig,
    registry: StrategyRegistry,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            registry: StrategyRegistry::new(),
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run every plan; reports come back in plan order.
    pub fn run<N: Num>(
        &self,
        plans: &[StrategyPlan],
        candles: &[CandleEvent],
    ) -> EngineResult<Vec<BacktestReport>> {
        self.config.validate()?;
        info!(plans = plans.len(), candles = candles.len(), precision = N::NAME, "backtest started");
        plans
            .par_iter()
            .map(|plan| self.run_plan::<N>(plan, candles))
            .collect()
    }

    /// Build the pipeline of one plan and drive it over `candles`.
    pub fn run_plan<N: Num>(
        &self,
        plan: &StrategyPlan,
        candles: &[CandleEvent],
    ) -> EngineResult<BacktestReport> {
        self.config.validate()?;
        let base = self.config.base_timeframe;

        let mut router = MultiTimeFrameRouter::<N>::new();
        router.register(BarSeries::with_retention(
            base.label(),
            base,
            self.config.retention,
        ))?;
        if plan.timeframe != base {
            router.register(BarSeries::with_retention(
                plan.timeframe.label(),
                plan.timeframe,
                self.config.retention,
            ))?;
            router.set_aggregator(BarAggregator::new(base, &[plan.timeframe])?);
        }

        let mut builder = IndicatorContext::<N>::builder(plan.strategy.as_str(), plan.timeframe);
        let strategy = self
            .registry
            .build(&plan.strategy, plan.params.clone(), &mut builder)?;
        let context = builder.build()?;
        let record = TradingRecord::new(
            self.config.starting_side,
            self.config.transaction_cost.build(),
            self.config.holding_cost.build(),
        );

        let mut session = TradingSession::new(router);
        let id = session.bind(
            context,
            strategy,
            record,
            N::from_f64(self.config.trade_amount),
        )?;

        let mut stats = BacktestStats::new(self.config.initial_capital);
        let mut sequence_errors = 0;
        let mut trades = 0;
        for event in candles {
            let seen = bars_seen(&session, id);
            match session.on_candle(event) {
                Ok(events) => trades += events.len(),
                Err(err) => {
                    warn!(strategy = %plan.strategy, error = %err, "candle rejected");
                    sequence_errors += 1;
                    continue;
                }
            }
            if bars_seen(&session, id) != seen {
                record_equity(&session, id, &mut stats);
            }
        }

        if self.config.flush_at_end {
            let seen = bars_seen(&session, id);
            trades += session.flush()?.len();
            if bars_seen(&session, id) != seen {
                record_equity(&session, id, &mut stats);
            }
        }
        if self.config.close_at_end {
            let closed = session.close_all();
            if !closed.is_empty() {
                trades += closed.len();
                revise_equity(&session, id, &mut stats);
            }
        }

        let Some(record) = session.record(id) else {
            return Err(ConfigurationError::MissingSeries(plan.timeframe).into());
        };
        let evaluated = stats.bars_processed;
        stats.finalize(record, plan.timeframe);
        let positions = record
            .positions()
            .iter()
            .filter_map(PositionSummary::from_position)
            .collect();

        info!(
            strategy = %plan.strategy,
            timeframe = %plan.timeframe,
            bars = evaluated,
            trades,
            net_profit = stats.net_profit,
            "backtest finished"
        );

        Ok(BacktestReport {
            strategy: plan.strategy.clone(),
            timeframe: plan.timeframe,
            precision: N::NAME.to_string(),
            events_processed: candles.len() - sequence_errors,
            sequence_errors,
            stats,
            positions,
        })
    }
}

fn bars_seen<N: Num>(session: &TradingSession<N>, id: crate::session::BindingId) -> u64 {
    session.runtime(id).map(|r| r.bar_count()).unwrap_or(0)
}

fn record_equity<N: Num>(
    session: &TradingSession<N>,
    id: crate::session::BindingId,
    stats: &mut BacktestStats,
) {
    if let Some((time, equity)) = equity_now(session, id, stats) {
        debug!(time, equity, "equity");
        stats.record_equity(time, equity);
    }
}

/// Restate the last bar's equity once positions are closed on it.
fn revise_equity<N: Num>(
    session: &TradingSession<N>,
    id: crate::session::BindingId,
    stats: &mut BacktestStats,
) {
    if let Some((time, equity)) = equity_now(session, id, stats) {
        debug!(time, equity, "equity revised at close");
        stats.revise_last_equity(time, equity);
    }
}

fn equity_now<N: Num>(
    session: &TradingSession<N>,
    id: crate::session::BindingId,
    stats: &BacktestStats,
) -> Option<(i64, f64)> {
    let runtime = session.runtime(id)?;
    let record = session.record(id)?;
    let time = runtime.time()?;
    Some((time, stats.equity_of(record, runtime.price())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use barstream_core::error::{EngineError, StrategyError};
    use barstream_core::num::DecimalNum;

    fn generate_candles(count: i64) -> Vec<CandleEvent> {
        (0..count)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.2).sin() * 10.0;
                CandleEvent::new(
                    Timeframe::Minute1,
                    i * 60_000,
                    price,
                    price + 1.0,
                    price - 1.0,
                    price + 0.5,
                    1_000.0,
                )
            })
            .collect()
    }

    fn crossover_plan(timeframe: Timeframe) -> StrategyPlan {
        StrategyPlan::new("ma_crossover", timeframe).with_params(serde_json::json!({
            "fast_period": 3,
            "slow_period": 8,
            "use_ema": false
        }))
    }

    #[test]
    fn test_backtest_runs() {
        let engine = BacktestEngine::new(BacktestConfig {
            close_at_end: false,
            ..Default::default()
        });
        let report = engine
            .run_plan::<f64>(&crossover_plan(Timeframe::Minute1), &generate_candles(300))
            .unwrap();

        assert_eq!(report.stats.bars_processed, 300);
        assert!(report.stats.total_positions > 0);
        assert_eq!(report.positions.len(), report.stats.total_positions);
        assert_eq!(report.sequence_errors, 0);
        assert_eq!(report.precision, "f64");
    }

    #[test]
    fn test_close_at_end_counts_no_extra_bar() {
        let engine = BacktestEngine::new(BacktestConfig {
            close_at_end: true,
            ..Default::default()
        });
        let report = engine
            .run_plan::<f64>(&crossover_plan(Timeframe::Minute1), &generate_candles(300))
            .unwrap();

        assert_eq!(report.stats.bars_processed, 300);
        assert_eq!(report.stats.equity_curve.len(), 300);
        assert!(report
            .stats
            .equity_curve
            .windows(2)
            .all(|pair| pair[0].0 < pair[1].0));
        assert_eq!(
            report.stats.final_equity,
            report.stats.initial_capital + report.stats.net_profit
        );
    }

    #[test]
    fn test_aggregated_plan_sees_fewer_bars() {
        let engine = BacktestEngine::new(BacktestConfig {
            close_at_end: false,
            ..Default::default()
        });
        let report = engine
            .run_plan::<f64>(&crossover_plan(Timeframe::Minute5), &generate_candles(300))
            .unwrap();
        assert_eq!(report.stats.bars_processed, 60);
    }

    #[test]
    fn test_parallel_plans_keep_order() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let plans = vec![
            crossover_plan(Timeframe::Minute1),
            StrategyPlan::new("rsi_reversion", Timeframe::Minute5),
            StrategyPlan::new("channel_breakout", Timeframe::Minute15),
        ];
        let reports = engine.run::<f64>(&plans, &generate_candles(600)).unwrap();
        let names: Vec<_> = reports.iter().map(|r| r.strategy.as_str()).collect();
        assert_eq!(names, vec!["ma_crossover", "rsi_reversion", "channel_breakout"]);
        assert_eq!(reports[2].timeframe, Timeframe::Minute15);
    }

    #[test]
    fn test_decimal_precision() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let plan = crossover_plan(Timeframe::Minute1);
        let candles = generate_candles(200);
        let double = engine.run_plan::<f64>(&plan, &candles).unwrap();
        let decimal = engine.run_plan::<DecimalNum>(&plan, &candles).unwrap();
        assert_eq!(decimal.precision, "decimal");
        assert!(double.stats.total_positions > 0);
        assert!(decimal.stats.total_positions > 0);
    }

    #[test]
    fn test_out_of_order_candles_are_counted() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let mut candles = generate_candles(20);
        candles.swap(5, 6);
        let report = engine
            .run_plan::<f64>(&crossover_plan(Timeframe::Minute1), &candles)
            .unwrap();
        assert_eq!(report.sequence_errors, 1);
        assert_eq!(report.events_processed, 19);
    }

    #[test]
    fn test_invalid_plans() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let candles = generate_candles(10);

        let unknown = StrategyPlan::new("nope", Timeframe::Minute1);
        assert!(matches!(
            engine.run_plan::<f64>(&unknown, &candles),
            Err(EngineError::Strategy(StrategyError::NotFound(_)))
        ));

        let engine_5m = BacktestEngine::new(BacktestConfig {
            base_timeframe: Timeframe::Minute5,
            ..Default::default()
        });
        assert!(matches!(
            engine_5m.run_plan::<f64>(&crossover_plan(Timeframe::Minute1), &candles),
            Err(EngineError::Configuration(
                ConfigurationError::InvalidAggregationRatio { .. }
            ))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let engine = BacktestEngine::new(BacktestConfig {
            trade_amount: 0.0,
            ..Default::default()
        });
        assert!(engine
            .run::<f64>(&[crossover_plan(Timeframe::Minute1)], &generate_candles(5))
            .is_err());
    }
}
