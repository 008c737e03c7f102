//! Single-asset trading session: router, per-timeframe contexts, strategies
//! and their trading records, driven one event at a time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use barstream_core::error::{ConfigurationError, SequenceError};
use barstream_core::num::Num;
use barstream_core::record::{Trade, TradingRecord};
use barstream_core::router::MultiTimeFrameRouter;
use barstream_core::runtime::RuntimeContext;
use barstream_core::traits::ListenerHandle;
use barstream_core::types::{Bar, CandleEvent, Timeframe};
use barstream_indicators::IndicatorContext;
use barstream_strategies::{RuleContext, Strategy};

/// Index of a strategy bound to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(usize);

impl BindingId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A trade recorded by one of the session's strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent<N> {
    pub binding: BindingId,
    pub timeframe: Timeframe,
    pub trade: Trade<N>,
}

/// A strategy evaluated on every bar of one timeframe.
struct Binding<N: Num> {
    timeframe: Timeframe,
    indicators: ListenerHandle<IndicatorContext<N>>,
    runtime: ListenerHandle<RuntimeContext<N>>,
    strategy: Strategy<N>,
    record: TradingRecord<N>,
    amount: N,
}

enum Action {
    Enter,
    Exit,
}

/// Wires `router → series → [indicator context, runtime context] → rules →
/// trading record` for one asset.
///
/// Each incoming event is routed synchronously; every strategy bound to a
/// timeframe that received a bar is evaluated before the call returns.
pub struct TradingSession<N: Num> {
    router: MultiTimeFrameRouter<N>,
    bindings: Vec<Binding<N>>,
}

impl<N: Num> TradingSession<N> {
    pub fn new(router: MultiTimeFrameRouter<N>) -> Self {
        Self {
            router,
            bindings: Vec::new(),
        }
    }

    /// Bind a strategy to the series of `indicators.timeframe()`.
    ///
    /// The indicator context and a fresh runtime context are registered as
    /// listeners on that series, in that order. Every fill trades `amount`.
    pub fn bind(
        &mut self,
        indicators: IndicatorContext<N>,
        strategy: Strategy<N>,
        record: TradingRecord<N>,
        amount: N,
    ) -> Result<BindingId, ConfigurationError> {
        let timeframe = indicators.timeframe();
        let series = self
            .router
            .series_mut(timeframe)
            .ok_or(ConfigurationError::MissingSeries(timeframe))?;
        let context_name = indicators.name().to_string();
        let indicators = series.add_listener(indicators);
        let runtime = series.add_listener(RuntimeContext::new());

        let id = BindingId(self.bindings.len());
        info!(strategy = strategy.name(), context = %context_name, %timeframe, binding = id.0, "strategy bound");
        self.bindings.push(Binding {
            timeframe,
            indicators,
            runtime,
            strategy,
            record,
            amount,
        });
        Ok(id)
    }

    pub fn on_candle(&mut self, event: &CandleEvent) -> Result<Vec<TradeEvent<N>>, SequenceError> {
        self.on_bar(Bar::from_candle(event))
    }

    /// Route a bar and evaluate every strategy whose timeframe was updated.
    pub fn on_bar(&mut self, bar: Bar<N>) -> Result<Vec<TradeEvent<N>>, SequenceError> {
        let delivered = self.router.route_bar(bar)?;
        Ok(self.evaluate(&delivered))
    }

    /// Drain partial aggregates and evaluate on them.
    pub fn flush(&mut self) -> Result<Vec<TradeEvent<N>>, SequenceError> {
        let delivered = self.router.flush()?;
        Ok(self.evaluate(&delivered))
    }

    /// Exit every open position at its timeframe's latest close.
    pub fn close_all(&mut self) -> Vec<TradeEvent<N>> {
        let mut events = Vec::new();
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            if !binding.record.is_in_position() {
                continue;
            }
            let Some(series) = self.router.series_mut(binding.timeframe) else {
                continue;
            };
            let Some(bar) = series.current().copied() else {
                continue;
            };
            if binding.record.exit(bar.end_time, bar.close, binding.amount) {
                if let Some(runtime) = series.listener_mut(binding.runtime) {
                    runtime.update_position(binding.record.snapshot());
                }
                if let Some(trade) = binding.record.last_trade().copied() {
                    debug!(binding = index, timeframe = %binding.timeframe, price = %trade.price, "position closed at end of stream");
                    events.push(TradeEvent {
                        binding: BindingId(index),
                        timeframe: binding.timeframe,
                        trade,
                    });
                }
            }
        }
        events
    }

    fn evaluate(&mut self, delivered: &[Timeframe]) -> Vec<TradeEvent<N>> {
        let mut events = Vec::new();
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            if !delivered.contains(&binding.timeframe) {
                continue;
            }
            let Some(series) = self.router.series_mut(binding.timeframe) else {
                continue;
            };
            if let Some(event) = Self::step(BindingId(index), binding, series) {
                events.push(event);
            }
        }
        events
    }

    /// Mark to market, ask the strategy and apply its decision.
    fn step(
        id: BindingId,
        binding: &mut Binding<N>,
        series: &mut barstream_core::series::BarSeries<N>,
    ) -> Option<TradeEvent<N>> {
        let (price, time, action) = {
            let indicators = series.listener(binding.indicators)?;
            let runtime = series.listener(binding.runtime)?;
            let price = runtime.price();
            let time = runtime.time()?;
            binding.record.mark_to_market(price);

            let ctx = RuleContext::new(indicators, runtime, &binding.record);
            let action = if binding.record.is_in_position() {
                binding.strategy.should_exit(&ctx).then_some(Action::Exit)
            } else {
                binding.strategy.should_enter(&ctx).then_some(Action::Enter)
            };
            (price, time, action?)
        };

        let applied = match action {
            Action::Enter => binding.record.enter(time, price, binding.amount),
            Action::Exit => binding.record.exit(time, price, binding.amount),
        };
        if !applied {
            return None;
        }
        if let Some(runtime) = series.listener_mut(binding.runtime) {
            runtime.update_position(binding.record.snapshot());
        }

        let trade = *binding.record.last_trade()?;
        debug!(
            strategy = binding.strategy.name(),
            timeframe = %binding.timeframe,
            side = %trade.side,
            price = %trade.price,
            amount = %trade.amount,
            cost = %trade.cost,
            "trade recorded"
        );
        Some(TradeEvent {
            binding: id,
            timeframe: binding.timeframe,
            trade,
        })
    }

    pub fn router(&self) -> &MultiTimeFrameRouter<N> {
        &self.router
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn record(&self, id: BindingId) -> Option<&TradingRecord<N>> {
        self.bindings.get(id.0).map(|b| &b.record)
    }

    pub fn strategy(&self, id: BindingId) -> Option<&Strategy<N>> {
        self.bindings.get(id.0).map(|b| &b.strategy)
    }

    pub fn indicators(&self, id: BindingId) -> Option<&IndicatorContext<N>> {
        let binding = self.bindings.get(id.0)?;
        self.router
            .series(binding.timeframe)?
            .listener(binding.indicators)
    }

    pub fn runtime(&self, id: BindingId) -> Option<&RuntimeContext<N>> {
        let binding = self.bindings.get(id.0)?;
        self.router.series(binding.timeframe)?.listener(binding.runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barstream_core::aggregation::BarAggregator;
    use barstream_core::record::CostModelSpec;
    use barstream_core::series::BarSeries;
    use barstream_core::types::{OrderType, Side};
    use barstream_indicators::PriceIndicator;
    use barstream_strategies::{BooleanRule, OverThreshold, UnderThreshold};

    const MIN: i64 = 60_000;

    fn minute(i: i64, close: f64) -> Bar<f64> {
        Bar::new(Timeframe::Minute1, i * MIN, close, close, close, close, 1.0)
    }

    fn router(targets: &[Timeframe]) -> MultiTimeFrameRouter<f64> {
        let mut router = MultiTimeFrameRouter::new();
        router
            .register(BarSeries::new("1m", Timeframe::Minute1))
            .unwrap();
        for &tf in targets {
            router.register(BarSeries::new(tf.label(), tf)).unwrap();
        }
        if !targets.is_empty() {
            router.set_aggregator(BarAggregator::new(Timeframe::Minute1, targets).unwrap());
        }
        router
    }

    /// Enter above `enter`, exit below `exit`, on the close.
    fn threshold_binding(
        session: &mut TradingSession<f64>,
        timeframe: Timeframe,
        enter: f64,
        exit: f64,
    ) -> BindingId {
        let mut builder = IndicatorContext::builder("thresholds", timeframe);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let strategy = Strategy::new(
            "thresholds",
            OverThreshold::new(close, enter),
            UnderThreshold::new(close, exit),
        );
        session
            .bind(
                builder.build().unwrap(),
                strategy,
                TradingRecord::without_costs(Side::Buy),
                1.0,
            )
            .unwrap()
    }

    #[test]
    fn test_bind_requires_series() {
        let mut session = TradingSession::new(router(&[]));
        let context = IndicatorContext::builder("x", Timeframe::Hour1).build().unwrap();
        let strategy = Strategy::new("s", BooleanRule::TRUE, BooleanRule::FALSE);
        let result = session.bind(context, strategy, TradingRecord::without_costs(Side::Buy), 1.0);
        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::MissingSeries(Timeframe::Hour1)
        );
    }

    #[test]
    fn test_enter_and_exit_round_trip() {
        let mut session = TradingSession::new(router(&[]));
        let id = threshold_binding(&mut session, Timeframe::Minute1, 105.0, 95.0);

        let closes = [100.0, 106.0, 107.0, 94.0, 100.0];
        let mut events = Vec::new();
        for (i, close) in closes.into_iter().enumerate() {
            events.extend(session.on_bar(minute(i as i64, close)).unwrap());
        }

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].trade.order_type, OrderType::Open);
        assert_eq!(events[0].trade.price, 106.0);
        assert_eq!(events[0].trade.time, 2 * MIN);
        assert_eq!(events[1].trade.order_type, OrderType::Close);
        assert_eq!(events[1].trade.price, 94.0);

        let record = session.record(id).unwrap();
        assert_eq!(record.position_count(), 1);
        assert_eq!(record.total_gross_profit(), -12.0);
        assert!(!record.is_in_position());
        assert!(session.runtime(id).unwrap().bars_in_position().is_none());
    }

    #[test]
    fn test_runtime_tracks_open_position() {
        let mut session = TradingSession::new(router(&[]));
        let id = threshold_binding(&mut session, Timeframe::Minute1, 105.0, 95.0);
        session.on_bar(minute(0, 110.0)).unwrap();
        session.on_bar(minute(1, 111.0)).unwrap();

        let runtime = session.runtime(id).unwrap();
        assert_eq!(runtime.position().entry_price, Some(110.0));
        assert_eq!(runtime.bars_in_position(), Some(1));
    }

    #[test]
    fn test_aggregated_timeframe_is_evaluated_on_completion() {
        let mut session = TradingSession::new(router(&[Timeframe::Minute5]));
        let id = threshold_binding(&mut session, Timeframe::Minute5, 105.0, 0.0);

        // The 5m close is 110 once minute 4 arrives.
        let mut trade_bar = None;
        for i in 0..10 {
            let events = session.on_bar(minute(i, 100.0 + i as f64 * 2.5)).unwrap();
            if !events.is_empty() {
                trade_bar = Some(i);
                assert_eq!(events[0].timeframe, Timeframe::Minute5);
            }
        }
        assert_eq!(trade_bar, Some(4));
        assert_eq!(session.record(id).unwrap().last_entry().unwrap().price, 110.0);
        assert_eq!(session.indicators(id).unwrap().bars_seen(), 2);
    }

    #[test]
    fn test_sequence_error_leaves_state() {
        let mut session = TradingSession::new(router(&[]));
        let id = threshold_binding(&mut session, Timeframe::Minute1, 105.0, 95.0);
        session.on_bar(minute(3, 100.0)).unwrap();

        let err = session.on_bar(minute(2, 200.0)).unwrap_err();
        assert!(matches!(err, SequenceError::PastCandle { .. }));
        assert_eq!(session.indicators(id).unwrap().bars_seen(), 1);
        assert!(!session.record(id).unwrap().is_in_position());
    }

    #[test]
    fn test_close_all_exits_open_positions() {
        let mut session = TradingSession::new(router(&[]));
        let id = threshold_binding(&mut session, Timeframe::Minute1, 105.0, 95.0);
        session.on_bar(minute(0, 110.0)).unwrap();
        session.on_bar(minute(1, 120.0)).unwrap();

        let events = session.close_all();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trade.price, 120.0);
        assert_eq!(session.record(id).unwrap().total_gross_profit(), 10.0);
        assert!(session.close_all().is_empty());
    }

    #[test]
    fn test_transaction_costs_reach_record() {
        let mut session = TradingSession::new(router(&[]));
        let mut builder = IndicatorContext::builder("always", Timeframe::Minute1);
        builder.add("close", PriceIndicator::close()).unwrap();
        let strategy = Strategy::new("always", BooleanRule::TRUE, BooleanRule::TRUE);
        let record = TradingRecord::new(
            Side::Buy,
            CostModelSpec::Fixed { fee: 1.5 }.build(),
            CostModelSpec::Zero.build(),
        );
        let id = session
            .bind(builder.build().unwrap(), strategy, record, 2.0)
            .unwrap();

        for i in 0..4 {
            session.on_bar(minute(i, 100.0)).unwrap();
        }
        let record = session.record(id).unwrap();
        assert_eq!(record.position_count(), 2);
        assert_eq!(record.total_transaction_cost(), 6.0);
    }
}
