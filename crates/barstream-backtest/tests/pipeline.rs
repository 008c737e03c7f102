//! End-to-end runs: CSV candles through routing, aggregation, indicators,
//! rules and the trading record.

use barstream_backtest::{BacktestConfig, BacktestEngine, StrategyPlan, TradingSession};
use barstream_core::aggregation::BarAggregator;
use barstream_core::num::DecimalNum;
use barstream_core::record::{CostModelSpec, TradingRecord};
use barstream_core::router::MultiTimeFrameRouter;
use barstream_core::series::BarSeries;
use barstream_core::types::{CandleEvent, OrderType, Side, Timeframe};
use barstream_data::CsvCandleSource;
use barstream_indicators::{IndicatorContext, PriceIndicator, Sma};
use barstream_strategies::{BooleanRule, CrossedUp, OverIndicator, Strategy, UnderThreshold};
use rust_decimal_macros::dec;

const MIN: i64 = 60_000;

fn csv_candles() -> Vec<CandleEvent> {
    let mut data = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..240_i64 {
        let close = 100.0 + ((i as f64) * 0.15).sin() * 8.0 + (i as f64) * 0.01;
        // Millisecond timestamps need more than 10 digits
        let ts = 1_700_000_040_000 + i * MIN;
        data.push_str(&format!(
            "{ts},{o},{h},{l},{close},100\n",
            o = close - 0.2,
            h = close + 0.5,
            l = close - 0.5,
        ));
    }
    CsvCandleSource::from_reader(data.as_bytes(), Timeframe::Minute1).unwrap()
}

#[test]
fn backtest_from_csv_is_consistent() {
    let candles = csv_candles();
    let engine = BacktestEngine::new(BacktestConfig {
        transaction_cost: CostModelSpec::Linear { rate: 0.001 },
        ..Default::default()
    });
    let plans = vec![
        StrategyPlan::new("ma_crossover", Timeframe::Minute1)
            .with_params(serde_json::json!({ "fast_period": 5, "slow_period": 15 })),
        StrategyPlan::new("channel_breakout", Timeframe::Minute5)
            .with_params(serde_json::json!({ "entry_period": 4, "exit_period": 3 })),
    ];

    let reports = engine.run::<f64>(&plans, &candles).unwrap();
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(report.sequence_errors, 0);
        assert_eq!(report.positions.len(), report.stats.total_positions);

        let net: f64 = report.positions.iter().map(|p| p.net_profit).sum();
        assert!((net - report.stats.net_profit).abs() < 1e-6);
        assert!(report.stats.gross_profit - report.stats.net_profit >= 0.0);
        for position in &report.positions {
            assert!(position.exit_time > position.entry_time);
        }
    }
}

#[test]
fn decimal_backtest_reports_precision() {
    let engine = BacktestEngine::new(BacktestConfig::default());
    let plan = StrategyPlan::new("rsi_reversion", Timeframe::Minute5)
        .with_params(serde_json::json!({ "period": 5 }));
    let report = engine
        .run_plan::<DecimalNum>(&plan, &csv_candles())
        .unwrap();
    assert_eq!(report.precision, "decimal");
    assert!(report.stats.bars_processed >= 48);
}

/// Five one-minute bars fold into the expected 5m bar, which drives a
/// strategy bound to the 5m series while a second strategy trades 1m bars.
#[test]
fn multi_timeframe_session() {
    let mut router = MultiTimeFrameRouter::<DecimalNum>::new();
    router
        .register(BarSeries::new("1m", Timeframe::Minute1))
        .unwrap();
    router
        .register(BarSeries::new("5m", Timeframe::Minute5))
        .unwrap();
    router.set_aggregator(BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap());
    let mut session = TradingSession::new(router);

    // 5m: buy once the aggregated close is above 105
    let mut builder = IndicatorContext::builder("five", Timeframe::Minute5);
    let close = builder.add("close", PriceIndicator::close()).unwrap();
    let level = builder
        .add("level", barstream_indicators::Constant::new(DecimalNum::from(dec!(105))))
        .unwrap();
    let five = session
        .bind(
            builder.build().unwrap(),
            Strategy::new("five", OverIndicator::new(close, level), BooleanRule::FALSE),
            TradingRecord::without_costs(Side::Buy),
            DecimalNum::from(dec!(2)),
        )
        .unwrap();

    // 1m: short on a cross above the 2-bar SMA, cover below 95
    let mut builder = IndicatorContext::builder("one", Timeframe::Minute1);
    let close = builder.add("close", PriceIndicator::close()).unwrap();
    let sma = builder.add("sma", Sma::new(close, 2).unwrap()).unwrap();
    let cross = CrossedUp::register(&mut builder, close, sma).unwrap();
    let one = session
        .bind(
            builder.build().unwrap(),
            Strategy::new(
                "one",
                cross,
                UnderThreshold::new(close, DecimalNum::from(dec!(95))),
            ),
            TradingRecord::without_costs(Side::Sell),
            DecimalNum::from(dec!(1)),
        )
        .unwrap();

    let bars = [
        (100, 105, 99, 102, 1000),
        (102, 108, 101, 107, 1500),
        (107, 110, 104, 104, 800),
        (104, 106, 90, 95, 1200),
        (95, 114, 94, 109, 600),
    ];
    let mut five_trades = Vec::new();
    for (i, (o, h, l, c, v)) in bars.into_iter().enumerate() {
        let event = CandleEvent::new(
            Timeframe::Minute1,
            i as i64 * MIN,
            o as f64,
            h as f64,
            l as f64,
            c as f64,
            v as f64,
        );
        for event in session.on_candle(&event).unwrap() {
            if event.timeframe == Timeframe::Minute5 {
                five_trades.push(event);
            }
        }
    }

    let five_series = session.router().series(Timeframe::Minute5).unwrap();
    let aggregate = five_series.current().unwrap();
    assert_eq!(aggregate.open.decimal(), Some(dec!(100)));
    assert_eq!(aggregate.high.decimal(), Some(dec!(114)));
    assert_eq!(aggregate.low.decimal(), Some(dec!(90)));
    assert_eq!(aggregate.close.decimal(), Some(dec!(109)));
    assert_eq!(aggregate.volume.decimal(), Some(dec!(5100)));
    assert_eq!(aggregate.end_time, 5 * MIN);

    assert_eq!(five_trades.len(), 1);
    assert_eq!(five_trades[0].trade.order_type, OrderType::Open);
    assert_eq!(five_trades[0].trade.price.decimal(), Some(dec!(109)));
    assert!(session.record(five).unwrap().is_in_position());

    // 1m: closes 102, 107, 104, 95, 109; the SMA(2) exists from bar 2 on.
    // Bar 3 (104 vs 105.5) is below, bar 5 (109 vs 102) crosses above after
    // bar 4 (95 vs 99.5) was below. The short opened at 109 stays open.
    let record = session.record(one).unwrap();
    assert!(record.is_in_position());
    assert_eq!(
        record.last_entry().unwrap().price.decimal(),
        Some(dec!(109))
    );
    assert_eq!(record.last_entry().unwrap().side, Side::Sell);
}
