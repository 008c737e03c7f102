//! Backtest command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use barstream_backtest::{BacktestConfig, BacktestEngine, BacktestReport, StrategyPlan};
use barstream_config::{AppConfig, Precision};
use barstream_core::num::{DecimalNum, Num};
use barstream_core::types::CandleEvent;
use barstream_data::load_csv;
use tracing::info;

use crate::cli::{BacktestArgs, OutputFormat};

pub fn run(args: BacktestArgs, settings: &AppConfig) -> Result<()> {
    let timeframe = args.timeframe.unwrap_or(settings.engine.base_timeframe);
    let precision = args.precision.unwrap_or(settings.engine.precision);

    let plans = plans(&args, settings)?;
    if plans.is_empty() {
        anyhow::bail!("No strategy plans configured; pass --strategy or add [[backtest.plans]]");
    }

    let candles = load_csv(&args.data, timeframe)
        .with_context(|| format!("failed to load candles from {}", args.data.display()))?;
    info!(
        path = %args.data.display(),
        %timeframe,
        candles = candles.len(),
        plans = plans.len(),
        %precision,
        "starting backtest"
    );

    let engine = BacktestEngine::new(BacktestConfig {
        base_timeframe: timeframe,
        retention: settings.engine.retention,
        initial_capital: settings.backtest.initial_capital,
        trade_amount: settings.backtest.trade_amount,
        starting_side: settings.backtest.starting_side,
        transaction_cost: settings.costs.transaction,
        holding_cost: settings.costs.holding,
        close_at_end: settings.backtest.close_at_end,
        flush_at_end: settings.backtest.flush_at_end,
    });

    let reports = match precision {
        Precision::Double => execute::<f64>(&engine, &plans, &candles)?,
        Precision::Decimal => execute::<DecimalNum>(&engine, &plans, &candles)?,
    };

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.summary());
            }
        }
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, serde_json::to_string_pretty(&reports)?)
            .with_context(|| format!("failed to write {}", save_path.display()))?;
        info!(path = %save_path.display(), "results saved");
    }

    if let Some(dir) = &args.equity_dir {
        write_equity_curves(dir, &reports)?;
    }

    Ok(())
}

/// Plans from the command line, or the configured ones.
fn plans(args: &BacktestArgs, settings: &AppConfig) -> Result<Vec<StrategyPlan>> {
    if let Some(strategy) = &args.strategy {
        let timeframe = args
            .target
            .or(args.timeframe)
            .unwrap_or(settings.engine.base_timeframe);
        let mut plan = StrategyPlan::new(strategy.clone(), timeframe);
        if let Some(params) = &args.params {
            let params: serde_json::Value =
                serde_json::from_str(params).context("--params is not valid JSON")?;
            plan = plan.with_params(params);
        }
        return Ok(vec![plan]);
    }

    Ok(settings
        .backtest
        .plans
        .iter()
        .map(|plan| {
            StrategyPlan::new(plan.strategy.clone(), plan.timeframe).with_params(plan.params.clone())
        })
        .collect())
}

fn execute<N: Num>(
    engine: &BacktestEngine,
    plans: &[StrategyPlan],
    candles: &[CandleEvent],
) -> Result<Vec<BacktestReport>> {
    Ok(engine.run::<N>(plans, candles)?)
}

fn write_equity_curves(dir: &Path, reports: &[BacktestReport]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (index, report) in reports.iter().enumerate() {
        let path = dir.join(format!(
            "{index:02}_{}_{}.csv",
            report.strategy, report.timeframe
        ));
        std::fs::write(&path, report.equity_to_csv())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "equity curve saved");
    }
    Ok(())
}
