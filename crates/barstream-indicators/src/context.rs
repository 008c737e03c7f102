//! Per-timeframe indicator registry driving updates in dependency order.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info};

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{BarListener, Indicator, IndicatorId, InputValues};
use barstream_core::types::{Bar, Timeframe};

/// Notified by an [`IndicatorContext`] after each bar.
pub trait ContextObserver<N: Num>: Send {
    /// Called after every indicator processed `bar`. `changed` lists the
    /// indicators whose value differs from the previous bar.
    fn on_update(&mut self, context: &IndicatorContext<N>, bar: &Bar<N>, changed: &[IndicatorId]);

    /// Called once, on the bar where every indicator became stable.
    fn on_stable(&mut self, context: &IndicatorContext<N>, bar: &Bar<N>) {
        let _ = (context, bar);
    }
}

struct Entry<N: Num> {
    name: String,
    indicator: Box<dyn Indicator<N>>,
}

/// Collects indicators and wiring before the context is frozen.
///
/// Registration hands out [`IndicatorId`] tokens; [`build`](Self::build)
/// validates the inputs, computes the evaluation order and fails on cycles.
pub struct IndicatorContextBuilder<N: Num> {
    name: String,
    timeframe: Timeframe,
    entries: Vec<Entry<N>>,
    by_name: HashMap<String, IndicatorId>,
    observers: Vec<Box<dyn ContextObserver<N>>>,
}

impl<N: Num> IndicatorContextBuilder<N> {
    pub fn new(name: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            name: name.into(),
            timeframe,
            entries: Vec::new(),
            by_name: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Register an indicator under a unique name.
    pub fn add<I>(&mut self, name: impl Into<String>, indicator: I) -> Result<IndicatorId, ConfigurationError>
    where
        I: Indicator<N> + 'static,
    {
        self.add_boxed(name, Box::new(indicator))
    }

    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        indicator: Box<dyn Indicator<N>>,
    ) -> Result<IndicatorId, ConfigurationError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ConfigurationError::DuplicateIndicator(name));
        }
        let id = IndicatorId::from_index(self.entries.len());
        debug!(context = %self.name, indicator = %name, kind = indicator.name(), %id, "indicator registered");
        self.by_name.insert(name.clone(), id);
        self.entries.push(Entry { name, indicator });
        Ok(id)
    }

    /// Return the indicator registered as `name`, or register the one built
    /// by `make` under that name.
    pub fn get_or_add<I, F>(&mut self, name: &str, make: F) -> Result<IndicatorId, ConfigurationError>
    where
        I: Indicator<N> + 'static,
        F: FnOnce() -> Result<I, ConfigurationError>,
    {
        match self.by_name.get(name) {
            Some(&id) => Ok(id),
            None => self.add(name, make()?),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: IndicatorId) -> Option<&str> {
        self.entries.get(id.index()).map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn observe(&mut self, observer: impl ContextObserver<N> + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Freeze the registry into a runnable context.
    pub fn build(self) -> Result<IndicatorContext<N>, ConfigurationError> {
        let count = self.entries.len();

        for entry in &self.entries {
            for input in entry.indicator.inputs() {
                if input.index() >= count {
                    return Err(ConfigurationError::UnknownIndicator {
                        indicator: entry.name.clone(),
                        input: input.index(),
                    });
                }
            }
        }

        // Kahn's algorithm; ties resolve in registration order.
        let mut indegree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, entry) in self.entries.iter().enumerate() {
            for input in entry.indicator.inputs() {
                indegree[index] += 1;
                dependents[input.index()].push(index);
            }
        }
        let mut ready: VecDeque<usize> = (0..count).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(index) = ready.pop_front() {
            order.push(index);
            for &dependent in &dependents[index] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push_back(dependent);
                }
            }
        }
        if order.len() < count {
            let stuck: Vec<&str> = (0..count)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.entries[i].name.as_str())
                .collect();
            return Err(ConfigurationError::DependencyCycle(stuck.join(", ")));
        }

        let mut effective_lags = vec![0usize; count];
        for &index in &order {
            let indicator = &self.entries[index].indicator;
            let upstream = indicator
                .inputs()
                .iter()
                .map(|input| effective_lags[input.index()])
                .max()
                .unwrap_or(1);
            effective_lags[index] = (indicator.lag() + upstream).saturating_sub(1).max(1);
        }

        let (names, indicators): (Vec<String>, Vec<Box<dyn Indicator<N>>>) = self
            .entries
            .into_iter()
            .map(|e| (e.name, e.indicator))
            .unzip();

        debug!(context = %self.name, indicators = count, "indicator context built");
        Ok(IndicatorContext {
            name: self.name,
            timeframe: self.timeframe,
            indicators,
            names,
            by_name: self.by_name,
            order,
            effective_lags,
            values: vec![N::nan(); count],
            stable: vec![false; count],
            all_stable: count == 0,
            bars_seen: 0,
            last_changed: Vec::new(),
            observers: self.observers,
        })
    }
}

impl<N: Num> fmt::Debug for IndicatorContextBuilder<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorContextBuilder")
            .field("name", &self.name)
            .field("timeframe", &self.timeframe)
            .field("indicators", &self.entries.len())
            .finish()
    }
}

/// Named collection of indicators for one timeframe.
///
/// Registered as a listener on the timeframe's series. Each bar updates every
/// indicator exactly once, dependencies first. Per-indicator stability is
/// latched, and the context is stable once all of its indicators are.
pub struct IndicatorContext<N: Num> {
    name: String,
    timeframe: Timeframe,
    indicators: Vec<Box<dyn Indicator<N>>>,
    names: Vec<String>,
    by_name: HashMap<String, IndicatorId>,
    order: Vec<usize>,
    effective_lags: Vec<usize>,
    values: Vec<N>,
    stable: Vec<bool>,
    all_stable: bool,
    bars_seen: u64,
    last_changed: Vec<IndicatorId>,
    observers: Vec<Box<dyn ContextObserver<N>>>,
}

impl<N: Num> IndicatorContext<N> {
    pub fn builder(name: impl Into<String>, timeframe: Timeframe) -> IndicatorContextBuilder<N> {
        IndicatorContextBuilder::new(name, timeframe)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Current value, NaN for unknown ids or values not yet computable.
    pub fn value(&self, id: IndicatorId) -> N {
        self.values.get(id.index()).copied().unwrap_or_else(N::nan)
    }

    pub fn is_stable(&self, id: IndicatorId) -> bool {
        self.stable.get(id.index()).copied().unwrap_or(false)
    }

    /// Whether every indicator is stable.
    pub fn is_all_stable(&self) -> bool {
        self.all_stable
    }

    /// Bars needed before `id` can be stable, including its inputs' warm-up.
    pub fn effective_lag(&self, id: IndicatorId) -> usize {
        self.effective_lags.get(id.index()).copied().unwrap_or(0)
    }

    /// Largest effective lag in the context.
    pub fn lag(&self) -> usize {
        self.effective_lags.iter().copied().max().unwrap_or(0)
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: IndicatorId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn indicator(&self, id: IndicatorId) -> Option<&dyn Indicator<N>> {
        self.indicators.get(id.index()).map(|b| b.as_ref())
    }

    /// Ids in evaluation order.
    pub fn evaluation_order(&self) -> impl Iterator<Item = IndicatorId> + '_ {
        self.order.iter().map(|&i| IndicatorId::from_index(i))
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }

    /// Indicators whose value changed on the last bar.
    pub fn last_changed(&self) -> &[IndicatorId] {
        &self.last_changed
    }

    /// `(name, value, stable)` for every indicator, in registration order.
    pub fn snapshot(&self) -> Vec<(&str, N, bool)> {
        self.names
            .iter()
            .zip(self.values.iter().zip(self.stable.iter()))
            .map(|(name, (&value, &stable))| (name.as_str(), value, stable))
            .collect()
    }

    /// Push one bar through every indicator in dependency order.
    pub fn update(&mut self, bar: &Bar<N>) {
        self.bars_seen += 1;
        self.last_changed.clear();

        for &index in &self.order {
            {
                let inputs = InputValues::new(&self.values, &self.stable);
                self.indicators[index].on_bar(bar, &inputs);
            }
            let indicator = &self.indicators[index];
            let value = indicator.value();
            let previous = self.values[index];
            if !(value.is_nan() && previous.is_nan()) && value != previous {
                self.last_changed.push(IndicatorId::from_index(index));
            }
            self.values[index] = value;
            if !self.stable[index] && indicator.is_stable() {
                self.stable[index] = true;
            }
        }

        let became_stable = !self.all_stable && self.stable.iter().all(|&s| s);
        if became_stable {
            self.all_stable = true;
            info!(context = %self.name, timeframe = %self.timeframe, bars = self.bars_seen, "indicator context stable");
        }

        if !self.observers.is_empty() {
            let mut observers = std::mem::take(&mut self.observers);
            for observer in observers.iter_mut() {
                if became_stable {
                    observer.on_stable(self, bar);
                }
                observer.on_update(self, bar, &self.last_changed);
            }
            self.observers = observers;
        }
    }

    /// Drop all indicator state, keeping the wiring.
    pub fn reset(&mut self) {
        for indicator in self.indicators.iter_mut() {
            indicator.reset();
        }
        self.values.iter_mut().for_each(|v| *v = N::nan());
        self.stable.iter_mut().for_each(|s| *s = false);
        self.all_stable = self.indicators.is_empty();
        self.bars_seen = 0;
        self.last_changed.clear();
    }
}

impl<N: Num> BarListener<N> for IndicatorContext<N> {
    fn on_bar(&mut self, bar: &Bar<N>) {
        self.update(bar);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<N: Num> fmt::Debug for IndicatorContext<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorContext")
            .field("name", &self.name)
            .field("timeframe", &self.timeframe)
            .field("indicators", &self.names)
            .field("all_stable", &self.all_stable)
            .field("bars_seen", &self.bars_seen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ema, Highest, Previous, PriceIndicator, Rsi, Sma};
    use barstream_core::series::BarSeries;
    use std::sync::{Arc, Mutex};

    fn bar(i: i64, close: f64) -> Bar<f64> {
        Bar::new(Timeframe::Minute1, i * 60_000, close, close, close, close, 1.0)
    }

    fn run(context: &mut IndicatorContext<f64>, closes: &[f64]) {
        for &close in closes {
            let next = context.bars_seen() as i64;
            context.update(&bar(next, close));
        }
    }

    #[test]
    fn test_diamond_dependencies_see_updated_inputs() {
        let mut builder = IndicatorContext::builder("diamond", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let fast = builder.add("fast", Sma::new(close, 2).unwrap()).unwrap();
        let slow = builder.add("slow", Sma::new(close, 3).unwrap()).unwrap();
        let smooth_fast = builder.add("smooth", Sma::new(fast, 2).unwrap()).unwrap();
        let mut context = builder.build().unwrap();

        run(&mut context, &[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(context.value(close), 4.0);
        assert_eq!(context.value(fast), 3.5);
        assert_eq!(context.value(slow), 3.0);
        // mean of fast over the last two bars: (2.5 + 3.5) / 2
        assert_eq!(context.value(smooth_fast), 3.0);
        assert_eq!(context.effective_lag(smooth_fast), 3);
        assert_eq!(context.lag(), 3);
    }

    #[test]
    fn test_registration_order_does_not_matter_for_evaluation() {
        let mut builder: IndicatorContextBuilder<f64> = IndicatorContext::builder("order", Timeframe::Minute1);
        // Registered before its input through a reserved id.
        let sma = builder.add("sma", Sma::new(IndicatorId::from_index(1), 2).unwrap()).unwrap();
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let mut context = builder.build().unwrap();

        let order: Vec<IndicatorId> = context.evaluation_order().collect();
        assert_eq!(order, vec![close, sma]);

        run(&mut context, &[2.0, 4.0]);
        assert_eq!(context.value(sma), 3.0);
    }

    #[test]
    fn test_cycle_detected() {
        let mut builder: IndicatorContextBuilder<f64> = IndicatorContext::builder("cycle", Timeframe::Minute1);
        builder.add("a", Sma::new(IndicatorId::from_index(1), 2).unwrap()).unwrap();
        builder.add("b", Sma::new(IndicatorId::from_index(0), 2).unwrap()).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::DependencyCycle("a, b".into())
        );
    }

    #[test]
    fn test_unknown_input_rejected() {
        let mut builder: IndicatorContextBuilder<f64> = IndicatorContext::builder("bad", Timeframe::Minute1);
        builder.add("sma", Sma::new(IndicatorId::from_index(9), 2).unwrap()).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::UnknownIndicator {
                indicator: "sma".into(),
                input: 9
            }
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder: IndicatorContextBuilder<f64> = IndicatorContext::builder("dup", Timeframe::Minute1);
        builder.add("close", PriceIndicator::close()).unwrap();
        assert_eq!(
            builder.add("close", PriceIndicator::open()).unwrap_err(),
            ConfigurationError::DuplicateIndicator("close".into())
        );
    }

    #[test]
    fn test_get_or_add_reuses() {
        let mut builder: IndicatorContextBuilder<f64> = IndicatorContext::builder("reuse", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let a = builder.get_or_add("prev", || Previous::new(close, 1)).unwrap();
        let b = builder.get_or_add("prev", || Previous::new(close, 1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_stability_is_monotonic_and_matches_lag() {
        let mut builder = IndicatorContext::builder("stable", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let ema = builder.add("ema", Ema::new(close, 3).unwrap()).unwrap();
        let rsi = builder.add("rsi", Rsi::new(ema, 2).unwrap()).unwrap();
        let mut context = builder.build().unwrap();
        assert_eq!(context.effective_lag(rsi), 5);

        let mut history = Vec::new();
        for i in 0..10 {
            context.update(&bar(i, 100.0 + (i % 4) as f64));
            history.push(context.is_stable(rsi));
        }
        assert_eq!(history.iter().position(|&s| s), Some(4));
        assert!(history[4..].iter().all(|&s| s));
        assert!(context.is_all_stable());
    }

    #[test]
    fn test_changed_tracking() {
        let mut builder = IndicatorContext::builder("changes", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let highest = builder.add("high3", Highest::new(close, 3).unwrap()).unwrap();
        let mut context = builder.build().unwrap();

        context.update(&bar(0, 5.0));
        assert_eq!(context.last_changed(), &[close]);
        context.update(&bar(1, 5.0));
        assert!(context.last_changed().is_empty());
        context.update(&bar(2, 4.0));
        assert_eq!(context.last_changed(), &[close, highest]);
    }

    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ContextObserver<f64> for Recorder {
        fn on_update(&mut self, context: &IndicatorContext<f64>, bar: &Bar<f64>, changed: &[IndicatorId]) {
            self.log.lock().unwrap().push(format!(
                "update {} {} {}",
                context.name(),
                bar.close,
                changed.len()
            ));
        }

        fn on_stable(&mut self, context: &IndicatorContext<f64>, _bar: &Bar<f64>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("stable after {}", context.bars_seen()));
        }
    }

    #[test]
    fn test_observers_notified() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = IndicatorContext::builder("observed", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        builder.add("sma", Sma::new(close, 2).unwrap()).unwrap();
        builder.observe(Recorder { log: log.clone() });
        let mut context = builder.build().unwrap();

        run(&mut context, &[1.0]);
        run(&mut context, &[3.0]);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "update observed 1 1".to_string(),
                "stable after 2".to_string(),
                "update observed 3 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_context_as_series_listener() {
        let mut builder = IndicatorContext::builder("listener", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let sma = builder.add("sma", Sma::new(close, 2).unwrap()).unwrap();
        let context = builder.build().unwrap();

        let mut series = BarSeries::new("1m", Timeframe::Minute1);
        let handle = series.add_listener(context);
        series.add_bar(bar(0, 10.0)).unwrap();
        series.add_bar(bar(1, 20.0)).unwrap();
        // Rejected bars never reach the context.
        let _ = series.add_bar(bar(1, 99.0));

        let context = series.listener(handle).unwrap();
        assert_eq!(context.value(sma), 15.0);
        assert_eq!(context.bars_seen(), 2);
    }

    #[test]
    fn test_reset() {
        let mut builder = IndicatorContext::builder("reset", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        let mut context = builder.build().unwrap();
        run(&mut context, &[1.0]);
        assert!(context.is_all_stable());

        context.reset();
        assert!(!context.is_all_stable());
        assert!(context.value(close).is_nan());
        assert_eq!(context.bars_seen(), 0);
    }
}
