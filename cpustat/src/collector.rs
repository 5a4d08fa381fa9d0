use crate::config::CollectorConfig;
use crate::counter::CounterKey;
use crate::derivative::DerivativeEngine;
use crate::publish::{MetricValue, Publisher};
use crate::quirk::{IdleQuirkCorrector, QuirkState};
use crate::source::{CpuSnapshot, SourceChain, SourceKind};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Data was read; this many metrics were published.
    Published(usize),
    /// No source could be read.
    NoData,
    Disabled,
}

/// CPU accounting collector. One instance owns its baselines and quirk state.
pub struct CpuCollector {
    config: CollectorConfig,
    sources: SourceChain,
    engine: DerivativeEngine,
    quirk: IdleQuirkCorrector,
}

impl CpuCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let sources = SourceChain::with_proc_stat(config.proc_stat_path.clone());
        Self::with_sources(config, sources)
    }

    pub fn with_sources(config: CollectorConfig, sources: SourceChain) -> Self {
        let quirk = IdleQuirkCorrector::new(
            QuirkState::from(config.xenfix),
            config.xen_marker_path.clone(),
        );
        Self {
            config,
            sources,
            engine: DerivativeEngine::new(),
            quirk,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn quirk_state(&self) -> QuirkState {
        self.quirk.state()
    }

    pub fn engine(&self) -> &DerivativeEngine {
        &self.engine
    }

    /// Run one collection cycle.
    pub fn collect(&mut self, publisher: &mut dyn Publisher) -> CycleOutcome {
        if !self.config.enabled {
            debug!("[cpu] collector disabled");
            return CycleOutcome::Disabled;
        }

        let Some((kind, snapshot)) = self.sources.read() else {
            debug!("[cpu] no cpu accounting source available this cycle");
            return CycleOutcome::NoData;
        };

        let mut metrics = self.derive(&snapshot);
        if kind == SourceKind::File {
            self.quirk.correct(&mut metrics);
        }

        for (key, value) in &metrics {
            publisher.publish(&key.to_string(), *value);
        }
        debug!(
            "[cpu] {:?} source: {} cpus, {} metrics published",
            kind,
            snapshot.len(),
            metrics.len()
        );

        CycleOutcome::Published(metrics.len())
    }

    fn derive(&mut self, snapshot: &CpuSnapshot) -> Vec<(CounterKey, MetricValue)> {
        let mut metrics = Vec::new();
        for (cpu, record) in snapshot.iter() {
            for (counter, raw) in record.iter() {
                let key = CounterKey::new(*cpu, counter);
                if let Some(delta) = self.engine.observe(key, raw, counter.max_value()) {
                    metrics.push((key, MetricValue::Integer(delta)));
                }
            }
        }
        metrics
    }
}
