use crate::counter::CounterKey;
use std::collections::HashMap;

/// Turns cumulative counters into per-interval deltas.
///
/// Holds the last raw value seen for every key. Keys are added on first
/// observation and live as long as the engine does.
#[derive(Debug, Default)]
pub struct DerivativeEngine {
    baselines: HashMap<CounterKey, u64>,
}

impl DerivativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `raw` for `key` and return the increase since the previous call.
    ///
    /// Returns `None` the first time a key is seen. A value below the stored
    /// baseline is treated as a wrap at `max`.
    pub fn observe(&mut self, key: CounterKey, raw: u64, max: u64) -> Option<u64> {
        let previous = self.baselines.insert(key, raw)?;
        Some(counter_delta(previous, raw, max))
    }

    pub fn baseline(&self, key: &CounterKey) -> Option<u64> {
        self.baselines.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

fn counter_delta(old: u64, new: u64, max: u64) -> u64 {
    if new >= old {
        new - old
    } else {
        max.saturating_sub(old).saturating_add(new)
    }
}
