//! Xen idle double-counting correction.
//!
//! Some Xen guests report idle time twice for the first vCPU
//! (https://bugzilla.redhat.com/show_bug.cgi?id=624756). When running under
//! Xen, the summed cpu0 deltas of one interval reveal it: a healthy guest
//! cannot account more than ~100 ticks per second per CPU.

use crate::counter::{Counter, CounterKey, CpuLabel};
use crate::publish::MetricValue;
use log::{debug, info};
use std::path::PathBuf;

pub const XEN_MARKER: &str = "/proc/xen";

/// cpu0 ticks per interval above which idle is considered doubled.
pub const DOUBLED_IDLE_THRESHOLD: u64 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuirkState {
    #[default]
    Unknown,
    Active,
    Inactive,
}

impl From<Option<bool>> for QuirkState {
    fn from(seed: Option<bool>) -> Self {
        match seed {
            Some(true) => Self::Active,
            Some(false) => Self::Inactive,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct IdleQuirkCorrector {
    state: QuirkState,
    marker: PathBuf,
    evaluations: u64,
}

impl IdleQuirkCorrector {
    pub fn new(state: QuirkState, marker: impl Into<PathBuf>) -> Self {
        Self {
            state,
            marker: marker.into(),
            evaluations: 0,
        }
    }

    pub fn state(&self) -> QuirkState {
        self.state
    }

    /// Number of cpu0 sums computed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Apply the correction to one cycle's derived metrics in place.
    pub fn correct(&mut self, metrics: &mut [(CounterKey, MetricValue)]) {
        match self.state {
            QuirkState::Inactive => {}
            QuirkState::Active => halve_idle(metrics),
            QuirkState::Unknown => self.detect(metrics),
        }
    }

    fn detect(&mut self, metrics: &mut [(CounterKey, MetricValue)]) {
        if !self.marker.is_dir() {
            debug!(
                "[cpu-quirk] {} not present, disabling idle correction",
                self.marker.display()
            );
            self.state = QuirkState::Inactive;
            return;
        }

        self.evaluations += 1;
        let cpu0_total = metrics
            .iter()
            .filter(|(key, _)| key.cpu == CpuLabel::Core(0))
            .map(|(_, value)| match value {
                MetricValue::Integer(v) => *v,
                MetricValue::Float(v) => *v as u64,
            })
            .fold(0u64, u64::saturating_add);

        if cpu0_total > DOUBLED_IDLE_THRESHOLD {
            info!("[cpu-quirk] cpu0 accounted {cpu0_total} ticks, halving idle from now on");
            self.state = QuirkState::Active;
            halve_idle(metrics);
        } else if cpu0_total > 0 {
            info!("[cpu-quirk] cpu0 accounted {cpu0_total} ticks, idle looks sane");
            self.state = QuirkState::Inactive;
        } else {
            debug!("[cpu-quirk] no cpu0 activity yet, deferring");
        }
    }
}

fn halve_idle(metrics: &mut [(CounterKey, MetricValue)]) {
    for (key, value) in metrics.iter_mut() {
        if key.counter == Counter::Idle {
            *value = value.halved();
        }
    }
}
