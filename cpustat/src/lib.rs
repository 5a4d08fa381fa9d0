pub mod collector;
pub mod config;
pub mod counter;
pub mod derivative;
pub mod publish;
pub mod quirk;
pub mod source;

pub use collector::{CpuCollector, CycleOutcome};
pub use config::CollectorConfig;
pub use counter::{Counter, CounterKey, CpuLabel, MAX_COUNTER};
pub use derivative::DerivativeEngine;
pub use publish::{Metric, MetricValue, Publisher};
pub use quirk::{IdleQuirkCorrector, QuirkState};
pub use source::{
    CounterRecord, CpuSnapshot, KernelStatsReader, ProcStatReader, SourceChain, SourceKind,
    SourceReader, parse_proc_stat,
};
