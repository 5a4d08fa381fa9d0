//! Counter identities for `/proc/stat` CPU accounting.
//!
//! Every `cpu` line in `/proc/stat` carries up to ten cumulative tick counters
//! in a fixed order:
//!   cpu  user nice system idle iowait irq softirq steal guest guest_nice
//!   cpu0 ...
//!
//! A counter is identified by the CPU it belongs to and its position.

use std::fmt;

/// Ceiling shared by every CPU counter for wraparound arithmetic.
///
/// All ten counters use the same ceiling regardless of the width the kernel
/// actually keeps them in. This is a known approximation; changing it would
/// change published values.
pub const MAX_COUNTER: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    User,
    Nice,
    System,
    Idle,
    Iowait,
    Irq,
    Softirq,
    Steal,
    Guest,
    GuestNice,
}

impl Counter {
    /// Positional order of the fields on a `cpu` line.
    pub const ALL: [Counter; 10] = [
        Counter::User,
        Counter::Nice,
        Counter::System,
        Counter::Idle,
        Counter::Iowait,
        Counter::Irq,
        Counter::Softirq,
        Counter::Steal,
        Counter::Guest,
        Counter::GuestNice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Nice => "nice",
            Self::System => "system",
            Self::Idle => "idle",
            Self::Iowait => "iowait",
            Self::Irq => "irq",
            Self::Softirq => "softirq",
            Self::Steal => "steal",
            Self::Guest => "guest",
            Self::GuestNice => "guest_nice",
        }
    }

    pub fn max_value(self) -> u64 {
        MAX_COUNTER
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which CPU a line describes: the aggregate `cpu` line or one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuLabel {
    Total,
    Core(u32),
}

impl CpuLabel {
    /// Parse the first token of a `/proc/stat` line.
    ///
    /// `cpu` is the aggregate, `cpu<N>` a core. Anything else is rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let rest = token.strip_prefix("cpu")?;
        if rest.is_empty() {
            return Some(Self::Total);
        }
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok().map(Self::Core)
    }
}

impl fmt::Display for CpuLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total => f.write_str("total"),
            Self::Core(idx) => write!(f, "cpu{idx}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    pub cpu: CpuLabel,
    pub counter: Counter,
}

impl CounterKey {
    pub fn new(cpu: CpuLabel, counter: Counter) -> Self {
        Self { cpu, counter }
    }
}

/// Renders the dotted metric name, e.g. `cpu0.user` or `total.idle`.
impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cpu, self.counter)
    }
}
