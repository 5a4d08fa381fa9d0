//! Raw CPU counter sources.
//!
//! The preferred source is `/proc/stat`:
//!   cpu  4705 356 584 3699176 23060 0 277 0 0 0
//!   cpu0 1393 280 255 3696434 5780 0 200 0 0 0
//!   ...
//!   intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
//!
//! When it cannot be read, the `procfs` kernel stats snapshot is used instead.
//! That path only carries user, nice, system and idle.

use crate::counter::{Counter, CpuLabel};
use anyhow::{Context, Result};
use log::debug;
use procfs::KernelStats;
use procfs::prelude::*;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROC_STAT_ENV: &str = "CPUSTAT_PROC_STAT_PATH";
const PROC_STAT: &str = "/proc/stat";

pub fn default_proc_stat_path() -> PathBuf {
    env::var_os(PROC_STAT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(PROC_STAT))
}

/// Counters of one CPU, as a prefix of the positional field list.
///
/// A line with four numbers yields user, nice, system and idle; the other six
/// counters are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterRecord {
    values: Vec<u64>,
}

impl CounterRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next positional field. Returns false once all ten are set.
    pub fn push(&mut self, value: u64) -> bool {
        if self.values.len() >= Counter::ALL.len() {
            return false;
        }
        self.values.push(value);
        true
    }

    pub fn get(&self, counter: Counter) -> Option<u64> {
        self.values.get(counter as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Counter, u64)> + '_ {
        Counter::ALL.iter().copied().zip(self.values.iter().copied())
    }
}

impl FromIterator<u64> for CounterRecord {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut record = CounterRecord::new();
        for value in iter {
            if !record.push(value) {
                break;
            }
        }
        record
    }
}

/// One reading of every CPU the source reported, ordered total first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    cpus: BTreeMap<CpuLabel, CounterRecord>,
}

impl CpuSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cpu: CpuLabel, record: CounterRecord) {
        self.cpus.insert(cpu, record);
    }

    pub fn get(&self, cpu: CpuLabel) -> Option<&CounterRecord> {
        self.cpus.get(&cpu)
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, CpuLabel, CounterRecord> {
        self.cpus.iter()
    }
}

/// Parse the `cpu*` lines of `/proc/stat` content.
///
/// Short lines keep the fields they have. Extra fields past `guest_nice` are
/// ignored. A non-numeric field ends that line's record.
pub fn parse_proc_stat(content: &str) -> CpuSnapshot {
    let mut snapshot = CpuSnapshot::new();

    for line in content.lines() {
        if !line.starts_with("cpu") {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(token) = parts.next() else {
            continue;
        };
        let Some(cpu) = CpuLabel::parse(token) else {
            debug!("[cpu] skipping unrecognized label {token:?}");
            continue;
        };

        let mut record = CounterRecord::new();
        for (counter, part) in Counter::ALL.iter().zip(parts) {
            match part.parse::<u64>() {
                Ok(value) => {
                    record.push(value);
                }
                Err(_) => {
                    debug!("[cpu] {cpu}: unparsable {counter} field {part:?}, truncating");
                    break;
                }
            }
        }

        snapshot.insert(cpu, record);
    }

    snapshot
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Library,
}

/// Something that can produce a raw counter snapshot for the current cycle.
pub trait SourceReader: Send {
    fn kind(&self) -> SourceKind;

    fn read(&self) -> Result<CpuSnapshot>;
}

/// Reads a `/proc/stat` formatted file.
#[derive(Debug, Clone)]
pub struct ProcStatReader {
    path: PathBuf,
}

impl ProcStatReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ProcStatReader {
    fn default() -> Self {
        Self::new(default_proc_stat_path())
    }
}

impl SourceReader for ProcStatReader {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn read(&self) -> Result<CpuSnapshot> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        Ok(parse_proc_stat(&content))
    }
}

/// Library fallback built on `procfs::KernelStats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelStatsReader;

fn four_field_record(user: u64, nice: u64, system: u64, idle: u64) -> CounterRecord {
    [user, nice, system, idle].into_iter().collect()
}

impl SourceReader for KernelStatsReader {
    fn kind(&self) -> SourceKind {
        SourceKind::Library
    }

    fn read(&self) -> Result<CpuSnapshot> {
        let stats = KernelStats::current().context("reading kernel stats")?;

        let mut snapshot = CpuSnapshot::new();
        let total = &stats.total;
        snapshot.insert(
            CpuLabel::Total,
            four_field_record(total.user, total.nice, total.system, total.idle),
        );
        for (idx, time) in stats.cpu_time.iter().enumerate() {
            let idx = u32::try_from(idx).context("cpu index out of range")?;
            snapshot.insert(
                CpuLabel::Core(idx),
                four_field_record(time.user, time.nice, time.system, time.idle),
            );
        }
        Ok(snapshot)
    }
}

/// Primary source with an optional fallback.
pub struct SourceChain {
    primary: Box<dyn SourceReader>,
    fallback: Option<Box<dyn SourceReader>>,
}

impl SourceChain {
    pub fn new(primary: Box<dyn SourceReader>, fallback: Option<Box<dyn SourceReader>>) -> Self {
        Self { primary, fallback }
    }

    /// `/proc/stat` at `path`, falling back to kernel stats.
    pub fn with_proc_stat(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(ProcStatReader::new(path)),
            Some(Box::new(KernelStatsReader)),
        )
    }

    /// Snapshot from the first source that works, or `None` for an empty cycle.
    pub fn read(&self) -> Option<(SourceKind, CpuSnapshot)> {
        match self.primary.read() {
            Ok(snapshot) => return Some((self.primary.kind(), snapshot)),
            Err(err) => debug!("[cpu] primary source unavailable: {err:#}"),
        }

        let fallback = self.fallback.as_ref()?;
        match fallback.read() {
            Ok(snapshot) => Some((fallback.kind(), snapshot)),
            Err(err) => {
                debug!("[cpu] fallback source unavailable: {err:#}");
                None
            }
        }
    }
}
