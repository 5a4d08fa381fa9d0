use cpustat::{
    CollectorConfig, CpuCollector, CycleOutcome, MAX_COUNTER, Metric, MetricValue, ProcStatReader,
    QuirkState, SourceChain,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn stat_path(&self) -> PathBuf {
        self.dir.path().join("stat")
    }

    fn xen_path(&self) -> PathBuf {
        self.dir.path().join("xen")
    }

    fn write_stat(&self, content: &str) {
        fs::write(self.stat_path(), content).unwrap();
    }

    fn enable_xen(&self) {
        fs::create_dir(self.xen_path()).unwrap();
    }

    fn collector(&self) -> CpuCollector {
        let config = CollectorConfig {
            proc_stat_path: self.stat_path(),
            xen_marker_path: self.xen_path(),
            ..CollectorConfig::default()
        };
        CpuCollector::new(config)
    }

    fn file_only_collector(&self, stat: &Path) -> CpuCollector {
        let config = CollectorConfig {
            xen_marker_path: self.xen_path(),
            ..CollectorConfig::default()
        };
        let chain = SourceChain::new(Box::new(ProcStatReader::new(stat)), None);
        CpuCollector::with_sources(config, chain)
    }
}

fn cycle(collector: &mut CpuCollector) -> Vec<Metric> {
    let mut sink = Vec::new();
    collector.collect(&mut sink);
    sink
}

fn value_of(metrics: &[Metric], name: &str) -> Option<MetricValue> {
    metrics.iter().find(|m| m.name == name).map(|m| m.value)
}

#[test]
fn publishes_deltas_between_cycles() {
    let fx = Fixture::new();
    let mut collector = fx.collector();

    fx.write_stat("cpu 100 10 50 800\n");
    assert!(cycle(&mut collector).is_empty());

    fx.write_stat("cpu 150 12 55 820\n");
    let metrics = cycle(&mut collector);

    assert_eq!(metrics.len(), 4);
    assert_eq!(value_of(&metrics, "total.user"), Some(MetricValue::Integer(50)));
    assert_eq!(value_of(&metrics, "total.nice"), Some(MetricValue::Integer(2)));
    assert_eq!(value_of(&metrics, "total.system"), Some(MetricValue::Integer(5)));
    assert_eq!(value_of(&metrics, "total.idle"), Some(MetricValue::Integer(20)));
    assert_eq!(collector.quirk_state(), QuirkState::Inactive);
}

#[test]
fn wraps_counters_at_ceiling() {
    let fx = Fixture::new();
    let mut collector = fx.collector();

    fx.write_stat("cpu 18446744073709551000\n");
    cycle(&mut collector);
    fx.write_stat("cpu 50\n");
    let metrics = cycle(&mut collector);

    let expected = (MAX_COUNTER - 18446744073709551000) + 50;
    assert_eq!(
        value_of(&metrics, "total.user"),
        Some(MetricValue::Integer(expected))
    );
}

#[test]
fn halves_idle_when_xen_doubles_it() {
    let fx = Fixture::new();
    fx.enable_xen();
    let mut collector = fx.collector();

    fx.write_stat("cpu 0 0 0 0\ncpu0 0 0 0 0\ncpu1 0 0 0 0\n");
    cycle(&mut collector);
    assert_eq!(collector.quirk_state(), QuirkState::Unknown);

    // cpu0 sums to 111 ticks
    fx.write_stat("cpu 30 0 10 240\ncpu0 10 0 1 100\ncpu1 20 0 9 140\n");
    let metrics = cycle(&mut collector);

    assert_eq!(collector.quirk_state(), QuirkState::Active);
    assert_eq!(value_of(&metrics, "cpu0.idle"), Some(MetricValue::Float(50.0)));
    assert_eq!(value_of(&metrics, "cpu1.idle"), Some(MetricValue::Float(70.0)));
    assert_eq!(value_of(&metrics, "total.idle"), Some(MetricValue::Float(120.0)));
    assert_eq!(value_of(&metrics, "cpu0.user"), Some(MetricValue::Integer(10)));

    // stays active even once cpu0 looks sane
    fx.write_stat("cpu 30 0 10 250\ncpu0 10 0 1 102\ncpu1 20 0 9 148\n");
    let metrics = cycle(&mut collector);
    assert_eq!(collector.quirk_state(), QuirkState::Active);
    assert_eq!(value_of(&metrics, "cpu0.idle"), Some(MetricValue::Float(1.0)));
}

#[test]
fn leaves_idle_alone_at_threshold() {
    let fx = Fixture::new();
    fx.enable_xen();
    let mut collector = fx.collector();

    fx.write_stat("cpu0 0 0 0 0\n");
    cycle(&mut collector);

    // cpu0 sums to exactly 110 ticks
    fx.write_stat("cpu0 10 0 0 100\n");
    let metrics = cycle(&mut collector);
    assert_eq!(collector.quirk_state(), QuirkState::Inactive);
    assert_eq!(value_of(&metrics, "cpu0.idle"), Some(MetricValue::Integer(100)));

    fx.write_stat("cpu0 20 0 0 400\n");
    let metrics = cycle(&mut collector);
    assert_eq!(collector.quirk_state(), QuirkState::Inactive);
    assert_eq!(value_of(&metrics, "cpu0.idle"), Some(MetricValue::Integer(300)));
}

#[test]
fn no_source_means_empty_cycle() {
    let fx = Fixture::new();
    let mut collector = fx.file_only_collector(&fx.stat_path());

    let mut sink: Vec<Metric> = Vec::new();
    assert_eq!(collector.collect(&mut sink), CycleOutcome::NoData);
    assert!(sink.is_empty());

    fx.write_stat("cpu 1 2 3 4\n");
    assert_eq!(collector.collect(&mut sink), CycleOutcome::Published(0));
}

#[test]
fn separate_collectors_keep_separate_baselines() {
    let fx = Fixture::new();
    let mut first = fx.collector();
    let mut second = fx.collector();

    fx.write_stat("cpu 10 10 10 10\n");
    cycle(&mut first);
    fx.write_stat("cpu 20 20 20 20\n");

    assert_eq!(cycle(&mut first).len(), 4);
    assert!(cycle(&mut second).is_empty());
}
