use anyhow::{Context, Result};
use clap::Parser;
use cpustat::{CollectorConfig, CpuCollector, CycleOutcome, Metric, MetricValue, Publisher};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

#[derive(clap::Parser, Debug)]
struct Args {
    /// Collector config file (TOML)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Read counters from this file instead of /proc/stat
    #[clap(long)]
    proc_stat: Option<PathBuf>,

    /// Seconds between collection cycles
    #[clap(long, default_value_t = 10)]
    interval: u64,

    /// Stop after this many cycles (0 runs until interrupted)
    #[clap(long, default_value_t = 0)]
    count: u64,

    /// Print one JSON object per metric
    #[clap(long)]
    json: bool,
}

/// Prints metrics under the configured namespace.
struct StdoutPublisher {
    config: CollectorConfig,
    json: bool,
}

impl Publisher for StdoutPublisher {
    fn publish(&mut self, name: &str, value: MetricValue) {
        let name = self.config.qualified_name(name);
        if self.json {
            let metric = Metric { name, value };
            match serde_json::to_string(&metric) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to encode {}: {e}", metric.name),
            }
        } else {
            println!("{name} {value}");
        }
    }
}

fn load_config(args: &Args) -> Result<CollectorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            CollectorConfig::from_toml_str(&raw)?
        }
        None => CollectorConfig::default(),
    };
    if let Some(path) = &args.proc_stat {
        config.proc_stat_path = path.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut collector = CpuCollector::new(load_config(&args)?);

    info!(
        "[cpustat] collecting from {} every {}s",
        collector.config().proc_stat_path.display(),
        args.interval
    );
    let mut publisher = StdoutPublisher {
        config: collector.config().clone(),
        json: args.json,
    };

    let mut ticker = interval(Duration::from_secs(args.interval.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("[cpustat] interrupted after {cycles} cycles");
                break;
            }
        }

        match collector.collect(&mut publisher) {
            CycleOutcome::Published(n) => debug!("[cpustat] cycle {cycles}: {n} metrics"),
            CycleOutcome::NoData => eprintln!("No CPU accounting data this cycle"),
            CycleOutcome::Disabled => {
                info!("[cpustat] collector disabled in config");
                break;
            }
        }

        cycles += 1;
        if args.count > 0 && cycles >= args.count {
            break;
        }
    }

    Ok(())
}
