use crate::quirk::XEN_MARKER;
use crate::source::default_proc_stat_path;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Options the host may set for this collector.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    pub enabled: bool,
    /// Metric namespace prefix, not a filesystem path.
    pub path: String,
    /// Seeds the Xen idle correction: unset means detect.
    pub xenfix: Option<bool>,
    pub proc_stat_path: PathBuf,
    pub xen_marker_path: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "cpu".to_string(),
            xenfix: None,
            proc_stat_path: default_proc_stat_path(),
            xen_marker_path: PathBuf::from(XEN_MARKER),
        }
    }
}

impl CollectorConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("parsing collector config")
    }

    /// `path` joined with a metric name, e.g. `cpu.total.idle`.
    pub fn qualified_name(&self, metric: &str) -> String {
        if self.path.is_empty() {
            metric.to_string()
        } else {
            format!("{}.{}", self.path, metric)
        }
    }
}
