use serde::Serialize;
use std::fmt;

/// Value handed to the publisher.
///
/// Plain deltas stay integral. Idle deltas halved by the Xen correction
/// become floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(u64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    pub fn halved(self) -> Self {
        Self::Float(self.as_f64() / 2.0)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

/// Sink for derived metrics, provided by the host.
pub trait Publisher {
    fn publish(&mut self, name: &str, value: MetricValue);
}

impl Publisher for Vec<Metric> {
    fn publish(&mut self, name: &str, value: MetricValue) {
        self.push(Metric {
            name: name.to_string(),
            value,
        });
    }
}
