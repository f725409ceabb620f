//! Metrics sink interface
//!
//! Registration and export belong to the host agent. Collectors only produce
//! samples when asked.

use std::collections::BTreeMap;

/// One gauge time series sample
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub name: String,
    pub help: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl GaugeSample {
    pub fn new(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: BTreeMap::new(),
            value,
        }
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Something the host's metrics registry polls on every export pass
pub trait Collector: Send + Sync {
    fn collect(&self) -> Vec<GaugeSample>;
}
