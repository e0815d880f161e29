//! Record sources: producers of df-style usage rows.

pub mod df;
pub mod statvfs;

use crate::models::usage::MetricKind;
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Anything that can list per-filesystem usage rows, header already dropped.
pub trait UsageSource {
    fn fetch_usage(&self, kind: MetricKind, include_remote: bool) -> Result<Vec<String>>;
}

/// Which collector a run reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Shell out to POSIX `df -PT`
    #[default]
    Df,
    /// Read /proc/mounts and call statvfs(2) directly
    Statvfs,
}

impl SourceKind {
    pub fn build(self) -> Box<dyn UsageSource> {
        match self {
            SourceKind::Df      => Box::new(df::DfSource),
            SourceKind::Statvfs => Box::new(statvfs::StatvfsSource::default()),
        }
    }
}
