//! Failures that end a check run in the Unknown state.
//!
//! The `Display` text of each variant is what the check prints as its summary,
//! so the wording follows what operators already grep for in their dashboards.

use crate::models::usage::MetricKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Include-line and ignore-line patterns were both configured.
    #[error("Do not use -l and -L options concurrently")]
    ConflictingLineFilters,

    /// None of the four percentages was given.
    #[error("Warning or critical levels not defined")]
    NoThresholds,

    /// A line pattern failed to compile as a regular expression.
    #[error("Invalid line pattern {pattern}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason:  String,
    },

    /// A report row did not split into the expected columns.
    #[error("Malformed line from df: {line}")]
    MalformedRecord { line: String },

    /// Filtering left nothing to evaluate.
    #[error("No filesystems found")]
    EmptyScope,

    /// The record source itself failed (df missing, /proc unreadable, ...).
    #[error("Unable to read {kind} usage: {message}")]
    Source {
        kind:    MetricKind,
        message: String,
    },
}

impl CheckError {
    /// Configuration errors are raised before any data is collected.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConflictingLineFilters | Self::NoThresholds | Self::InvalidPattern { .. }
        )
    }
}
