//! Filesystem capacity check: filter → classify → aggregate.

pub mod aggregate;
pub mod filter;
pub mod threshold;

use crate::collectors::UsageSource;
use crate::error::CheckError;
use crate::models::usage::{MetricKind, UsageRecord};
use aggregate::{aggregate, Verdict};
use filter::{Filter, FilterRules};
use threshold::{classify, Classification, ThresholdRules};

/// Four-state check result, Nagios/Sensu exit-code convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok       => "OK",
            Status::Warning  => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown  => "UNKNOWN",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Ok       => 0,
            Status::Warning  => 1,
            Status::Critical => 2,
            Status::Unknown  => 3,
        }
    }
}

/// Everything one run needs besides the record source.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub filters:        FilterRules,
    pub thresholds:     ThresholdRules,
    pub include_remote: bool,
    /// Echo each in-scope raw line before it is classified.
    pub debug:          bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Reading(MetricKind),
    Reporting,
}

/// Run the check, returning an error for every path that ends in Unknown.
///
/// Both metric kinds are only fetched when at least one threshold is set for
/// them. A malformed row aborts the run; no partial verdict is produced.
pub fn evaluate(
    source: &dyn UsageSource,
    opts:   &CheckOptions,
    echo:   &mut dyn FnMut(&str),
) -> Result<Verdict, CheckError> {
    log::debug!("stage {:?}", Stage::Validating);
    let filter = Filter::new(&opts.filters)?;
    if opts.thresholds.is_empty() {
        return Err(CheckError::NoThresholds);
    }

    let mut classified: Vec<Classification> = Vec::new();
    for kind in [MetricKind::Block, MetricKind::Inode] {
        if !opts.thresholds.wants(kind) { continue; }
        log::debug!("stage {:?}", Stage::Reading(kind));

        let lines = source
            .fetch_usage(kind, opts.include_remote)
            .map_err(|e| CheckError::Source { kind, message: format!("{:#}", e) })?;

        for line in &lines {
            let rec = UsageRecord::parse(line, kind)?;
            if !filter.is_in_scope(&rec) {
                log::trace!("skipping {}", rec.raw_line);
                continue;
            }
            if opts.debug {
                echo(&rec.raw_line);
            }
            let c = classify(&rec, &opts.thresholds);
            log::debug!("[{}] {} {} {}%", c.severity.label(), kind, rec.mount, rec.capacity_pct);
            classified.push(c);
        }
    }

    if classified.is_empty() {
        return Err(CheckError::EmptyScope);
    }

    log::debug!("stage {:?}: {} record(s) in scope", Stage::Reporting, classified.len());
    Ok(aggregate(&classified, &opts.thresholds))
}

/// [`evaluate`] with every failure folded into an Unknown verdict.
pub fn run(source: &dyn UsageSource, opts: &CheckOptions, echo: &mut dyn FnMut(&str)) -> Verdict {
    match evaluate(source, opts, echo) {
        Ok(v)  => v,
        Err(e) => {
            if e.is_configuration() {
                log::debug!("configuration rejected before collection: {:?}", e);
            } else {
                log::debug!("check ended unknown: {:?}", e);
            }
            Verdict { status: Status::Unknown, summary: e.to_string() }
        }
    }
}
