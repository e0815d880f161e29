use crate::models::usage::{MetricKind, UsageRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Normal   => "OK",
            Severity::Warning  => "WARN",
            Severity::Critical => "CRIT",
        }
    }
}

/// Warning/critical percentages, independent per metric kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_warn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_crit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode_warn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode_crit: Option<u32>,
}

impl ThresholdRules {
    pub fn is_empty(&self) -> bool {
        !self.wants(MetricKind::Block) && !self.wants(MetricKind::Inode)
    }

    /// Whether any threshold is configured for this metric kind.
    pub fn wants(&self, kind: MetricKind) -> bool {
        let (warn, crit) = self.pair(kind);
        warn.is_some() || crit.is_some()
    }

    /// (warn, crit) for one metric kind.
    pub fn pair(&self, kind: MetricKind) -> (Option<u32>, Option<u32>) {
        match kind {
            MetricKind::Block => (self.block_warn, self.block_crit),
            MetricKind::Inode => (self.inode_warn, self.inode_crit),
        }
    }
}

/// Result of comparing one (filesystem, metric) record against its thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub record:    UsageRecord,
    pub severity:  Severity,
    /// The threshold that was reached; `None` when Normal.
    pub threshold: Option<u32>,
}

impl Classification {
    /// "/var 92% > 90%" or "/var inodes 92% > 90%"; `None` when Normal.
    pub fn reason(&self) -> Option<String> {
        let limit = self.threshold?;
        let rec = &self.record;
        Some(match rec.kind {
            MetricKind::Block => format!("{} {}% > {}%", rec.mount, rec.capacity_pct, limit),
            MetricKind::Inode => format!("{} inodes {}% > {}%", rec.mount, rec.capacity_pct, limit),
        })
    }
}

/// Inclusive comparison: a filesystem sitting exactly on a threshold breaches it.
pub fn classify(rec: &UsageRecord, thr: &ThresholdRules) -> Classification {
    let (warn, crit) = thr.pair(rec.kind);
    let pct = rec.capacity_pct;

    let (severity, threshold) = match (crit, warn) {
        (Some(c), _) if pct >= c => (Severity::Critical, Some(c)),
        (_, Some(w)) if pct >= w => (Severity::Warning, Some(w)),
        _                        => (Severity::Normal, None),
    };

    Classification { record: rec.clone(), severity, threshold }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(mount: &str, pct: u32, kind: MetricKind) -> UsageRecord {
        let line = format!("/dev/sda1 ext4 100 {pct} 0 {pct}% {mount}");
        UsageRecord::parse(&line, kind).unwrap()
    }

    fn thr(bw: Option<u32>, bc: Option<u32>, iw: Option<u32>, ic: Option<u32>) -> ThresholdRules {
        ThresholdRules { block_warn: bw, block_crit: bc, inode_warn: iw, inode_crit: ic }
    }

    #[test]
    fn test_inclusive_boundary() {
        let t = thr(Some(80), Some(90), None, None);
        assert_eq!(classify(&rec("/", 90, MetricKind::Block), &t).severity, Severity::Critical);
        assert_eq!(classify(&rec("/", 91, MetricKind::Block), &t).severity, Severity::Critical);
        assert_eq!(classify(&rec("/", 89, MetricKind::Block), &t).severity, Severity::Warning);
        assert_eq!(classify(&rec("/", 80, MetricKind::Block), &t).severity, Severity::Warning);
        assert_eq!(classify(&rec("/", 79, MetricKind::Block), &t).severity, Severity::Normal);
    }

    #[test]
    fn test_crit_only() {
        let t = thr(None, Some(90), None, None);
        assert_eq!(classify(&rec("/", 95, MetricKind::Block), &t).severity, Severity::Critical);
        assert_eq!(classify(&rec("/", 85, MetricKind::Block), &t).severity, Severity::Normal);
    }

    #[test]
    fn test_kinds_are_independent() {
        let t = thr(Some(50), Some(60), None, Some(90));
        // Block thresholds never apply to inode rows.
        let c = classify(&rec("/", 70, MetricKind::Inode), &t);
        assert_eq!(c.severity, Severity::Normal);
        let c = classify(&rec("/", 95, MetricKind::Inode), &t);
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(c.threshold, Some(90));
    }

    #[test]
    fn test_reason_strings() {
        let t = thr(Some(90), None, Some(85), None);
        let block = classify(&rec("/var", 92, MetricKind::Block), &t);
        assert_eq!(block.reason().as_deref(), Some("/var 92% > 90%"));
        let inode = classify(&rec("/var", 88, MetricKind::Inode), &t);
        assert_eq!(inode.reason().as_deref(), Some("/var inodes 88% > 85%"));
        let normal = classify(&rec("/var", 1, MetricKind::Block), &t);
        assert_eq!(normal.reason(), None);
    }

    #[test]
    fn test_rules_wants() {
        let t = thr(None, None, Some(80), None);
        assert!(!t.wants(MetricKind::Block));
        assert!(t.wants(MetricKind::Inode));
        assert!(!t.is_empty());
        assert!(ThresholdRules::default().is_empty());
    }
}
