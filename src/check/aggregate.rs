use super::threshold::{Classification, Severity, ThresholdRules};
use super::Status;

/// Overall outcome of one run plus the line operators will read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status:  Status,
    pub summary: String,
}

/// Worst classification wins. Offending reasons are listed critical-first,
/// each group in evaluation order; a clean run lists every mount it saw.
pub fn aggregate(classified: &[Classification], thr: &ThresholdRules) -> Verdict {
    let worst = classified
        .iter()
        .map(|c| c.severity)
        .max()
        .unwrap_or(Severity::Normal);

    let status = match worst {
        Severity::Critical => Status::Critical,
        Severity::Warning  => Status::Warning,
        Severity::Normal   => Status::Ok,
    };

    let summary = if worst == Severity::Normal {
        healthy_summary(classified, thr)
    } else {
        [Severity::Critical, Severity::Warning]
            .iter()
            .flat_map(|sev| classified.iter().filter(move |c| c.severity == *sev))
            .filter_map(Classification::reason)
            .collect::<Vec<_>>()
            .join(", ")
    };

    Verdict { status, summary }
}

/// "/, /var < 90% and inodes < 85%"
fn healthy_summary(classified: &[Classification], thr: &ThresholdRules) -> String {
    let mut mounts: Vec<&str> = Vec::new();
    for c in classified {
        if !mounts.contains(&c.record.mount.as_str()) {
            mounts.push(&c.record.mount);
        }
    }

    let mut msg = mounts.join(", ");

    let block = thr.block_warn.or(thr.block_crit);
    if let Some(limit) = block {
        msg.push_str(&format!(" < {}%", limit));
    }
    if let Some(limit) = thr.inode_warn.or(thr.inode_crit) {
        if block.is_some() {
            msg.push_str(" and");
        }
        msg.push_str(&format!(" inodes < {}%", limit));
    }
    msg
}
