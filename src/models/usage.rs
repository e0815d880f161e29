use crate::error::CheckError;
use std::fmt;

/// Which usage column a df row reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Block,
    Inode,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Block => "block",
            MetricKind::Inode => "inode",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One filesystem row of a `df -PT` style report, for one metric kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub device:       String,
    pub fs_type:      String,
    pub mount:        String,
    /// Integer part of the Capacity/IUse% column; can exceed 100.
    pub capacity_pct: u32,
    pub kind:         MetricKind,
    pub raw_line:     String,
}

impl UsageRecord {
    /// Split a POSIX df row: device, type, total, used, avail, capacity, mount.
    ///
    /// Anything past the seventh column is folded back into the mount point,
    /// so mounts containing spaces survive.
    pub fn parse(line: &str, kind: MetricKind) -> Result<Self, CheckError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 7 {
            return Err(CheckError::MalformedRecord { line: line.to_string() });
        }

        let capacity_pct = parse_capacity(fields[5])
            .ok_or_else(|| CheckError::MalformedRecord { line: line.to_string() })?;

        Ok(UsageRecord {
            device:       fields[0].to_string(),
            fs_type:      fields[1].to_string(),
            mount:        fields[6..].join(" "),
            capacity_pct,
            kind,
            raw_line:     line.to_string(),
        })
    }
}

/// "95%" → 95. df prints "-" for filesystems without an inode table.
fn parse_capacity(field: &str) -> Option<u32> {
    if field == "-" {
        return Some(0);
    }
    field.strip_suffix('%').unwrap_or(field).parse().ok()
}
