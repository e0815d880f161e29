use super::UsageSource;
use crate::models::usage::MetricKind;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Network filesystems left out unless remote filesystems are requested.
const REMOTE_FS: &[&str] = &[
    "nfs", "nfs4", "cifs", "smbfs", "smb3", "sshfs", "fuse.sshfs",
    "ceph", "glusterfs", "fuse.glusterfs", "9p", "afs", "lustre",
];

/// Native collector: /proc/mounts + statvfs(2), rendered as `df -PT` rows so
/// the same parser and line patterns apply.
pub struct StatvfsSource {
    mounts_path: PathBuf,
}

impl Default for StatvfsSource {
    fn default() -> Self {
        Self { mounts_path: PathBuf::from("/proc/mounts") }
    }
}

/// Usage numbers for one mount, in df units (1K blocks or inodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub total: u64,
    pub used:  u64,
    pub avail: u64,
}

impl Usage {
    /// df's rounding: used / (used + avail), rounded up. `None` when df would print "-".
    pub fn capacity_pct(&self) -> Option<u64> {
        let denom = self.used + self.avail;
        if self.total == 0 || denom == 0 {
            return None;
        }
        Some((self.used * 100).div_ceil(denom))
    }
}

impl UsageSource for StatvfsSource {
    fn fetch_usage(&self, kind: MetricKind, include_remote: bool) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.mounts_path)
            .with_context(|| format!("reading {}", self.mounts_path.display()))?;

        let mut out = Vec::new();
        for (device, mount, fs_type) in parse_mounts(&content) {
            if !include_remote && REMOTE_FS.contains(&fs_type.as_str()) { continue; }

            let usage = match statvfs_for(&mount, kind) {
                Ok(Some(u)) => u,
                // Pseudo filesystems with no blocks; df hides these too.
                Ok(None)    => continue,
                Err(e)      => {
                    log::debug!("statvfs {} failed: {}", mount, e);
                    continue;
                }
            };
            out.push(render_row(&device, &fs_type, &usage, &mount));
        }
        Ok(out)
    }
}

pub fn parse_mounts(content: &str) -> Vec<(String, String, String)> {
    let mut v = Vec::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 { continue; }
        v.push((unescape(fields[0]), unescape(fields[1]), fields[2].to_string()));
    }
    v
}

/// /proc/mounts writes space, tab, newline and backslash as `\ooo`.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap_or("");
            if let Ok(b) = u8::from_str_radix(digits, 8) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn statvfs_for(mount: &str, kind: MetricKind) -> Result<Option<Usage>> {
    use nix::sys::statvfs::statvfs;
    let stat = statvfs(mount)?;

    let blocks = stat.blocks() as u64;
    if blocks == 0 {
        return Ok(None);
    }

    let usage = match kind {
        MetricKind::Block => {
            let frsize = stat.fragment_size() as u64;
            let to_k   = |n: u64| n * frsize / 1024;
            let total  = to_k(blocks);
            let free   = to_k(stat.blocks_free() as u64);
            Usage {
                total,
                used:  total.saturating_sub(free),
                avail: to_k(stat.blocks_available() as u64),
            }
        }
        MetricKind::Inode => {
            let total = stat.files() as u64;
            let free  = stat.files_free() as u64;
            Usage { total, used: total.saturating_sub(free), avail: free }
        }
    };
    Ok(Some(usage))
}

pub fn render_row(device: &str, fs_type: &str, u: &Usage, mount: &str) -> String {
    let capacity = match u.capacity_pct() {
        Some(p) => format!("{}%", p),
        None    => "-".to_string(),
    };
    format!(
        "{} {} {} {} {} {} {}",
        escape_ws(device), escape_ws(fs_type), u.total, u.used, u.avail, capacity, mount
    )
}

/// Re-apply the octal escapes for whitespace; only the mount column may
/// contain raw spaces.
fn escape_ws(field: &str) -> String {
    field
        .replace(' ', "\\040")
        .replace('\t', "\\011")
        .replace('\n', "\\012")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usage::UsageRecord;

    #[test]
    fn test_capacity_rounds_up() {
        let u = Usage { total: 1000, used: 901, avail: 99 };
        assert_eq!(u.capacity_pct(), Some(91));
        let u = Usage { total: 1000, used: 900, avail: 100 };
        assert_eq!(u.capacity_pct(), Some(90));
    }

    #[test]
    fn test_capacity_without_inode_table() {
        let u = Usage { total: 0, used: 0, avail: 0 };
        assert_eq!(u.capacity_pct(), None);
    }

    #[test]
    fn test_rendered_row_parses() {
        let u = Usage { total: 1000, used: 950, avail: 50 };
        let row = render_row("/dev/sda1", "ext4", &u, "/srv/My Data");
        assert_eq!(row, "/dev/sda1 ext4 1000 950 50 95% /srv/My Data");
        let rec = UsageRecord::parse(&row, MetricKind::Block).unwrap();
        assert_eq!(rec.capacity_pct, 95);
        assert_eq!(rec.mount, "/srv/My Data");
    }

    #[test]
    fn test_render_row_keeps_device_in_one_column() {
        let u = Usage { total: 100, used: 50, avail: 50 };
        let row = render_row("//nas/My Share", "cifs", &u, "/mnt/My Share");
        assert_eq!(row, "//nas/My\\040Share cifs 100 50 50 50% /mnt/My Share");
        let rec = UsageRecord::parse(&row, MetricKind::Block).unwrap();
        assert_eq!(rec.fs_type, "cifs");
        assert_eq!(rec.capacity_pct, 50);
        assert_eq!(rec.mount, "/mnt/My Share");
    }

    #[test]
    fn test_parse_mounts_unescapes() {
        let content = "/dev/sda1 / ext4 rw,relatime 0 0\n\
                       //nas/share /mnt/My\\040Share cifs rw 0 0\n\
                       bogus\n";
        let mounts = parse_mounts(content);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].1, "/mnt/My Share");
        assert_eq!(mounts[1].2, "cifs");
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape("abc\\"), "abc\\");
        assert_eq!(unescape("a\\04"), "a\\04");
    }
}
