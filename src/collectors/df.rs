use super::UsageSource;
use crate::models::usage::MetricKind;
use anyhow::{Context, Result};
use std::process::Command;

/// Runs GNU/POSIX `df` with the type column (`-T`), which BSD df lacks.
pub struct DfSource;

/// `-lPT` for local block usage; `-r` drops `-l`, inodes append `i`.
pub fn df_args(kind: MetricKind, include_remote: bool) -> String {
    let mut args = String::from(if include_remote { "-PT" } else { "-lPT" });
    if kind == MetricKind::Inode {
        args.push('i');
    }
    args
}

impl UsageSource for DfSource {
    fn fetch_usage(&self, kind: MetricKind, include_remote: bool) -> Result<Vec<String>> {
        let args = df_args(kind, include_remote);
        log::debug!("running df {}", args);

        let out = Command::new("df")
            .arg(&args)
            .output()
            .context("df not found")?;

        // df exits non-zero when a single mount is unreadable but still
        // prints every other row.
        if !out.status.success() {
            log::warn!(
                "df {} exited with {}: {}",
                args,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
            if out.stdout.is_empty() {
                anyhow::bail!("df {} produced no output", args);
            }
        }

        Ok(body_lines(&String::from_utf8_lossy(&out.stdout)))
    }
}

/// Drop the header row and blank lines.
fn body_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}
