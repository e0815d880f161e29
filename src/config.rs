use crate::check::filter::FilterRules;
use crate::check::threshold::ThresholdRules;
use crate::collectors::SourceKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub disk: DiskConfig,

    #[serde(default)]
    pub zenoss: ZenossConfig,
}

/// Defaults for the `disk` subcommand; every field can be overridden by a flag.
///
/// Example in diskcheck.toml:
/// ```toml
/// [disk]
/// exclude_types = ["tmpfs", "devtmpfs", "squashfs"]
/// block_warn    = 85
/// block_crit    = 95
/// inode_crit    = 95
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(flatten)]
    pub filters: FilterRules,

    #[serde(flatten)]
    pub thresholds: ThresholdRules,

    /// Include remote (NFS, CIFS, ...) filesystems.
    #[serde(default)]
    pub remote: bool,

    #[serde(default)]
    pub source: SourceKind,
}

/// Where and how to reach the Zenoss XML-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZenossConfig {
    pub server:       String,
    pub port:         u16,
    pub user:         String,
    pub password:     String,
    /// Zenoss device every event is filed under.
    pub device:       String,
    pub event_class:  String,
    /// Bound on the whole sendEvent exchange.
    pub timeout_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for ZenossConfig {
    fn default() -> Self {
        Self {
            server:       "localhost".into(),
            port:         8081,
            user:         "admin".into(),
            password:     "zenoss".into(),
            device:       "hostname".into(),
            event_class:  "/Status/Sensu".into(),
            timeout_secs: 10,
        }
    }
}

// ── Load ──────────────────────────────────────────────────────────────

impl Config {
    /// An explicit path must load. The default location is best-effort:
    /// a missing or broken file falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return try_load(path);
        }
        let Some(path) = Config::config_path() else {
            log::debug!("no config dir, using defaults");
            return Ok(Config::default());
        };
        match try_load(&path) {
            Ok(c)  => Ok(c),
            Err(e) => {
                if path.exists() {
                    log::warn!("ignoring {}: {:#}", path.display(), e);
                } else {
                    log::debug!("{} not found, using defaults", path.display());
                }
                Ok(Config::default())
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("diskcheck").join("diskcheck.toml"))
    }

    /// TOML rendering with the Zenoss password masked.
    pub fn display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.zenoss.password.is_empty() {
            shown.zenoss.password = "********".into();
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

fn try_load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: Config = toml::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_explicit_file() {
        let f = write_config(
            r#"
[disk]
exclude_types = ["tmpfs", "squashfs"]
exclude_lines = ["^/dev/loop"]
block_warn = 85
inode_crit = 95
remote = true
source = "statvfs"

[zenoss]
server = "zenoss.example.com"
port = 9090
"#,
        );
        let cfg = Config::load(Some(f.path())).unwrap();
        assert_eq!(cfg.disk.filters.exclude_types, Some(vec!["tmpfs".to_string(), "squashfs".to_string()]));
        assert_eq!(cfg.disk.filters.exclude_lines, Some(vec!["^/dev/loop".to_string()]));
        assert_eq!(cfg.disk.filters.include_types, None);
        assert_eq!(cfg.disk.thresholds.block_warn, Some(85));
        assert_eq!(cfg.disk.thresholds.block_crit, None);
        assert_eq!(cfg.disk.thresholds.inode_crit, Some(95));
        assert!(cfg.disk.remote);
        assert_eq!(cfg.disk.source, SourceKind::Statvfs);
        assert_eq!(cfg.zenoss.server, "zenoss.example.com");
        assert_eq!(cfg.zenoss.port, 9090);
        // Unset keys keep their defaults.
        assert_eq!(cfg.zenoss.event_class, "/Status/Sensu");
        assert_eq!(cfg.zenoss.timeout_secs, 10);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let f = write_config("");
        let cfg = Config::load(Some(f.path())).unwrap();
        assert!(cfg.disk.thresholds.is_empty());
        assert_eq!(cfg.disk.source, SourceKind::Df);
        assert_eq!(cfg.zenoss, ZenossConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_bad_toml_errors() {
        let f = write_config("[disk]\nblock_warn = \"lots\"\n");
        assert!(Config::load(Some(f.path())).is_err());
    }

    #[test]
    fn test_display_masks_password() {
        let text = Config::default().display_toml().unwrap();
        assert!(text.contains("********"));
        assert!(!text.contains("\"zenoss\""));
    }
}
