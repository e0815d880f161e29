use crate::error::CheckError;
use crate::models::usage::UsageRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which filesystems a run looks at. `None` means the rule is not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_types:  Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_types:  Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_mounts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_mounts: Option<Vec<String>>,
    /// Regular expressions searched (unanchored) in the raw df line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_lines:  Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_lines:  Option<Vec<String>>,
}

/// Validated, ready-to-match form of [`FilterRules`].
#[derive(Debug)]
pub struct Filter<'a> {
    rules:         &'a FilterRules,
    include_lines: Option<Vec<Regex>>,
    exclude_lines: Option<Vec<Regex>>,
}

impl<'a> Filter<'a> {
    pub fn new(rules: &'a FilterRules) -> Result<Self, CheckError> {
        if rules.include_lines.is_some() && rules.exclude_lines.is_some() {
            return Err(CheckError::ConflictingLineFilters);
        }
        Ok(Filter {
            rules,
            include_lines: compile(rules.include_lines.as_deref())?,
            exclude_lines: compile(rules.exclude_lines.as_deref())?,
        })
    }

    /// Inclusions are preconditions; the first matching exclusion drops the record.
    pub fn is_in_scope(&self, rec: &UsageRecord) -> bool {
        if let Some(pats) = &self.include_lines {
            if !pats.iter().any(|re| re.is_match(&rec.raw_line)) { return false; }
        }
        if let Some(types) = &self.rules.include_types {
            if !contains(types, &rec.fs_type) { return false; }
        }
        if let Some(mounts) = &self.rules.include_mounts {
            if !contains(mounts, &rec.mount) { return false; }
        }
        if let Some(types) = &self.rules.exclude_types {
            if contains(types, &rec.fs_type) { return false; }
        }
        if let Some(mounts) = &self.rules.exclude_mounts {
            if contains(mounts, &rec.mount) { return false; }
        }
        if let Some(pats) = &self.exclude_lines {
            if pats.iter().any(|re| re.is_match(&rec.raw_line)) { return false; }
        }
        true
    }
}

fn contains(set: &[String], value: &str) -> bool {
    set.iter().any(|s| s == value)
}

fn compile(patterns: Option<&[String]>) -> Result<Option<Vec<Regex>>, CheckError> {
    let Some(patterns) = patterns else { return Ok(None) };
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| CheckError::InvalidPattern {
                pattern: p.clone(),
                reason:  e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usage::MetricKind;

    fn rec(line: &str) -> UsageRecord {
        UsageRecord::parse(line, MetricKind::Block).unwrap()
    }

    fn sample() -> Vec<UsageRecord> {
        vec![
            rec("/dev/sda1 ext4 100 95 5 95% /"),
            rec("/dev/sda2 ext4 100 40 60 40% /var"),
            rec("tmpfs tmpfs 100 1 99 1% /run"),
            rec("/dev/loop0 squashfs 10 10 0 100% /snap/core/1"),
        ]
    }

    fn scoped<'r>(filter: &Filter<'_>, recs: &'r [UsageRecord]) -> Vec<&'r str> {
        recs.iter().filter(|r| filter.is_in_scope(r)).map(|r| r.mount.as_str()).collect()
    }

    fn list(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_no_rules_keeps_everything() {
        let rules = FilterRules::default();
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()).len(), 4);
    }

    #[test]
    fn test_include_types() {
        let rules = FilterRules { include_types: list(&["ext4"]), ..Default::default() };
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()), vec!["/", "/var"]);
    }

    #[test]
    fn test_exclude_types_and_mounts() {
        let rules = FilterRules {
            exclude_types:  list(&["tmpfs", "squashfs"]),
            exclude_mounts: list(&["/var"]),
            ..Default::default()
        };
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()), vec!["/"]);
    }

    #[test]
    fn test_include_mounts() {
        let rules = FilterRules { include_mounts: list(&["/var", "/run"]), ..Default::default() };
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()), vec!["/var", "/run"]);
    }

    #[test]
    fn test_exclusion_beats_inclusion() {
        let rules = FilterRules {
            include_types: list(&["ext4"]),
            exclude_types: list(&["ext4"]),
            ..Default::default()
        };
        let filter = Filter::new(&rules).unwrap();
        assert!(scoped(&filter, &sample()).is_empty());
    }

    #[test]
    fn test_include_line_regex() {
        let rules = FilterRules { include_lines: list(&["^/dev/sd"]), ..Default::default() };
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()), vec!["/", "/var"]);
    }

    #[test]
    fn test_exclude_line_regex_is_unanchored() {
        let rules = FilterRules { exclude_lines: list(&["loop", "tmp"]), ..Default::default() };
        let filter = Filter::new(&rules).unwrap();
        assert_eq!(scoped(&filter, &sample()), vec!["/", "/var"]);
    }

    #[test]
    fn test_both_line_filters_rejected() {
        let rules = FilterRules {
            include_lines: list(&["sd"]),
            exclude_lines: list(&["loop"]),
            ..Default::default()
        };
        assert!(matches!(Filter::new(&rules), Err(CheckError::ConflictingLineFilters)));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let rules = FilterRules { exclude_lines: list(&["(unclosed"]), ..Default::default() };
        let err = Filter::new(&rules).unwrap_err();
        assert!(matches!(err, CheckError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let rules = FilterRules {
            exclude_types: list(&["tmpfs"]),
            exclude_lines: list(&["snap"]),
            ..Default::default()
        };
        let filter = Filter::new(&rules).unwrap();
        let recs = sample();
        let once: Vec<UsageRecord> = recs.iter().filter(|r| filter.is_in_scope(r)).cloned().collect();
        let twice: Vec<UsageRecord> = once.iter().filter(|r| filter.is_in_scope(r)).cloned().collect();
        assert_eq!(once, twice);
        assert_eq!(scoped(&filter, &recs), scoped(&filter, &recs));
    }
}
