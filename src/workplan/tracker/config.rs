use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::workplan::tracker::error::Result;

pub const DEFAULT_TRACKER_FILE: &str = "Full_Workplan_Tracker.xlsx";
pub const DEFAULT_TRACKER_SHEET: &str = "All_Tasks";
pub const DEFAULT_BACKUP_DIR: &str = "backups";
pub const DEFAULT_BACKUP_KEEP: usize = 10;
pub const DEFAULT_SOURCE_SHEET: &str = "4. ACMS WorkPlan detail v1";
pub const DEFAULT_HEADER_ROW: u32 = 1;
pub const DEFAULT_MAX_COLUMN_WIDTH: usize = 60;
pub const DEFAULT_HEADER_FILL: u32 = 0x2F75B5;

/// Runtime configuration. Every field has a default, so an empty or partial
/// TOML file is valid.
///
/// ```toml
/// tracker_file = "Full_Workplan_Tracker.xlsx"
/// backup_keep = 10
///
/// [source]
/// file = "WorkPlan/workplan.xlsx"
/// sheet = "4. ACMS WorkPlan detail v1"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub tracker_file: PathBuf,
    pub tracker_sheet: String,
    pub backup_dir: PathBuf,
    pub backup_keep: usize,
    pub source: SourceConfig,
}

/// Where the workplan extractor reads from and how the tracker it writes is styled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub file: Option<PathBuf>,
    pub sheet: String,
    /// Zero-based sheet row holding the column headers; rows above it are banners.
    pub header_row: u32,
    pub max_column_width: usize,
    pub header_fill: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracker_file: PathBuf::from(DEFAULT_TRACKER_FILE),
            tracker_sheet: DEFAULT_TRACKER_SHEET.to_string(),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            backup_keep: DEFAULT_BACKUP_KEEP,
            source: SourceConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            file: None,
            sheet: DEFAULT_SOURCE_SHEET.to_string(),
            header_row: DEFAULT_HEADER_ROW,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            header_fill: DEFAULT_HEADER_FILL,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Loads `path` when given, otherwise falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TrackerConfig::from_toml_str(
            r#"
            backup_keep = 3

            [source]
            file = "plan.xlsx"
            "#,
        )
        .unwrap();

        assert_eq!(config.backup_keep, 3);
        assert_eq!(config.tracker_sheet, DEFAULT_TRACKER_SHEET);
        assert_eq!(config.source.file, Some(PathBuf::from("plan.xlsx")));
        assert_eq!(config.source.sheet, DEFAULT_SOURCE_SHEET);
        assert_eq!(config.source.header_row, 1);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = TrackerConfig::from_toml_str("backup_keep = \"ten\"");
        assert!(matches!(
            result,
            Err(crate::workplan::tracker::TrackerError::Config(_))
        ));
    }
}
