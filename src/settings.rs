use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

pub const DEFAULT_CARD_PAYMENT_LABEL: &str = "Card Payment";
pub const DEFAULT_DATE_COLUMN: &str = "Completed Date";

/// How ambiguous `A/B/YYYY` dates are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

/// What to do with amount/fee values that are not numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    #[default]
    CoerceToZero,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    Auto,
    Workbook,
    Csv,
}

impl std::str::FromStr for InputFormat {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "workbook" | "xlsx" | "xls" => Ok(Self::Workbook),
            "csv" => Ok(Self::Csv),
            other => Err(TallyError::Settings(format!("unknown input format: {other}"))),
        }
    }
}

/// Knobs for one run of the statement pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub card_payment_label: String,
    pub date_column: String,
    pub date_order: DateOrder,
    pub numeric_policy: NumericPolicy,
    pub input_format: InputFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            card_payment_label: DEFAULT_CARD_PAYMENT_LABEL.to_string(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            date_order: DateOrder::default(),
            numeric_policy: NumericPolicy::default(),
            input_format: InputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Settings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.clone()
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("tally.db")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

/// Database location: an explicit override wins over the configured data dir.
pub fn resolve_db_path(db_override: Option<&str>) -> PathBuf {
    match db_override {
        Some(path) => PathBuf::from(shellexpand_path(path)),
        None => load_settings().db_path(),
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            pipeline: PipelineConfig {
                date_order: DateOrder::DayFirst,
                ..PipelineConfig::default()
            },
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.pipeline.date_order, DateOrder::DayFirst);
        assert!(json.contains("\"day_first\""));
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(!s.data_dir.is_empty());
        assert!(s.db_path().ends_with("tally.db"));
        assert_eq!(s.pipeline.card_payment_label, "Card Payment");
        assert_eq!(s.pipeline.date_column, "Completed Date");
        assert_eq!(s.pipeline.numeric_policy, NumericPolicy::CoerceToZero);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "pipeline": {"card_payment_label": "CARD_PAYMENT"}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.pipeline.card_payment_label, "CARD_PAYMENT");
        assert_eq!(s.pipeline.date_column, "Completed Date");
        assert_eq!(s.pipeline.input_format, InputFormat::Auto);

        let bare: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(bare.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_input_format_from_str() {
        assert_eq!("CSV".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!("xlsx".parse::<InputFormat>().unwrap(), InputFormat::Workbook);
        assert!("pdf".parse::<InputFormat>().is_err());
    }

    #[test]
    fn test_explicit_db_path_wins() {
        assert_eq!(
            resolve_db_path(Some("/tmp/other.db")),
            PathBuf::from("/tmp/other.db")
        );
    }
}
