//! Run configuration.
//!
//! Every section has built-in defaults matching the archive's data files, so
//! a config file only needs the values it changes:
//!
//! ```toml
//! [stores]
//! people = "data/bmc_people_index.json"
//!
//! [dates.seasons]
//! fall = 10
//!
//! [fetch]
//! delay_secs = 15
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::ClassifierConfig;
use crate::date::DateConfig;
use crate::error::{ArchiveError, Result};
use crate::fetch::FetchPolicy;
use crate::headlines::HeadlineConfig;
use crate::roles::SummerRules;

/// Default locations of the canonical stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorePaths {
    pub people: PathBuf,
    pub archive: PathBuf,
    pub courses: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            people: PathBuf::from("bmc_people_index.json"),
            archive: PathBuf::from("bmc_complete_archive.json"),
            courses: PathBuf::from("bmc_courses_by_year.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub stores: StorePaths,
    pub dates: DateConfig,
    pub classifier: ClassifierConfig,
    pub fetch: FetchPolicy,
    pub headlines: HeadlineConfig,
    pub summer: SummerRules,
}

impl ArchiveConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ArchiveConfig = toml::from_str(text)?;
        config.validate().map_err(ArchiveError::Config)?;
        Ok(config)
    }

    /// Built-in defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.dates.validate()?;
        self.classifier.validate()?;
        self.headlines.validate()?;
        self.summer.validate()?;
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ArchiveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stores.people, PathBuf::from("bmc_people_index.json"));
        assert_eq!(config.dates.academic_year_start_month, 9);
        assert_eq!((config.dates.earliest_year, config.dates.latest_year), (1919, 1960));
        assert_eq!(config.fetch.delay_secs, 12);
        assert_eq!(config.summer.first_year, 1944);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(ArchiveConfig::from_toml("").unwrap(), ArchiveConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ArchiveConfig::from_toml(
            r#"
            [stores]
            archive = "out/archive.json"

            [dates.seasons]
            fall = 10

            [fetch]
            delay_secs = 1
            user_agent = "test agent"

            [summer]
            first_year = 1945
            "#,
        )
        .unwrap();
        assert_eq!(config.stores.archive, PathBuf::from("out/archive.json"));
        assert_eq!(config.stores.people, PathBuf::from("bmc_people_index.json"));
        assert_eq!(config.dates.seasons.fall, 10);
        assert_eq!(config.dates.seasons.spring, 3);
        assert_eq!(config.fetch.delay_secs, 1);
        assert_eq!(config.fetch.timeout_secs, 60);
        assert_eq!(config.summer.first_year, 1945);
        assert_eq!(config.summer.last_year, 1953);
    }

    #[test]
    fn test_classifier_terms_from_file() {
        let config = ArchiveConfig::from_toml(
            r#"
            [classifier]
            exclude = []
            priority = ["science"]

            [[classifier.categories]]
            name = "science"
            terms = ["physics", "atom"]
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.categories.len(), 1);
        assert_eq!(config.classifier.categories[0].name, "science");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ArchiveConfig::from_toml("[dates.seasons]\nfall = 13\n"),
            Err(ArchiveError::Config(_))
        ));
        assert!(matches!(
            ArchiveConfig::from_toml("[fetch]\ntimeout_secs = 0\n"),
            Err(ArchiveError::Config(_))
        ));
        assert!(matches!(
            ArchiveConfig::from_toml("[fetch\n"),
            Err(ArchiveError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ArchiveConfig::load(Some(&dir.path().join("absent.toml"))),
            Err(ArchiveError::Io { .. })
        ));
        assert_eq!(ArchiveConfig::load(None).unwrap(), ArchiveConfig::default());
    }
}
