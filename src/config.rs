use crate::dashboard::{DashboardOptions, DEFAULT_TARGET_PERCENT};
use crate::engine::DEFAULT_TOP_LIMIT;
use crate::error::{QualityError, Result};
use crate::schema::Category;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "subcon_quality.json";

/// Where the inspection files live and how the dashboard is tuned.
///
/// Every field is optional in the JSON file; missing ones take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub upper_file: String,
    pub bottom_file: String,
    pub outsourcing_file: String,
    pub output_dir: PathBuf,
    pub top_limit: usize,
    pub target_reject_percent: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            upper_file: "upper.csv".to_string(),
            bottom_file: "bottom.csv".to_string(),
            outsourcing_file: "outsourcing.csv".to_string(),
            output_dir: PathBuf::from("."),
            top_limit: DEFAULT_TOP_LIMIT,
            target_reject_percent: DEFAULT_TARGET_PERCENT,
        }
    }
}

impl DashboardConfig {
    /// Load `path` if it exists, defaults otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_limit == 0 {
            return Err(QualityError::Config("top_limit must be at least 1".to_string()));
        }
        if !self.target_reject_percent.is_finite() || self.target_reject_percent < 0.0 {
            return Err(QualityError::Config(format!(
                "target_reject_percent must be a non-negative number, got {}",
                self.target_reject_percent
            )));
        }
        Ok(())
    }

    pub fn data_path(&self, category: Category) -> PathBuf {
        let file = match category {
            Category::Upper => &self.upper_file,
            Category::Bottom => &self.bottom_file,
            Category::Outsourcing => &self.outsourcing_file,
        };
        self.data_dir.join(file)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            top_limit: self.top_limit,
        }
    }
}
