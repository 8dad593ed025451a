use super::traits::ConfigSection;
use crate::error::EfrError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the dataset comes from and how its columns split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Number of trailing target columns
    pub targets: usize,
    pub separator: char,
    pub has_header: bool,
    /// Row excluded from the target sums
    pub leave_out_idx: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.csv"),
            targets: 1,
            separator: ',',
            has_header: true,
            leave_out_idx: None,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), EfrError> {
        if self.targets == 0 {
            return Err(EfrError::Configuration(
                "At least one target column is required".to_string()
            ));
        }
        if !self.separator.is_ascii() {
            return Err(EfrError::Configuration(
                "Separator must be a single ASCII character".to_string()
            ));
        }
        Ok(())
    }
}
