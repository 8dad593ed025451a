use serde::{Deserialize, Serialize};

/// Metadata about a loaded CSV dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub num_columns: usize,
    pub columns: Vec<String>,
    pub input_columns: Vec<String>,
    pub target_columns: Vec<String>,
}
