use crate::config::DataConfig;
use crate::data::Dataset;
use crate::error::{EfrError, Result};
use polars::prelude::*;
use std::path::Path;
use super::{types::DatasetMetadata, validator::DataValidator};

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P, separator: u8, has_header: bool) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(has_header)
            .map_parse_options(|opts| opts.with_separator(separator))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| EfrError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and convert a CSV file into a [`Dataset`]
    pub fn load_dataset(config: &DataConfig) -> Result<Dataset> {
        let df = Self::load(&config.path, config.separator as u8, config.has_header)?;

        DataValidator::validate_numeric(&df)?;
        DataValidator::validate_targets(&df, config.targets)?;
        DataValidator::validate_minimum_rows(&df, 1)?;

        // Warn about nulls but don't fail
        let null_report = DataValidator::check_nulls(&df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected, treating them as 0.0: {:?}", null_report);
        }

        let metadata = Self::create_metadata(&config.path, &df, config.targets);
        let dataset = Self::to_dataset(&df, config.targets)?.with_leave_out(config.leave_out_idx);
        log::info!(
            "Loaded {} records ({} inputs, {} targets) from {}",
            metadata.num_rows,
            metadata.input_columns.len(),
            metadata.target_columns.len(),
            metadata.file_path
        );
        log::debug!("Target columns: {:?}", metadata.target_columns);
        Ok(dataset)
    }

    /// Copy a numeric DataFrame into a row-major [`Dataset`]
    pub fn to_dataset(df: &DataFrame, targets: usize) -> Result<Dataset> {
        let rows = df.height();
        let cols = df.width();
        let mut values = vec![0.0; rows * cols];

        for (c, col_name) in df.get_column_names().into_iter().enumerate() {
            let column = df.column(col_name)?.cast(&DataType::Float64)?;
            let column = column.f64()?;
            for (r, value) in column.into_iter().enumerate() {
                values[r * cols + c] = value.unwrap_or(0.0);
            }
        }

        Dataset::new(values, rows, cols, targets)
    }

    /// Create metadata for a loaded DataFrame
    pub fn create_metadata<P: AsRef<Path>>(
        path: P,
        df: &DataFrame,
        targets: usize,
    ) -> DatasetMetadata {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let split = columns.len().saturating_sub(targets);

        DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            num_columns: df.width(),
            input_columns: columns[..split].to_vec(),
            target_columns: columns[split..].to_vec(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("efrgen-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_semicolon_dataset() {
        let path = write_temp(
            "solar.csv",
            "soes_avg;soes;e_avg;tx\n0.1;0.2;0.3;1\n0.4;0.5;0.6;0\n",
        );
        let config = DataConfig {
            path: path.clone(),
            targets: 1,
            separator: ';',
            has_header: true,
            leave_out_idx: None,
        };

        let dataset = CsvConnector::load_dataset(&config).unwrap();
        assert_eq!(dataset.records(), 2);
        assert_eq!(dataset.inputs(), 3);
        assert_eq!(dataset.row(1), &[0.4, 0.5, 0.6, 0.0]);
        assert!((dataset.sigma(0) - 1.0).abs() < 1e-12);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_metadata_split() {
        let path = write_temp("meta.csv", "a,b,c\n1,2,3\n");
        let df = CsvConnector::load(&path, b',', true).unwrap();
        let metadata = CsvConnector::create_metadata(&path, &df, 1);

        assert_eq!(metadata.input_columns, vec!["a", "b"]);
        assert_eq!(metadata.target_columns, vec!["c"]);
        assert_eq!(metadata.num_rows, 1);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let config = DataConfig {
            path: PathBuf::from("/nonexistent/efrgen.csv"),
            ..DataConfig::default()
        };
        assert!(CsvConnector::load_dataset(&config).is_err());
    }
}
