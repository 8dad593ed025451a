use crate::error::{EfrError, Result};
use polars::prelude::*;

pub struct DataValidator;

impl DataValidator {
    /// Every column must be numeric
    pub fn validate_numeric(df: &DataFrame) -> Result<()> {
        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            if !matches!(series.dtype(), DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32) {
                return Err(EfrError::DataLoading(format!(
                    "Column '{}' must be numeric, found {:?}",
                    col_name,
                    series.dtype()
                )));
            }
        }
        Ok(())
    }

    /// Check the target split leaves a sane layout
    pub fn validate_targets(df: &DataFrame, targets: usize) -> Result<()> {
        if targets == 0 || targets > df.width() {
            return Err(EfrError::DataLoading(format!(
                "Cannot take {} target columns from {} columns",
                targets,
                df.width()
            )));
        }
        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(EfrError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null counts per column, only columns with nulls are reported
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_numeric_data_passes() {
        let df = df! {
            "soes_avg" => &[0.1, 0.2, 0.3],
            "soes" => &[0.5, 0.4, 0.3],
            "tx" => &[1.0, 0.0, 1.0],
        }
        .unwrap();

        assert!(DataValidator::validate_numeric(&df).is_ok());
        assert!(DataValidator::validate_targets(&df, 1).is_ok());
        assert!(DataValidator::validate_minimum_rows(&df, 3).is_ok());
        assert!(DataValidator::check_nulls(&df).unwrap().is_empty());
    }

    #[test]
    fn test_text_column_is_rejected() {
        let df = df! {
            "label" => &["a", "b"],
            "tx" => &[1.0, 0.0],
        }
        .unwrap();

        assert!(DataValidator::validate_numeric(&df).is_err());
    }

    #[test]
    fn test_target_split_bounds() {
        let df = df! {
            "a" => &[0.1, 0.2],
        }
        .unwrap();

        assert!(DataValidator::validate_targets(&df, 0).is_err());
        assert!(DataValidator::validate_targets(&df, 2).is_err());
        assert!(DataValidator::validate_minimum_rows(&df, 5).is_err());
    }
}
