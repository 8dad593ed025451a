use crate::error::{EfrError, Result};

/// Row-major numeric matrix whose trailing `targets` columns are outputs.
///
/// Per-target column sums ("sigmas") are computed once at construction and
/// skip the left-out row, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    targets: usize,
    leave_out_idx: Option<usize>,
    sigmas: Vec<f64>,
}

impl Dataset {
    pub fn new(values: Vec<f64>, rows: usize, cols: usize, targets: usize) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(EfrError::DataLoading(format!(
                "Expected {} values for a {}x{} dataset, got {}",
                rows * cols,
                rows,
                cols,
                values.len()
            )));
        }
        if targets > cols {
            return Err(EfrError::DataLoading(format!(
                "Dataset has {} columns but {} targets were requested",
                cols, targets
            )));
        }

        let mut dataset = Self {
            values,
            rows,
            cols,
            targets,
            leave_out_idx: None,
            sigmas: Vec::new(),
        };
        dataset.update_sigmas();
        Ok(dataset)
    }

    /// Build from equally wide rows
    pub fn from_rows(rows: &[Vec<f64>], targets: usize) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(EfrError::DataLoading(format!(
                "Row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        let values = rows.iter().flatten().copied().collect();
        Self::new(values, rows.len(), cols, targets)
    }

    pub fn with_leave_out(mut self, idx: Option<usize>) -> Self {
        self.leave_out_idx = idx;
        self.update_sigmas();
        self
    }

    fn update_sigmas(&mut self) {
        let first_target = self.cols - self.targets;
        self.sigmas = (0..self.targets)
            .map(|t| {
                (0..self.rows)
                    .filter(|&r| Some(r) != self.leave_out_idx)
                    .map(|r| self.values[r * self.cols + first_target + t])
                    .sum()
            })
            .collect();
    }

    pub fn records(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.cols
    }

    pub fn inputs(&self) -> usize {
        self.cols - self.targets
    }

    pub fn targets(&self) -> usize {
        self.targets
    }

    pub fn leave_out_idx(&self) -> Option<usize> {
        self.leave_out_idx
    }

    /// Whole row, inputs followed by targets
    pub fn row(&self, idx: usize) -> &[f64] {
        &self.values[idx * self.cols..(idx + 1) * self.cols]
    }

    pub fn target_values(&self, idx: usize) -> &[f64] {
        &self.row(idx)[self.inputs()..]
    }

    pub fn sigma(&self, target: usize) -> f64 {
        self.sigmas[target]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_sigmas() {
        let dataset = Dataset::from_rows(
            &[
                vec![0.1, 0.2, 1.0],
                vec![0.3, 0.4, 0.0],
                vec![0.5, 0.6, 0.5],
            ],
            1,
        )
        .unwrap();

        assert_eq!(dataset.records(), 3);
        assert_eq!(dataset.inputs(), 2);
        assert_eq!(dataset.targets(), 1);
        assert_eq!(dataset.row(1), &[0.3, 0.4, 0.0]);
        assert_eq!(dataset.target_values(2), &[0.5]);
        assert!((dataset.sigma(0) - 1.5).abs() < 1e-12);

        let dataset = dataset.with_leave_out(Some(0));
        assert!((dataset.sigma(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = Dataset::from_rows(&[vec![0.1, 0.2], vec![0.3]], 1);
        assert!(result.is_err());
    }
}
