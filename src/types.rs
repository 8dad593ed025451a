use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Defines whether fitness should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationDirection {
    #[default]
    Maximize,
    Minimize,
}

impl OptimizationDirection {
    /// `true` when `a` is strictly better than `b`
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            OptimizationDirection::Maximize => a > b,
            OptimizationDirection::Minimize => a < b,
        }
    }

    /// Orders best first
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = match self {
            OptimizationDirection::Maximize => b.partial_cmp(&a),
            OptimizationDirection::Minimize => a.partial_cmp(&b),
        };
        ord.unwrap_or(Ordering::Equal)
    }

    pub fn reversed(self) -> Self {
        match self {
            OptimizationDirection::Maximize => OptimizationDirection::Minimize,
            OptimizationDirection::Minimize => OptimizationDirection::Maximize,
        }
    }
}

/// Best, worst and average fitness of a population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub best: f64,
    pub worst: f64,
    pub average: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_ordering() {
        assert!(OptimizationDirection::Maximize.is_better(0.9, 0.1));
        assert!(OptimizationDirection::Minimize.is_better(0.1, 0.9));
        assert!(!OptimizationDirection::Minimize.is_better(0.5, 0.5));

        let mut values = vec![0.5, 0.9, 0.1];
        values.sort_by(|a, b| OptimizationDirection::Minimize.compare(*a, *b));
        assert_eq!(values, vec![0.1, 0.5, 0.9]);
        values.sort_by(|a, b| OptimizationDirection::Maximize.compare(*a, *b));
        assert_eq!(values, vec![0.9, 0.5, 0.1]);
    }
}
