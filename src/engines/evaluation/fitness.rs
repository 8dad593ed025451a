use serde::{Deserialize, Serialize};

/// How the two error statistics are folded into one fitness value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessType {
    /// F-measure of precision `1 - p1` and recall `1 - p2`
    #[default]
    FScore,
    WeightedAverage,
    /// Distance from the ideal point, false negatives weighted 20x
    PenalizedEuclidean,
}

impl FitnessType {
    /// Combine `p1` and `p2` (both in `[0, 1]`, lower is better) with `beta`
    pub fn combine(self, p1: f64, p2: f64, beta: f64) -> f64 {
        match self {
            FitnessType::FScore => {
                let precision = 1.0 - p1;
                let recall = 1.0 - p2;
                if precision + recall == 0.0 {
                    return 0.0;
                }
                let beta2 = beta * beta;
                let denominator = beta2 * precision + recall;
                if denominator == 0.0 {
                    0.0
                } else {
                    (1.0 + beta2) * precision * recall / denominator
                }
            }
            FitnessType::WeightedAverage => 1.0 - (beta * p1 + p2) / (beta + 1.0),
            FitnessType::PenalizedEuclidean => {
                (1.0 - ((20.0 * p2).powi(2) + p1 * p1).sqrt()).max(0.0)
            }
        }
    }
}

/// Divide `fitness` by `len / max_instructions` once the forest outgrows its budget
pub fn apply_parsimony(fitness: f64, len: usize, max_instructions: usize) -> f64 {
    if max_instructions > 0 && len > max_instructions {
        fitness / (len as f64 / max_instructions as f64)
    } else {
        fitness
    }
}
