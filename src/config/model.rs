use super::traits::ConfigSection;
use crate::engines::evaluation::FitnessType;
use crate::error::EfrError;
use serde::{Deserialize, Serialize};

/// Settings of the rule model and its fitness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Whether the unary `not` operator may be generated
    pub allow_not: bool,
    /// Forbid single-terminal trees
    pub nontrivial: bool,
    /// Forest length above which the parsimony penalty applies
    pub max_instructions: usize,
    /// Lookback horizon of lagged input terminals, 0 disables them
    pub past_input_limit: usize,
    /// Lookback horizon of lagged output terminals, 0 disables them
    pub past_output_limit: usize,
    pub beta: f64,
    pub fitness: FitnessType,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            allow_not: true,
            nontrivial: false,
            max_instructions: 200,
            past_input_limit: 0,
            past_output_limit: 0,
            beta: 1.0,
            fitness: FitnessType::FScore,
        }
    }
}

impl ConfigSection for ModelConfig {
    fn section_name() -> &'static str {
        "model"
    }

    fn validate(&self) -> Result<(), EfrError> {
        if self.max_instructions == 0 {
            return Err(EfrError::Configuration(
                "Max instructions must be positive".to_string()
            ));
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(EfrError::Configuration(
                "Beta must be a positive number".to_string()
            ));
        }
        Ok(())
    }
}
