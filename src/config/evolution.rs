use super::traits::ConfigSection;
use crate::error::EfrError;
use crate::types::OptimizationDirection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub max_evaluations: Option<usize>,
    pub time_budget_secs: Option<f64>,
    pub target_fitness: Option<f64>,
    pub selection: SelectionMethod,
    pub migration: MigrationMethod,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub direction: OptimizationDirection,
    pub shuffle: bool,
    pub prevent_stagnation: bool,
    pub seed: Option<u64>,
    pub report_interval: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Roulette,
    Elitary,
    SemiElitary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationMethod {
    SteadyState,
    SteadyStateReverseFitness,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 1000,
            max_evaluations: None,
            time_budget_secs: None,
            target_fitness: None,
            selection: SelectionMethod::SemiElitary,
            migration: MigrationMethod::SteadyState,
            crossover_rate: 0.8,
            mutation_rate: 0.02,
            direction: OptimizationDirection::Maximize,
            shuffle: false,
            prevent_stagnation: false,
            seed: None,
            report_interval: 100,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EfrError> {
        if self.population_size < 2 {
            return Err(EfrError::Configuration(
                "Population size must be at least 2".to_string()
            ));
        }
        if self.mutation_rate < 0.0 || self.mutation_rate > 1.0 {
            return Err(EfrError::Configuration(
                "Mutation rate must be between 0 and 1".to_string()
            ));
        }
        if self.crossover_rate < 0.0 || self.crossover_rate > 1.0 {
            return Err(EfrError::Configuration(
                "Crossover rate must be between 0 and 1".to_string()
            ));
        }
        if let Some(budget) = self.time_budget_secs {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(EfrError::Configuration(
                    "Time budget must be positive".to_string()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rates() {
        let config = EvolutionConfig {
            mutation_rate: 1.5,
            ..EvolutionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EvolutionConfig {
            population_size: 1,
            ..EvolutionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
