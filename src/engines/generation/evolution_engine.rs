use super::forest::{Forest, ForestContext};
use super::individual::Individual;
use super::steady_state::{evaluate_population, SteadyStateGa};
use crate::config::{AppConfig, ConfigSection, EvolutionConfig};
use crate::data::CsvConnector;
use crate::error::Result;
use crate::types::PopulationStats;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Generations,
    Evaluations,
    TargetFitness,
    TimeBudget,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Generations => "generation limit reached",
            StopReason::Evaluations => "evaluation budget exhausted",
            StopReason::TargetFitness => "target fitness reached",
            StopReason::TimeBudget => "time budget exhausted",
        };
        write!(f, "{}", text)
    }
}

pub trait ProgressCallback: Send {
    fn on_run_start(&mut self, population_size: usize);
    fn on_improvement(&mut self, generation: usize, winner: &Forest);
    fn on_generation_complete(&mut self, generation: usize, stats: &PopulationStats, evaluations: usize);
    fn on_run_complete(&mut self, outcome: &EvolutionOutcome);
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub winner: Forest,
    pub stats: PopulationStats,
    pub generations: usize,
    pub evaluations: usize,
    pub stop_reason: StopReason,
    pub elapsed_secs: f64,
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    context: Arc<ForestContext>,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig, context: Arc<ForestContext>) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            context,
            rng,
        })
    }

    /// Load the dataset named by `app.data` and build a fuzzy rule run
    pub fn from_app_config(app: &AppConfig) -> Result<Self> {
        app.validate()?;
        let dataset = CsvConnector::load_dataset(&app.data)?;
        let context = ForestContext::fuzzy(dataset, app.model.clone());
        Self::new(app.evolution.clone(), context)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ForestContext> {
        &self.context
    }

    /// Random forests drawn sequentially from the engine's stream
    fn initialize_population(&mut self) -> Vec<Forest> {
        (0..self.config.population_size)
            .map(|_| Forest::random(Arc::clone(&self.context), &mut self.rng))
            .collect()
    }

    fn stop_reason(
        &self,
        ga: &SteadyStateGa<Forest>,
        generation: usize,
        evaluations: usize,
        start: &Instant,
    ) -> Option<StopReason> {
        if let Some(target) = self.config.target_fitness {
            if !ga.direction().is_better(target, ga.best_fitness()) {
                return Some(StopReason::TargetFitness);
            }
        }
        if generation >= self.config.generations {
            return Some(StopReason::Generations);
        }
        if let Some(max) = self.config.max_evaluations {
            if evaluations >= max {
                return Some(StopReason::Evaluations);
            }
        }
        if let Some(budget) = self.config.time_budget_secs {
            if start.elapsed().as_secs_f64() >= budget {
                return Some(StopReason::TimeBudget);
            }
        }
        None
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<EvolutionOutcome> {
        let start = Instant::now();
        callback.on_run_start(self.config.population_size);

        let mut population = self.initialize_population();
        evaluate_population(&mut population)?;
        let mut evaluations = population.len();

        let mut ga = SteadyStateGa::new(population, &self.config)?;
        let mut best = ga.best_fitness();
        callback.on_improvement(0, ga.winner());

        let mut generation = 0;
        let stop_reason = loop {
            if let Some(reason) = self.stop_reason(&ga, generation, evaluations, &start) {
                break reason;
            }

            let step = ga.step(self.config.crossover_rate, self.config.mutation_rate, &mut self.rng);
            generation += 1;
            evaluations += 2;
            match step {
                Ok(()) => {}
                Err(e) if e.is_evaluation_failure() => {
                    log::warn!("Generation {}: offspring discarded: {}", generation, e);
                }
                Err(e) => return Err(e),
            }

            if ga.direction().is_better(ga.best_fitness(), best) {
                best = ga.best_fitness();
                callback.on_improvement(generation, ga.winner());
            }

            if self.config.report_interval > 0 && generation % self.config.report_interval == 0 {
                callback.on_generation_complete(generation, &ga.stats(), evaluations);
            }
        };

        let outcome = EvolutionOutcome {
            winner: ga.winner().clone(),
            stats: ga.stats(),
            generations: generation,
            evaluations,
            stop_reason,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        callback.on_run_complete(&outcome);
        Ok(outcome)
    }
}

/// Evaluate a single textual forest against the engine's dataset
pub fn query(context: Arc<ForestContext>, text: &str) -> Result<Forest> {
    let mut forest = Forest::parse(context, text);
    forest.validate()?;
    forest.compute_fitness()?;
    Ok(forest)
}
