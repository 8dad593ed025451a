use super::individual::Individual;
use crate::config::{EvolutionConfig, MigrationMethod, SelectionMethod};
use crate::error::{EfrError, Result};
use crate::types::{OptimizationDirection, PopulationStats};
use rand::Rng;
use rayon::prelude::*;

/// Roulette draws spent looking for a second distinct parent
const SELECTION_RETRIES: usize = 10;
/// Best and worst fitness closer than this trigger a shuffle
const SHUFFLE_TOLERANCE: f64 = 1e-3;

/// Evaluate every individual in parallel
pub fn evaluate_population<I: Individual>(population: &mut [I]) -> Result<()> {
    population
        .par_iter_mut()
        .try_for_each(|individual| individual.compute_fitness().map(|_| ()))
}

/// Steady-state genetic algorithm over a population kept sorted best-first.
///
/// Each step breeds two offspring which may replace weaker members; the rest
/// of the population survives untouched.
pub struct SteadyStateGa<I: Individual> {
    population: Vec<I>,
    son: Option<I>,
    daughter: Option<I>,
    direction: OptimizationDirection,
    selection: SelectionMethod,
    migration: MigrationMethod,
    prevent_stagnation: bool,
    shuffle_enabled: bool,
}

impl<I: Individual> SteadyStateGa<I> {
    /// Takes an evaluated population and sorts it
    pub fn new(population: Vec<I>, config: &EvolutionConfig) -> Result<Self> {
        if population.len() < 2 {
            return Err(EfrError::Configuration(format!(
                "Steady-state GA needs at least 2 individuals, got {}",
                population.len()
            )));
        }

        let mut ga = Self {
            population,
            son: None,
            daughter: None,
            direction: config.direction,
            selection: config.selection,
            migration: config.migration,
            prevent_stagnation: config.prevent_stagnation,
            shuffle_enabled: config.shuffle,
        };
        ga.sort();
        Ok(ga)
    }

    pub fn population(&self) -> &[I] {
        &self.population
    }

    pub fn into_population(self) -> Vec<I> {
        self.population
    }

    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    pub fn direction(&self) -> OptimizationDirection {
        self.direction
    }

    pub fn winner(&self) -> &I {
        &self.population[0]
    }

    pub fn best_fitness(&self) -> f64 {
        self.population[0].fitness()
    }

    pub fn worst_fitness(&self) -> f64 {
        self.population[self.population.len() - 1].fitness()
    }

    pub fn stats(&self) -> PopulationStats {
        let total: f64 = self.population.iter().map(|i| i.fitness()).sum();
        PopulationStats {
            best: self.best_fitness(),
            worst: self.worst_fitness(),
            average: total / self.population.len() as f64,
        }
    }

    /// Offspring currently held in the son and daughter slots
    pub fn offspring(&self) -> (Option<&I>, Option<&I>) {
        (self.son.as_ref(), self.daughter.as_ref())
    }

    /// Full sort, best first
    pub fn sort(&mut self) {
        let direction = self.direction;
        self.population
            .sort_by(|a, b| direction.compare(a.fitness(), b.fitness()));
    }

    pub fn is_sorted(&self) -> bool {
        self.population.windows(2).all(|pair| {
            !self
                .direction
                .is_better(pair[1].fitness(), pair[0].fitness())
        })
    }

    /// One full breeding step
    pub fn step<R: Rng>(&mut self, crossover_rate: f64, mutation_rate: f64, rng: &mut R) -> Result<()> {
        self.select(rng);
        self.recombine(crossover_rate, rng);
        self.mutate(mutation_rate, rng);
        self.compute_child_fitness()?;
        self.migrate(rng);
        if self.shuffle_enabled {
            self.shuffle(rng)?;
        }
        Ok(())
    }

    /// Parent indices under the configured selection method
    pub fn select_parents<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        match self.selection {
            SelectionMethod::Elitary => (0, 1),
            SelectionMethod::Roulette => {
                let first = self.roulette(self.direction, rng);
                let second = self.distinct_draw(first, rng);
                (first, second)
            }
            SelectionMethod::SemiElitary => {
                let second = 0;
                (self.distinct_draw(second, rng), second)
            }
        }
    }

    /// Roulette draw retried until it differs from `other`, else the index after `other`
    fn distinct_draw<R: Rng>(&self, other: usize, rng: &mut R) -> usize {
        for _ in 0..SELECTION_RETRIES {
            let idx = self.roulette(self.direction, rng);
            if idx != other {
                return idx;
            }
        }
        log::debug!("Failed to select a distinct parent stochastically");
        (other + 1) % self.population.len()
    }

    /// Fitness-proportional draw under `direction`
    pub fn roulette<R: Rng>(&self, direction: OptimizationDirection, rng: &mut R) -> usize {
        let len = self.population.len();
        let weights: Vec<f64> = match direction {
            OptimizationDirection::Maximize => self
                .population
                .iter()
                .map(|i| i.fitness().max(0.0))
                .collect(),
            OptimizationDirection::Minimize => {
                let max_fitness = self
                    .population
                    .iter()
                    .map(|i| i.fitness())
                    .fold(f64::NEG_INFINITY, f64::max);
                self.population
                    .iter()
                    .map(|i| {
                        let weight = max_fitness / i.fitness();
                        if weight.is_nan() || weight < 0.0 {
                            0.0
                        } else {
                            weight
                        }
                    })
                    .collect()
            }
        };

        // zero fitness under minimization dominates the wheel
        let unbounded: Vec<usize> = (0..len).filter(|&i| weights[i].is_infinite()).collect();
        if !unbounded.is_empty() {
            return unbounded[rng.gen_range(0..unbounded.len())];
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            // Degenerate wheel, pick random
            return rng.gen_range(0..len);
        }

        let mut spin = rng.gen::<f64>() * total;
        for (idx, weight) in weights.iter().enumerate() {
            spin -= weight;
            if spin < 0.0 {
                return idx;
            }
        }

        len - 1
    }

    /// Clone the selected parents into the offspring slots
    pub fn select<R: Rng>(&mut self, rng: &mut R) -> (usize, usize) {
        let (first, second) = self.select_parents(rng);
        log::debug!("Selected {} and {}", first, second);
        self.son = Some(self.population[first].clone());
        self.daughter = Some(self.population[second].clone());
        (first, second)
    }

    pub fn recombine<R: Rng>(&mut self, crossover_rate: f64, rng: &mut R) {
        if let (Some(son), Some(daughter)) = (self.son.as_mut(), self.daughter.as_mut()) {
            if rng.gen::<f64>() < crossover_rate {
                log::debug!("Recombining offspring");
                son.crossover(daughter, crossover_rate, rng);
            }
        }
    }

    pub fn mutate<R: Rng>(&mut self, mutation_rate: f64, rng: &mut R) {
        for child in [self.son.as_mut(), self.daughter.as_mut()].into_iter().flatten() {
            child.mutate(mutation_rate, rng);
        }
    }

    /// Evaluate both offspring; on failure they are discarded
    pub fn compute_child_fitness(&mut self) -> Result<()> {
        let result = [self.son.as_mut(), self.daughter.as_mut()]
            .into_iter()
            .flatten()
            .try_for_each(|child| child.compute_fitness().map(|_| ()));
        if result.is_err() {
            self.son = None;
            self.daughter = None;
        }
        result
    }

    /// Offer both offspring to the population
    pub fn migrate<R: Rng>(&mut self, rng: &mut R) {
        for child in [self.son.take(), self.daughter.take()].into_iter().flatten() {
            self.migrate_one(child, rng);
        }
    }

    /// Replace the migration target with `child` when strictly better.
    /// Returns the final position of `child`.
    pub fn migrate_one<R: Rng>(&mut self, child: I, rng: &mut R) -> Option<usize> {
        let best = &self.population[0];
        if self.prevent_stagnation && (child.fitness() == best.fitness() || best.equals(&child)) {
            log::debug!("Offspring ties the best individual, dropping it");
            return None;
        }

        let target = match self.migration {
            MigrationMethod::SteadyState => self.population.len() - 1,
            MigrationMethod::SteadyStateReverseFitness => self.roulette(self.direction.reversed(), rng),
        };

        if !self
            .direction
            .is_better(child.fitness(), self.population[target].fitness())
        {
            return None;
        }

        self.population[target] = child;
        Some(self.sort_in_one(target))
    }

    /// Bubble the individual at `position` to its place; other entries are
    /// assumed ordered. Returns its new index.
    pub fn sort_in_one(&mut self, mut position: usize) -> usize {
        let direction = self.direction;
        while position > 0
            && direction.is_better(
                self.population[position].fitness(),
                self.population[position - 1].fitness(),
            )
        {
            self.population.swap(position, position - 1);
            position -= 1;
        }
        while position + 1 < self.population.len()
            && direction.is_better(
                self.population[position + 1].fitness(),
                self.population[position].fitness(),
            )
        {
            self.population.swap(position, position + 1);
            position += 1;
        }
        position
    }

    /// Re-diversify a converged population by mutating its worse half.
    /// Returns whether a shuffle happened.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) -> Result<bool> {
        if (self.best_fitness() - self.worst_fitness()).abs() >= SHUFFLE_TOLERANCE {
            return Ok(false);
        }

        log::info!(
            "Best and worst fitness within {}, shuffling the population",
            SHUFFLE_TOLERANCE
        );
        let half = self.population.len() / 2;
        for individual in &mut self.population[half..] {
            individual.mutate(1.0, rng);
        }
        // keep the order valid even when some individual fails to evaluate
        let evaluated = evaluate_population(&mut self.population[half..]);
        self.sort();
        evaluated.map(|_| true)
    }
}
