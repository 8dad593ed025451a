use crate::error::Result;
use rand::Rng;

/// Capabilities the steady-state driver needs from a genome.
///
/// `Clone` must be a deep copy: the driver clones parents into offspring
/// slots and mutates the clones.
pub trait Individual: Clone + Send {
    /// Evaluate and cache the fitness
    fn compute_fitness(&mut self) -> Result<f64>;

    /// Cached fitness, 0.0 before the first evaluation
    fn fitness(&self) -> f64;

    fn mutate<R: Rng>(&mut self, probability: f64, rng: &mut R);

    /// Recombine `self` and `other` in place with probability `probability`
    fn crossover<R: Rng>(&mut self, other: &mut Self, probability: f64, rng: &mut R);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Individuals are considered equal when their fitness is
    fn equals(&self, other: &Self) -> bool {
        self.fitness() == other.fitness()
    }
}
