use super::evolution_engine::{EvolutionOutcome, ProgressCallback};
use super::forest::Forest;
use super::individual::Individual;
use crate::types::PopulationStats;

/// Reports progress through the `log` facade
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_run_start(&mut self, population_size: usize) {
        log::info!("Evolving a population of {} forests", population_size);
    }

    fn on_improvement(&mut self, generation: usize, winner: &Forest) {
        log::info!(
            "Generation {}: new best fitness {:.6} (p1 {:.4}, p2 {:.4})",
            generation,
            winner.fitness(),
            winner.p1(),
            winner.p2()
        );
        log::debug!("Best forest: {:.3}", winner);
    }

    fn on_generation_complete(&mut self, generation: usize, stats: &PopulationStats, evaluations: usize) {
        log::info!(
            "Generation {} ({} evaluations). Best: {:.6}, worst: {:.6}, average: {:.6}",
            generation,
            evaluations,
            stats.best,
            stats.worst,
            stats.average
        );
    }

    fn on_run_complete(&mut self, outcome: &EvolutionOutcome) {
        log::info!(
            "Finished after {} generations in {:.2}s: {}. Best fitness {:.6}",
            outcome.generations,
            outcome.elapsed_secs,
            outcome.stop_reason,
            outcome.stats.best
        );
    }
}

/// Progress events forwarded over a channel to another thread
pub enum ProgressMessage {
    RunStart(usize),
    Improvement { generation: usize, fitness: f64 },
    GenerationComplete { generation: usize, stats: PopulationStats, evaluations: usize },
    RunComplete { generations: usize, best_fitness: f64 },
}

pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_run_start(&mut self, population_size: usize) {
        let _ = self.sender.send(ProgressMessage::RunStart(population_size));
    }

    fn on_improvement(&mut self, generation: usize, winner: &Forest) {
        let _ = self.sender.send(ProgressMessage::Improvement {
            generation,
            fitness: winner.fitness(),
        });
    }

    fn on_generation_complete(&mut self, generation: usize, stats: &PopulationStats, evaluations: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            stats: *stats,
            evaluations,
        });
    }

    fn on_run_complete(&mut self, outcome: &EvolutionOutcome) {
        let _ = self.sender.send(ProgressMessage::RunComplete {
            generations: outcome.generations,
            best_fitness: outcome.stats.best,
        });
    }
}
