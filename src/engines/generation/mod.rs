pub mod evolution_engine;
pub mod forest;
pub mod individual;
pub mod progress;
pub mod steady_state;

pub use evolution_engine::{query, EvolutionEngine, EvolutionOutcome, ProgressCallback, StopReason};
pub use forest::{subtree_left, Forest, ForestContext};
pub use individual::Individual;
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage};
pub use steady_state::{evaluate_population, SteadyStateGa};
