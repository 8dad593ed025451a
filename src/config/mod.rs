pub mod traits;
pub mod model;
pub mod evolution;
pub mod data;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use traits::ConfigSection;
pub use model::ModelConfig;
pub use evolution::{EvolutionConfig, MigrationMethod, SelectionMethod};
pub use data::DataConfig;
