pub mod error_rates;
pub mod fitness;

pub use error_rates::{ErrorRates, TargetErrorRates};
pub use fitness::{apply_parsimony, FitnessType};
