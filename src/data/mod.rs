pub mod connectors;
pub mod dataset;

pub use connectors::{CsvConnector, DatasetMetadata};
pub use dataset::Dataset;
