use thiserror::Error;

#[derive(Error, Debug)]
pub enum EfrError {
    #[error("Structural corruption: {0}")]
    StructuralCorruption(String),

    #[error("Operand out of range: index {index}, width {width}")]
    OperandOutOfRange { index: usize, width: usize },

    #[error("Unsupported instruction: {0}")]
    UnsupportedInstruction(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EfrError {
    /// Failure confined to evaluating one individual
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            EfrError::StructuralCorruption(_)
                | EfrError::OperandOutOfRange { .. }
                | EfrError::UnsupportedInstruction(_)
                | EfrError::Evaluation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EfrError>;
