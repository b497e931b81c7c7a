use simple_error::SimpleError;
use thiserror::Error;

pub type NemoResult<T> = Result<T, NemoError>;

/// Every failure the engine can report. All variants are fatal to a run;
/// out-of-range energy lookups are not errors and resolve to zero instead.
#[derive(Debug, Error)]
pub enum NemoError {
    #[error("construction failed: {0}")]
    Construction(#[from] SimpleError),

    #[error("input shape error: {0}")]
    InputShape(String),

    #[error("computation error: {0}")]
    Computation(String),

    #[error("energy table error: {0}")]
    EnergyTable(String),

    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
