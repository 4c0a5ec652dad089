use crate::model::ModelError;
use thiserror::Error;

/// Errors that abort a single agent run.
///
/// None of these are fatal to the process: the caller reports them and moves
/// on to the next request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("request cancelled")]
    Cancelled,

    #[error("gave up after {0} model calls without a final answer")]
    CycleLimit(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
