use thiserror::Error;

/// Crate-wide error type.
///
/// Configuration errors (unknown group, missing dataset) are surfaced to the
/// caller immediately; solver failures are wrapped and propagated unchanged.
#[derive(Error, Debug)]
pub enum DulasimError {
    #[error("unknown experiment group '{0}', valid groups: {1}")]
    UnknownGroup(String, String),

    #[error("missing dataset '{id}' at {path}")]
    MissingDataset { id: String, path: String },

    #[error("unknown selection '{0}'")]
    UnknownSelection(String),

    #[error("missing column '{column}' in dataset '{dataset}'")]
    MissingColumn { column: String, dataset: String },

    #[error("unknown symbol '{symbol}' in '{context}'")]
    UnknownSymbol { symbol: String, context: String },

    #[error("duplicate id '{0}' in model '{1}'")]
    DuplicateId(String, String),

    #[error("'{id}' is driven by {count} rules/reactions, expected exactly one")]
    ConflictingRules { id: String, count: usize },

    #[error("unit error: {0}")]
    Unit(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("fit error: {0}")]
    Fit(String),

    #[error("solver error: {0}")]
    Solver(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<diffsol::error::DiffsolError> for DulasimError {
    fn from(err: diffsol::error::DiffsolError) -> Self {
        DulasimError::Solver(err.to_string())
    }
}
