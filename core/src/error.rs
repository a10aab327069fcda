use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Campaign '{id}' not found")]
    CampaignNotFound { id: String },

    #[error("Unrecognized {field} value '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error(
        "Scheduler worker cannot share a private in-memory database; \
         open the store from a file path or shared-cache URI"
    )]
    UnshareableStore,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
