use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeadflowError {
    #[error("not initialized: run 'leadflow init'")]
    NotInitialized,

    #[error("lead not found: {0}")]
    LeadNotFound(uuid::Uuid),

    #[error("reminder not found: {0}")]
    ReminderNotFound(uuid::Uuid),

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invalid reminder status: {0}")]
    InvalidReminderStatus(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LeadflowError>;
