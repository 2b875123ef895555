use serde::Serialize;

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Journal input ──
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Trade {0} is already closed")]
    TradeAlreadyClosed(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    // ── Database ──
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    // ── Files ──
    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Serializable error response for the presentation layer.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidTrade(_) => "INVALID_TRADE",
            AppError::InvalidAccount(_) => "INVALID_ACCOUNT",
            AppError::InvalidRule(_) => "INVALID_RULE",
            AppError::InvalidGoal(_) => "INVALID_GOAL",
            AppError::TradeAlreadyClosed(_) => "TRADE_ALREADY_CLOSED",
            AppError::UnknownPeriod(_) => "UNKNOWN_PERIOD",
            AppError::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            AppError::Database(_) => "DATABASE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::Serialization(_) => "SERIALIZATION",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(err.to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::FileWrite(err.to_string())
    }
}
