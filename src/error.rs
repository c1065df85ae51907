//! Error types for the rent roll query service

use thiserror::Error;

/// Result type alias for query service operations
pub type Result<T> = std::result::Result<T, QueryServiceError>;

#[derive(Error, Debug)]
pub enum QueryServiceError {

    // =============================
    // Store Errors
    // =============================

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // =============================
    // Dispatch Errors
    // =============================

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Tool '{tool}' failed: {source}")]
    ToolExecutionError {
        tool: String,
        #[source]
        source: Box<QueryServiceError>,
    },

    // =============================
    // Providers & Startup
    // =============================

    #[error("Rate source error: {0}")]
    RateSourceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Ingest error: {0}")]
    IngestError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sqlx::Error> for QueryServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                QueryServiceError::ConstraintViolation(db_err.message().to_string())
            }
            _ => QueryServiceError::DatabaseError(err.to_string()),
        }
    }
}

impl QueryServiceError {
    /// Wrap a handler failure with the name of the tool that raised it.
    pub fn tool_failure(tool: impl Into<String>, source: QueryServiceError) -> Self {
        QueryServiceError::ToolExecutionError {
            tool: tool.into(),
            source: Box::new(source),
        }
    }
}
