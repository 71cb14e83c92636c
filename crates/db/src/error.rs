use std::path::PathBuf;
use thiserror::Error;

/// Database error types for taskhub
#[derive(Error, Debug)]
pub enum DbError {
    /// Error establishing connection to the database
    #[error("Failed to connect to database at {path}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<surrealdb::Error>,
    },

    /// Error during schema initialization
    #[error("Failed to initialize database schema: {0}")]
    Schema(#[source] Box<surrealdb::Error>),

    /// Error executing a query
    #[error("Query execution failed")]
    Query(#[source] Box<surrealdb::Error>),

    /// Error creating database directory
    #[error("Failed to create database directory at {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error when a requested record was not found
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Error for invalid input or validation failure
    #[error("{message}")]
    ValidationError { message: String },

    /// The task was written but the assignee's pending list was not.
    ///
    /// The task write is not rolled back.
    #[error("Task '{task_id}' was saved but pending tasks of user '{user_id}' were not updated")]
    BackReference {
        task_id: String,
        user_id: String,
        #[source]
        source: Box<DbError>,
    },

    /// Error converting a record to its wire representation
    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<surrealdb::Error> for DbError {
    fn from(err: surrealdb::Error) -> Self {
        DbError::Query(Box::new(err))
    }
}

impl DbError {
    /// Shorthand for a validation failure with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        DbError::ValidationError {
            message: message.into(),
        }
    }

    /// Shorthand for a missing task.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Get the full error message including nested SurrealDB error details.
    ///
    /// Meant for logs; never sent to HTTP clients.
    pub fn full_message(&self) -> String {
        match self {
            DbError::Query(err) => format!("Query execution failed: {}", err),
            DbError::BackReference { source, .. } => {
                format!("{}: {}", self, source.full_message())
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;
