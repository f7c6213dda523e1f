//! Error types for Trellis.

use thiserror::Error;

/// The main error type for Trellis operations.
#[derive(Debug, Clone, Error)]
pub enum TrellisError {
    /// A dialect does not support the requested operation.
    #[error("Dialect '{dialect}' does not support {operation}")]
    UnsupportedDialect {
        dialect: &'static str,
        operation: &'static str,
    },

    /// Entity was never registered.
    #[error("Entity '{0}' is not registered")]
    UnknownEntity(String),

    /// Relation is not declared on the entity.
    #[error("Entity '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    /// Entity needs a primary key for the attempted operation.
    #[error("Entity '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// More than one column was marked primary.
    #[error("Entity '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// Many-to-many resolution found no reciprocal declaration.
    #[error("Entity '{entity}' has no reciprocal many-to-many relation through '{through}'")]
    MissingReciprocal { entity: String, through: String },

    /// A single-result fetch matched no rows.
    #[error("No rows matched where one was required")]
    NotFound,

    /// Operation attempted on a handle that is no longer active.
    #[error("Transaction is not active")]
    InactiveTransaction,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Trellis operations.
pub type TrellisResult<T> = Result<T, TrellisError>;
