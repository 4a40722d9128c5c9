//! Error types for the composition query engine

use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error taxonomy of the engine.
///
/// The builder raises the query-shaped variants locally; the execution
/// adapter translates at a single seam. SQL text, bound values, and driver
/// messages never appear in any variant's display output.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Identifier failed the allow-list check
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),

    /// Function name outside the fixed date family (or aggregate set)
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Filter operator outside the supported set
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Join type outside {inner, left, right}
    #[error("unknown join type: {0}")]
    UnknownJoinType(String),

    /// Sort direction outside {asc, desc}
    #[error("unknown sort direction: {0}")]
    UnknownDirection(String),

    /// `in` filter whose value is not a non-empty array
    #[error("operator 'in' requires a non-empty array value")]
    InOperatorRequiresArray,

    /// Filter declared with neither a literal value nor a parameter key
    #[error("filter on '{0}' has neither a value nor a parameter")]
    FilterRequiresValue(String),

    /// Joined collection slug missing from the build context
    #[error("joined collection not found: {0}")]
    JoinCollectionNotFound(String),

    /// Source collection slug did not resolve to an id
    #[error("source collection not found: {0}")]
    SourceCollectionNotFound(String),

    #[error("workspace not found")]
    WorkspaceNotFound,

    #[error("composition not found")]
    CompositionNotFound,

    /// Composition is private or inactive
    #[error("forbidden")]
    Forbidden,

    /// Internal composition requested without a caller principal
    #[error("unauthorized")]
    Unauthorized,

    /// Record or configuration validation failure
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller-supplied deadline expired before the statement finished
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Execution failure; the underlying cause is logged, never surfaced
    #[error("internal error: {0}")]
    Internal(String),

    /// Database connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("pool error: {0}")]
    Pool(String),

    /// Environment configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error with a client-safe message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is one of the not-found errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::JoinCollectionNotFound(_)
                | Self::SourceCollectionNotFound(_)
                | Self::WorkspaceNotFound
                | Self::CompositionNotFound
        )
    }

    /// Check if this is a deadline expiration
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// Stable machine-readable code for the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFieldName(_) => "INVALID_FIELD_NAME",
            Self::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            Self::UnknownOperator(_) => "UNKNOWN_OPERATOR",
            Self::UnknownJoinType(_) => "UNKNOWN_JOIN_TYPE",
            Self::UnknownDirection(_) => "UNKNOWN_DIRECTION",
            Self::InOperatorRequiresArray => "IN_OPERATOR_REQUIRES_ARRAY",
            Self::FilterRequiresValue(_) => "FILTER_REQUIRES_VALUE",
            Self::JoinCollectionNotFound(_) => "JOIN_COLLECTION_NOT_FOUND",
            Self::SourceCollectionNotFound(_) => "SOURCE_COLLECTION_NOT_FOUND",
            Self::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            Self::CompositionNotFound => "COMPOSITION_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Internal(_) | Self::Connection(_) | Self::Configuration(_) => "INTERNAL_ERROR",
            #[cfg(feature = "pool")]
            Self::Pool(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error maps to at the transport boundary
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidFieldName(_)
            | Self::UnknownFunction(_)
            | Self::UnknownOperator(_)
            | Self::UnknownJoinType(_)
            | Self::UnknownDirection(_)
            | Self::InOperatorRequiresArray
            | Self::FilterRequiresValue(_)
            | Self::Validation(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::JoinCollectionNotFound(_)
            | Self::SourceCollectionNotFound(_)
            | Self::WorkspaceNotFound
            | Self::CompositionNotFound => 404,
            Self::DeadlineExceeded => 504,
            Self::Internal(_) | Self::Connection(_) | Self::Configuration(_) => 500,
            #[cfg(feature = "pool")]
            Self::Pool(_) => 500,
        }
    }

    /// Classify a driver error into an engine error.
    ///
    /// The full error is logged here; the returned variant carries only a
    /// generic message so driver text cannot leak through an envelope.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        tracing::warn!(target: "collage.sql", error = %err, "statement execution failed");
        Self::Internal("query execution failed".into())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for EngineError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
