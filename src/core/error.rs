/// DBAL Error Module
///
/// This module defines the portable error taxonomy shared by every driver.
/// Native client errors never leave a driver as-is: they are classified into
/// exactly one of the variants below, carrying the native code, the native
/// message and, where a statement was being executed, its SQL text.
use thiserror::Error;

/// Error type for the whole access layer.
///
/// The driver family forms a hierarchy:
/// - `Driver` is the root (failures without statement context)
/// - `Connection` covers open/connect failures
/// - `Query` covers statement failures, specialised by the three
///   constraint-violation variants
///
/// The remaining variants report misuse of the API or capabilities an
/// engine does not offer.
#[derive(Error, Debug)]
pub enum DbalError {
    /// Generic driver failure with no statement context
    #[error("Driver error: {message} (code {code})")]
    Driver { message: String, code: i32 },

    /// Opening or maintaining the native connection failed
    #[error("Connection error: {message} (code {code})")]
    Connection { message: String, code: i32 },

    /// A statement failed
    #[error("Query error: {message} (code {code}) in query `{sql}`")]
    Query {
        message: String,
        code: i32,
        sql: String,
    },

    /// A statement violated a foreign key constraint
    #[error("Foreign key constraint violation: {message} (code {code}) in query `{sql}`")]
    ForeignKeyConstraintViolation {
        message: String,
        code: i32,
        sql: String,
    },

    /// A statement violated a unique constraint
    #[error("Unique constraint violation: {message} (code {code}) in query `{sql}`")]
    UniqueConstraintViolation {
        message: String,
        code: i32,
        sql: String,
    },

    /// A statement violated a not-null constraint
    #[error("Not null constraint violation: {message} (code {code}) in query `{sql}`")]
    NotNullConstraintViolation {
        message: String,
        code: i32,
        sql: String,
    },

    /// The engine or adapter does not offer the requested capability
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The caller passed an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is illegal in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbalError {
    /// Returns true for every member of the driver family (root included).
    pub fn is_driver_error(&self) -> bool {
        matches!(self, DbalError::Driver { .. } | DbalError::Connection { .. }) || self.is_query_error()
    }

    /// Returns true for statement failures, including constraint violations.
    pub fn is_query_error(&self) -> bool {
        matches!(self, DbalError::Query { .. }) || self.is_constraint_violation()
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbalError::ForeignKeyConstraintViolation { .. }
                | DbalError::UniqueConstraintViolation { .. }
                | DbalError::NotNullConstraintViolation { .. }
        )
    }

    /// Native error code, for driver-family errors.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            DbalError::Driver { code, .. }
            | DbalError::Connection { code, .. }
            | DbalError::Query { code, .. }
            | DbalError::ForeignKeyConstraintViolation { code, .. }
            | DbalError::UniqueConstraintViolation { code, .. }
            | DbalError::NotNullConstraintViolation { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The offending statement, for query-family errors.
    pub fn sql(&self) -> Option<&str> {
        match self {
            DbalError::Query { sql, .. }
            | DbalError::ForeignKeyConstraintViolation { sql, .. }
            | DbalError::UniqueConstraintViolation { sql, .. }
            | DbalError::NotNullConstraintViolation { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// The native message for driver-family errors, the description otherwise.
    pub fn message(&self) -> String {
        match self {
            DbalError::Driver { message, .. }
            | DbalError::Connection { message, .. }
            | DbalError::Query { message, .. }
            | DbalError::ForeignKeyConstraintViolation { message, .. }
            | DbalError::UniqueConstraintViolation { message, .. }
            | DbalError::NotNullConstraintViolation { message, .. } => message.clone(),
            DbalError::NotSupported(msg)
            | DbalError::InvalidArgument(msg)
            | DbalError::InvalidState(msg)
            | DbalError::Config(msg) => msg.clone(),
            DbalError::Io(e) => e.to_string(),
        }
    }
}

/// Type alias for Result to use DbalError as the error type.
pub type Result<T> = std::result::Result<T, DbalError>;
