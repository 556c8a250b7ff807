use std::error::Error;
use std::fmt;

use sea_orm::SqlErr;

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    /// Error from SeaORM
    SeaOrmError(sea_orm::DbErr),
    /// Connection error
    ConnectionError(String),
    /// Migration error
    MigrationError(String),
    /// Stored value could not be mapped to the domain model
    InvalidData(String),
}

impl DbError {
    /// Whether the error is a uniqueness conflict
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::SeaOrmError(e) => is_unique_violation(e),
            _ => false,
        }
    }
}

/// Whether a SeaORM error is a uniqueness conflict
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::SeaOrmError(e) => write!(f, "Database error: {}", e),
            DbError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            DbError::MigrationError(msg) => write!(f, "Migration error: {}", msg),
            DbError::InvalidData(msg) => write!(f, "Invalid stored data: {}", msg),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::SeaOrmError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        DbError::SeaOrmError(err)
    }
}
