//! Database error type with sqlx mapping and AppError conversion.

use thiserror::Error;

use crate::error::{AppError, AppErrorKind, InfrastructureError};

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
}

#[derive(Debug, Clone, Error)]
pub enum DatabaseErrorKind {
    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Unknown database error: {message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseErrorKind::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_) => DatabaseErrorKind::Connection {
                message: err.to_string(),
            },
            _ => DatabaseErrorKind::Query {
                message: err.to_string(),
            },
        };

        Self { kind }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::NotFound)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UniqueViolation { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Connection { .. })
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}
