use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChronicleError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, ChronicleError>;

impl From<DieselError> for ChronicleError {
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::NotFound => ChronicleError::NotFound(err.to_string()),
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation => {
                    ChronicleError::Constraint(info.message().to_string())
                }
                _ => ChronicleError::Store(info.message().to_string()),
            },
            _ => ChronicleError::Store(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChronicleError {
    fn from(err: serde_json::Error) -> Self {
        ChronicleError::Serialization(err.to_string())
    }
}
