//! Error taxonomy shared across the scheduler core, stores, and auth.
//!
//! Each enum maps to exactly the error kinds named by the scheduler design:
//! `InvalidExpression`, `NotFound`, `Conflict`, `Unauthorized`, `NoTasks`,
//! `Transient`. HTTP and gRPC boundaries translate these into status codes;
//! `anyhow` is reserved for the two process `main()` functions.

use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid expression: {0}")]
    InvalidExpression(#[from] ParseError),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("no ready tasks")]
    NoTasks,

    #[error("division by zero")]
    DivisionByZero,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transient error: {0}")]
    Transient(String),
}

impl SchedulerError {
    /// Whether a caller could reasonably retry this error. Parse and auth
    /// errors never are; everything store- or transport-related might be.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SchedulerError::InvalidExpression(_)
            | SchedulerError::NotFound
            | SchedulerError::BadRequest(_)
            | SchedulerError::Conflict(_)
            | SchedulerError::Unauthorized
            | SchedulerError::DivisionByZero => false,
            SchedulerError::NoTasks => true,
            SchedulerError::Store(e) => e.is_recoverable(),
            SchedulerError::Transient(_) => true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected operator at the beginning of expression")]
    LeadingOperator,
    #[error("unexpected operator at the end of expression")]
    TrailingOperator,
    #[error("two operators in immediate succession")]
    ConsecutiveOperators,
    #[error("multiple decimal points in a numeric literal")]
    MalformedNumber,
    #[error("empty parentheses")]
    EmptyParentheses,
    #[error("invalid character: {0:?}")]
    InvalidCharacter(char),
    #[error("unmatched parentheses")]
    UnbalancedParentheses,
    #[error("malformed expression")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate id on insert")]
    Conflict,
    #[error("no ready task available")]
    NoTasks,
    #[error("record not found")]
    NotFound,
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            StoreError::NoTasks => true,
            StoreError::Conflict | StoreError::NotFound => false,
            #[cfg(feature = "postgres")]
            StoreError::Database(_) => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username already taken")]
    UsernameTaken,
    #[error("token expired or invalid")]
    InvalidToken,
    #[error("token has been revoked")]
    RevokedToken,
    #[error("wrong token type presented")]
    WrongTokenType,
    #[error("key material error: {0}")]
    KeyMaterial(String),
    #[error("password hashing error: {0}")]
    Hashing(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<AuthError> for SchedulerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::RevokedToken
            | AuthError::WrongTokenType => SchedulerError::Unauthorized,
            AuthError::UsernameTaken => SchedulerError::Conflict("username taken".into()),
            AuthError::KeyMaterial(m) | AuthError::Hashing(m) => SchedulerError::Transient(m),
            AuthError::Store(e) => SchedulerError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_not_recoverable() {
        let e = SchedulerError::InvalidExpression(ParseError::Empty);
        assert!(!e.is_recoverable());
    }

    #[test]
    fn no_tasks_is_recoverable() {
        assert!(SchedulerError::NoTasks.is_recoverable());
    }

    #[test]
    fn auth_invalid_credentials_maps_to_unauthorized() {
        let mapped: SchedulerError = AuthError::InvalidCredentials.into();
        assert!(matches!(mapped, SchedulerError::Unauthorized));
    }

    #[test]
    fn auth_username_taken_maps_to_conflict() {
        let mapped: SchedulerError = AuthError::UsernameTaken.into();
        assert!(matches!(mapped, SchedulerError::Conflict(_)));
    }
}
