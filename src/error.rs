use axum::http::StatusCode;
use thiserror::Error;

/// Reason a login attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    NotFound,
    BadPassword,
    /// The identifier matched more than one account. Uniqueness over
    /// username/email is violated; surfaced as a login failure instead of
    /// silently picking one record.
    Ambiguous,
}

impl std::fmt::Display for CredentialFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialFailure::NotFound => write!(f, "User not found."),
            CredentialFailure::BadPassword => write!(f, "Incorrect password."),
            CredentialFailure::Ambiguous => write!(f, "Ambiguous user. Multiple accounts found."),
        }
    }
}

/// Failures of the asset store, local or remote.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cannot upload empty file")]
    EmptyUpload,
    #[error("storage backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("could not fetch image: {0}")]
    Fetch(String),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("User has no image assigned.")]
    NoImage,
    #[error("storage backend unreachable: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn status(&self) -> StatusCode {
        match self {
            StorageError::EmptyUpload => StatusCode::BAD_REQUEST,
            StorageError::NoImage | StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::Backend { .. } | StorageError::Fetch(_) | StorageError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
            StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures of the user repository. Uniqueness violations carry the name
/// of every colliding field, not just the first one found.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{} already exists", .0.join(", "))]
    Conflict(Vec<String>),
    #[error("User not found with id: {0}")]
    NotFound(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Typed failures surfaced by the identity service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{} already exists", .0.join(", "))]
    AlreadyExists(Vec<String>),
    #[error("User not found with id: {0}")]
    NotFound(i64),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(CredentialFailure),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict(fields) => ServiceError::AlreadyExists(fields),
            RepoError::NotFound(id) => ServiceError::NotFound(id),
            RepoError::Database(e) => ServiceError::Internal(e.into()),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Storage(err) => err.status(),
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_joins_every_field() {
        let err = ServiceError::AlreadyExists(vec![
            "Username".to_string(),
            "Email".to_string(),
            "Mobile number".to_string(),
        ]);
        assert_eq!(err.to_string(), "Username, Email, Mobile number already exists");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn credential_failures_keep_their_reason() {
        let err = ServiceError::InvalidCredentials(CredentialFailure::Ambiguous);
        assert_eq!(
            err.to_string(),
            "Invalid credentials: Ambiguous user. Multiple accounts found."
        );
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn storage_statuses() {
        assert_eq!(StorageError::EmptyUpload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(StorageError::NoImage.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            StorageError::Backend { status: 503, body: String::new() }.status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
