use thiserror::Error;

pub type Result<T, E = UserError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("no such user: {0}")]
    NotFound(String),

    #[error("username already taken: {0}")]
    DuplicateKey(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl UserError {
    /// HTTP-style status for the routing layer to translate.
    pub fn status(&self) -> u16 {
        match self {
            UserError::NotFound(_) => 404,
            UserError::DuplicateKey(_) => 409,
            UserError::InvalidCredentials => 401,
            UserError::Hashing(_) | UserError::Storage(_) => 500,
        }
    }
}

impl From<sqlx::Error> for UserError {
    fn from(e: sqlx::Error) -> Self {
        UserError::Storage(anyhow::Error::new(e))
    }
}
