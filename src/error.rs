// Error module: the closed set of failures a command can produce.
// The API and auth layers translate transport and OAuth failures into
// these variants at the boundary; `Error::kind` is the classification
// the auth-retry wrapper matches on.

use thiserror::Error;

/// Every failure a command, the dispatcher or a collaborator can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// The identity provider rejected our credential while refreshing it.
    #[error("access token expired: {0}")]
    ExpiredToken(String),

    /// The service answered with a non-success status.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Interactive login could not obtain a credential.
    #[error("login failed: {0}")]
    Login(String),

    #[error("No SSH keys to add.")]
    NoKeys,

    #[error("invalid {noun} choice '{input}': expected a number between 1 and {max}")]
    InvalidChoice {
        noun: String,
        input: String,
        max: usize,
    },

    #[error("refusing to upload: {0}")]
    RefusingUpload(String),

    #[error("{0}")]
    Flags(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// How the auth-retry wrapper treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExpiredToken,
    Unauthorized,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ExpiredToken(_) => ErrorKind::ExpiredToken,
            Error::Api { status: 401, .. } => ErrorKind::Unauthorized,
            _ => ErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
