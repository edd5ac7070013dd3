use thiserror::Error;

use fl_core::types::ErrorKind;
use fl_integrations::github::client::GitHubError;
use fl_integrations::github::transport::TransportError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("too many issues/PRs! (found {count}, maximum of {max})")]
    TooMany { count: usize, max: usize },

    #[error("invalid toggle token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::TooMany { .. } => ErrorKind::TooMany,
            LinkError::InvalidToken(_) => ErrorKind::InvalidToken,
            LinkError::GitHub(GitHubError::Status { status: 403 | 429 }) => ErrorKind::RateLimited,
            LinkError::GitHub(GitHubError::Status { status: 404 | 410 }) => ErrorKind::NotFound,
            LinkError::GitHub(_) => ErrorKind::Transport,
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        LinkError::GitHub(GitHubError::Transport(err))
    }
}
