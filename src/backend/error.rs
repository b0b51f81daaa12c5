use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {cause}")]
    Network { url: String, cause: NetworkCause },

    #[error("could not parse response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },
}

#[derive(Debug, Error)]
pub enum NetworkCause {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),
}

impl ApiError {
    pub fn transport(url: &str, err: reqwest::Error) -> Self {
        ApiError::Network {
            url: url.to_string(),
            cause: NetworkCause::Transport(err),
        }
    }

    pub fn status(url: &str, status: u16) -> Self {
        ApiError::Network {
            url: url.to_string(),
            cause: NetworkCause::Status(status),
        }
    }

    pub fn parse(url: &str, message: impl ToString) -> Self {
        ApiError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound { what: what.into() }
    }
}
