use std::{io, path::PathBuf};

use reqwest::StatusCode;

/// Failures surfaced by the gateway, the session, and the board.
///
/// The variants map to the distinct user-facing messages a caller picks from,
/// so HTTP statuses are folded into kinds rather than passed through raw.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not reach the server: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server answered {status}: {message}")]
    Unexpected { status: StatusCode, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("session file {}: {source}", path.display())]
    SessionIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session file {} is corrupt: {source}", path.display())]
    SessionFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Classifies a non-success response from the backend.
    ///
    /// Any 4xx other than 401, 403 and 404 is the backend rejecting the input.
    pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            status if status.is_client_error() => Error::Validation(message),
            status => Error::Unexpected { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_kinds() {
        assert!(matches!(
            Error::from_status(StatusCode::BAD_REQUEST, "title is required".into()),
            Error::Validation(m) if m == "title is required"
        ));
        assert!(matches!(
            Error::from_status(StatusCode::UNAUTHORIZED, "token missing".into()),
            Error::Auth(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::FORBIDDEN, String::new()),
            Error::Auth(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::NOT_FOUND, String::new()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::UNPROCESSABLE_ENTITY, "likes must be a number".into()),
            Error::Validation(m) if m == "likes must be a number"
        ));
        assert!(matches!(
            Error::from_status(StatusCode::CONFLICT, String::new()),
            Error::Validation(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::UNSUPPORTED_MEDIA_TYPE, String::new()),
            Error::Validation(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            Error::Unexpected { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}
