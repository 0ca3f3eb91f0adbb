use tonic::Status;

/// Failures of the transport plumbing around propagation. Extraction and
/// injection themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error(transparent)]
    Status(#[from] Status),

    #[error("stream ended before a reply was received")]
    EmptyStream,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            // downstream statuses go back to our caller untouched
            Error::Status(status) => status,
            Error::Transport(err) => Status::unavailable(err.to_string()),
            Error::EmptyStream => Status::unavailable(err.to_string()),
        }
    }
}
