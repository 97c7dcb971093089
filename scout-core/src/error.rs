use thiserror::Error;

/// Failure of a single page fetch against the explorer API.
///
/// Every variant except `InvalidRequest` is a network-kind failure: the
/// request left the client and the provider (or the transport) did not hand
/// back a usable JSON body. Collection stores record these as `last_error`
/// instead of propagating them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        !matches!(self, FetchError::InvalidRequest(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
