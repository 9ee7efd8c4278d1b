#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("provider error during {operation} (status {status:?}): {detail}")]
    Provider {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid personal number: {0}")]
    InvalidPersonnummer(String),
    #[error("signing key too short: got {0} bytes, need at least 32")]
    WeakSigningKey(usize),
}
