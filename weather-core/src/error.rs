/// Failures of a single lookup attempt.
///
/// The `Display` text of each variant is exactly what the front-end shows in
/// its error line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The geocoding service could not be reached at all.
    #[error("Connect to the internet")]
    Network,

    /// The geocoding service answered, but with no matching location.
    #[error("Location not found")]
    NotFound,

    /// Any other failure reported by a remote service, passed through as-is.
    #[error("{0}")]
    Remote(String),
}

impl LookupError {
    pub fn remote(message: impl Into<String>) -> Self {
        LookupError::Remote(message.into())
    }
}
