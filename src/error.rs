//! Error types shared by every pipeline stage.
//!
//! Stages never abort on a failed unit of work. Failures travel on the stage's
//! error channel as [`Error`] values, and the consumer of those channels decides
//! whether an error is worth stopping the pipeline for (see [`Error::kind`]).

use std::sync::Arc;

/// Boxed source error carried by the error variants.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// The main error type for pipeline stages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The producer has no more values. Terminates the worker that observed it
    /// and is never published on an error channel.
    #[error("no additional values can be produced")]
    Exhausted,

    /// A recoverable failure tagged with the service and stage that raised it
    #[error("{service}/{stage}: {source}")]
    Stage {
        service: Arc<str>,
        stage: Arc<str>,
        #[source]
        source: Arc<Error>,
    },

    /// A failure the pipeline cannot continue after
    #[error("fatal: {0}")]
    Fatal(#[source] BoxError),

    /// An unclassified failure from a work function
    #[error(transparent)]
    Other(BoxError),

    /// An unclassified failure with a message
    #[error("{0}")]
    Custom(String),

    /// A worker task of the named stage panicked
    #[error("worker of stage `{stage}` panicked: {message}")]
    WorkerPanicked { stage: &'static str, message: String },
}

/// Coarse classification used by error consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No more input; not a failure
    Exhausted,
    /// Log and continue
    Recoverable,
    /// Stop the whole pipeline
    Fatal,
}

impl Error {
    /// Wrap any error as an unclassified failure
    pub fn other<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Other(Arc::new(error))
    }

    /// Mark any error as fatal
    pub fn fatal<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Fatal(Arc::new(error))
    }

    /// Create an unclassified error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// Tag an error with the service and stage it came from
    pub fn stage(error: Error, service: impl Into<Arc<str>>, stage: impl Into<Arc<str>>) -> Self {
        Error::Stage {
            service: service.into(),
            stage: stage.into(),
            source: Arc::new(error),
        }
    }

    /// Classify this error, looking through `Stage` tags and `Other` payloads
    /// that wrap another [`Error`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Exhausted => ErrorKind::Exhausted,
            Error::Fatal(_) => ErrorKind::Fatal,
            Error::Stage { source, .. } => source.kind(),
            Error::Other(payload) => payload
                .downcast_ref::<Error>()
                .map_or(ErrorKind::Recoverable, Error::kind),
            Error::Custom(_) | Error::WorkerPanicked { .. } => ErrorKind::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    pub fn is_exhausted(&self) -> bool {
        self.kind() == ErrorKind::Exhausted
    }

    /// The `(service, stage)` identity, if this error has been classified
    pub fn identity(&self) -> Option<(&str, &str)> {
        match self {
            Error::Stage { service, stage, .. } => Some((service.as_ref(), stage.as_ref())),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Other(Arc::from(e))
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting foreign errors into our Error type
pub trait IntoError<T> {
    fn into_error(self) -> Result<T>;
    fn into_fatal(self) -> Result<T>;
}

impl<T, E> IntoError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_error(self) -> Result<T> {
        self.map_err(Error::other)
    }

    fn into_fatal(self) -> Result<T> {
        self.map_err(Error::fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::Exhausted.kind(), ErrorKind::Exhausted);
        assert_eq!(Error::custom("boom").kind(), ErrorKind::Recoverable);
        assert!(Error::fatal(std::fmt::Error).is_fatal());
        assert!(!Error::stage(Error::custom("boom"), "svc", "parse").is_fatal());
    }

    #[test]
    fn test_kind_survives_wrapping() {
        #[derive(Debug, thiserror::Error)]
        #[error("disk gone")]
        struct DiskGone;

        let tagged = Error::stage(Error::fatal(DiskGone), "svc", "publish");
        assert_eq!(tagged.kind(), ErrorKind::Fatal);
        assert!(Error::other(Error::fatal(DiskGone)).is_fatal());
        assert!(Error::stage(Error::other(tagged), "svc", "outer").is_fatal());

        assert!(Error::stage(Error::Exhausted, "svc", "fetch").is_exhausted());
        assert!(Error::other(Error::Exhausted).is_exhausted());
        assert_eq!(Error::other(std::fmt::Error).kind(), ErrorKind::Recoverable);
    }

    #[test]
    fn test_stage_display_and_identity() {
        let err = Error::stage(Error::custom("bad row"), "ingest", "decode");
        assert_eq!(err.to_string(), "ingest/decode: bad row");
        assert_eq!(err.identity(), Some(("ingest", "decode")));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(Error::custom("x").identity(), None);
    }

    #[test]
    fn test_into_error() {
        let parsed: std::result::Result<i32, _> = "nope".parse::<i32>();
        assert_eq!(parsed.clone().into_error().unwrap_err().kind(), ErrorKind::Recoverable);
        assert!(parsed.into_fatal().unwrap_err().is_fatal());
    }
}
