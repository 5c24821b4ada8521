//! Pipeline-wide error handling.
//!
//! Stages only report errors. Something has to read those reports, and that
//! reader decides when the pipeline should stop. [`ErrorWatcher`] is that
//! reader: feed it the [`merge`](crate::merge) of every stage's error channel
//! and the cancellation token shared by the source stages.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::channel::ErrorOutlet;
use crate::error::{Error, ErrorKind};

/// Which errors cancel the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Only fatal errors
    OnFatal,
    /// Fatal errors, and errors that were never tagged with a stage identity
    #[default]
    OnFatalOrUnclassified,
}

impl ShutdownPolicy {
    /// Whether `error` should stop the pipeline under this policy
    pub fn should_shutdown(&self, error: &Error) -> bool {
        match error.kind() {
            ErrorKind::Fatal => true,
            ErrorKind::Exhausted => false,
            ErrorKind::Recoverable => {
                *self == ShutdownPolicy::OnFatalOrUnclassified && error.identity().is_none()
            }
        }
    }
}

/// Drains an error channel and cancels a token when the policy says so.
pub struct ErrorWatcher;

impl ErrorWatcher {
    /// Spawn a task that reads `errors` until it closes.
    ///
    /// The first error that triggers shutdown cancels `token`. Reading carries
    /// on afterwards so that no stage stalls on a full error channel while it
    /// winds down. The task resolves to that first error, or `None`.
    pub fn spawn(
        errors: ErrorOutlet,
        token: CancellationToken,
        policy: ShutdownPolicy,
    ) -> JoinHandle<Option<Error>> {
        tokio::spawn(Self::watch(errors, token, policy))
    }

    /// The body of [`ErrorWatcher::spawn`], for callers that want to await it in place
    pub async fn watch(
        mut errors: ErrorOutlet,
        token: CancellationToken,
        policy: ShutdownPolicy,
    ) -> Option<Error> {
        let mut first = None;
        while let Some(err) = errors.recv().await {
            if policy.should_shutdown(&err) {
                error!(error = %err, "stopping pipeline");
                if first.is_none() {
                    token.cancel();
                    first = Some(err);
                }
            } else {
                match err.identity() {
                    Some((service, stage)) => warn!(service, stage, error = %err, "stage error"),
                    None => warn!(error = %err, "stage error"),
                }
            }
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::from_iter;

    #[derive(Debug, thiserror::Error)]
    #[error("lost connection")]
    struct LostConnection;

    #[test]
    fn test_policies() {
        let tagged = Error::stage(Error::custom("bad row"), "svc", "decode");
        let raw = Error::custom("who knows");
        let fatal = Error::fatal(LostConnection);

        assert!(!ShutdownPolicy::OnFatal.should_shutdown(&tagged));
        assert!(!ShutdownPolicy::OnFatal.should_shutdown(&raw));
        assert!(ShutdownPolicy::OnFatal.should_shutdown(&fatal));
        assert!(ShutdownPolicy::OnFatal.should_shutdown(&Error::stage(fatal.clone(), "svc", "publish")));

        let strict = ShutdownPolicy::default();
        assert!(!strict.should_shutdown(&tagged));
        assert!(strict.should_shutdown(&raw));
        assert!(strict.should_shutdown(&fatal));
    }

    #[tokio::test]
    async fn test_recoverable_errors_do_not_cancel() {
        let token = CancellationToken::new();
        let errors = from_iter(vec![
            Error::stage(Error::custom("a"), "svc", "decode"),
            Error::stage(Error::custom("b"), "svc", "tag"),
        ]);
        let first = ErrorWatcher::spawn(errors, token.clone(), ShutdownPolicy::default())
            .await
            .unwrap();
        assert!(first.is_none());
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_first_fatal_cancels_and_is_returned() {
        let token = CancellationToken::new();
        let errors = from_iter(vec![
            Error::stage(Error::custom("a"), "svc", "decode"),
            Error::fatal(LostConnection),
            Error::custom("later"),
        ]);
        let first = ErrorWatcher::watch(errors, token.clone(), ShutdownPolicy::OnFatal).await;
        assert!(first.unwrap().is_fatal());
        assert!(token.is_cancelled());
    }
}
