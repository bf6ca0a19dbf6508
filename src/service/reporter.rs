use crate::error::IndexerError;
use tokio::sync::mpsc;
use tracing::error;

/// Sending half of the shared error-reporting channel.
///
/// Cloned into every connection task; the server's shutdown watcher owns the
/// receiving half and logs what arrives.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    tx: mpsc::Sender<IndexerError>,
}

impl ErrorReporter {
    /// Create a reporter and the receiver its errors are delivered to
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<IndexerError>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Forward `err` to the watcher. Logged in place if the watcher is gone.
    pub async fn report(&self, err: IndexerError) {
        if let Err(mpsc::error::SendError(err)) = self.tx.send(err).await {
            error!(error = %err, "Error reported after watcher exited");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_errors_in_order() {
        let (reporter, mut rx) = ErrorReporter::channel(4);
        reporter.report(IndexerError::MissingCommand).await;
        reporter.report(IndexerError::MalformedMessage).await;

        assert!(matches!(rx.recv().await, Some(IndexerError::MissingCommand)));
        assert!(matches!(rx.recv().await, Some(IndexerError::MalformedMessage)));
    }

    #[tokio::test]
    async fn report_after_receiver_dropped_does_not_block() {
        let (reporter, rx) = ErrorReporter::channel(1);
        drop(rx);
        reporter.report(IndexerError::ConnectionClosed).await;
    }
}
