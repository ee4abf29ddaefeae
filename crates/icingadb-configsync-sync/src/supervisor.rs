//! Shared handles every Operator works with.

use std::sync::Arc;

use icingadb_configsync_store::{ConfigStore, RelationalStore};
use tokio::sync::mpsc;

use crate::decode::DecodePoolHandle;
use crate::error::SyncError;

/// Central error channel.
///
/// Fetch and bulk-exec failures are reported here; whoever owns the receiver
/// decides whether to keep running. Reporting never blocks.
#[derive(Clone)]
pub struct ErrorSink {
    tx: mpsc::UnboundedSender<SyncError>,
}

impl ErrorSink {
    /// Create a sink and the receiver its reports arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Log and forward an error.
    pub fn report(&self, err: SyncError) {
        tracing::error!(error = %err, "sync failed");
        if self.tx.send(err).is_err() {
            tracing::debug!("error receiver gone, report dropped");
        }
    }

    /// True once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Collaborators shared by all Operators.
#[derive(Clone)]
pub struct Supervisor {
    pub config_store: Arc<dyn ConfigStore>,
    pub relational_store: Arc<dyn RelationalStore>,
    pub decoder: DecodePoolHandle,
    pub errors: ErrorSink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_reaches_receiver() {
        let (sink, mut rx) = ErrorSink::channel();
        sink.report(SyncError::ChannelClosed("test"));
        assert!(matches!(rx.recv().await, Some(SyncError::ChannelClosed("test"))));
    }

    #[test]
    fn test_report_after_receiver_dropped() {
        let (sink, rx) = ErrorSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        sink.report(SyncError::NotResponsible("host"));
    }
}
