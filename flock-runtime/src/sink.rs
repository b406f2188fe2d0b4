//! Stats sinks shipped with the runtime.
use flock::StatsSink;
use flock_core::StatsBatch;
use tokio::sync::mpsc;
#[allow(unused)]
use tracing::{debug, error, info, warn};

/// Logs a summary line per batch and every client at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatsSink for LogSink {
    fn record(&self, batch: StatsBatch) {
        info!(
            "{}/{} clients connected",
            batch.connected(),
            batch.clients.len()
        );
        for client in &batch.clients {
            match serde_json::to_string(client) {
                Ok(json) => debug!("{json}"),
                Err(err) => warn!("Failed to serialize stats: {err}"),
            }
        }
    }
}

/// Forwards every batch to a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatsBatch>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatsBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatsSink for ChannelSink {
    fn record(&self, batch: StatsBatch) {
        if self.tx.send(batch).is_err() {
            debug!("Stats receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::ClientStats;

    fn batch() -> StatsBatch {
        StatsBatch::new(vec![
            ClientStats {
                client: 0,
                websocket_connected: true,
                ..Default::default()
            },
            ClientStats {
                client: 1,
                ..Default::default()
            },
        ])
    }

    #[tracing_test::traced_test]
    #[test]
    fn log_sink_summarizes() {
        LogSink.record(batch());
        assert!(logs_contain("1/2 clients connected"));
    }

    #[test]
    fn channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::new();
        sink.record(batch());
        let received = rx.try_recv().unwrap();
        assert_eq!(received.clients.len(), 2);
        drop(rx);
        // A dropped receiver is not an error.
        sink.record(batch());
    }
}
