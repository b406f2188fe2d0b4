use flock_core::StatsBatch;

/// Receives periodic snapshots of every client.
///
/// Called on the timeline, so implementations must hand the batch off without blocking.
pub trait StatsSink: Send + Sync {
    fn record(&self, batch: StatsBatch);
}
