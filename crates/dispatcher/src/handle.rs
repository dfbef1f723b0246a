//! SinkHandle - one results sink behind its own mailbox and worker task

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{MeasurementSnapshot, ResultsSink};

use crate::mailbox::{Delivery, Mailbox};
use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Handle to a running sink worker
///
/// A slow sink never holds up the others: when it falls behind, queued
/// snapshots are coalesced so it renders the newest bench state next.
pub struct SinkHandle {
    name: String,
    mailbox: Arc<Mailbox>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task; must run inside a tokio runtime
    pub fn spawn<S: ResultsSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let mailbox = Arc::new(Mailbox::new(queue_capacity));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(
            sink,
            Arc::clone(&mailbox),
            Arc::clone(&metrics),
        ));

        Self {
            name,
            mailbox,
            metrics,
            worker,
        }
    }

    /// Hand a snapshot to the sink without waiting
    pub fn offer(&self, snapshot: MeasurementSnapshot) -> Delivery {
        let sequence = snapshot.sequence;
        let delivery = self.mailbox.offer(snapshot);
        if let Delivery::Coalesced { superseded } = delivery {
            self.metrics.record_coalesced();
            observability::record_sink_coalesced(&self.name);
            trace!(sink = %self.name, superseded, sequence, "Sink behind, snapshot coalesced");
        }
        delivery
    }

    /// Render what is still queued, then flush and close the sink
    ///
    /// Returns the final counters.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> (String, MetricsSnapshot) {
        self.mailbox.close();
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        let metrics = self.metrics.snapshot();
        debug!(sink = %self.name, ?metrics, "SinkHandle shutdown complete");
        (self.name, metrics)
    }
}

async fn sink_worker<S: ResultsSink>(mut sink: S, mailbox: Arc<Mailbox>, metrics: Arc<SinkMetrics>) {
    debug!(sink = %sink.name(), "Sink worker started");

    while let Some(snapshot) = mailbox.next().await {
        let result = sink.render(&snapshot).await;
        metrics.record_render(snapshot.sequence, result.is_ok());
        observability::record_sink_render(sink.name(), result.is_ok());
        if let Err(e) = result {
            // A failed render does not stop the worker
            error!(
                sink = %sink.name(),
                sequence = snapshot.sequence,
                error = %e,
                "Render failed"
            );
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %sink.name(), error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %sink.name(), error = %e, "Close failed on shutdown");
    }

    debug!(sink = %sink.name(), "Sink worker stopped");
}
