//! SnapshotSender - poll-loop side of the dispatcher input queue

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use contracts::{MeasurementSnapshot, PublishError, SnapshotPublisher};

/// Non-blocking publisher feeding a [`Dispatcher`](crate::Dispatcher)
///
/// Usable from a plain thread: it never awaits.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::Sender<MeasurementSnapshot>,
}

impl SnapshotSender {
    pub fn new(tx: mpsc::Sender<MeasurementSnapshot>) -> Self {
        Self { tx }
    }
}

impl SnapshotPublisher for SnapshotSender {
    fn publish(&mut self, snapshot: MeasurementSnapshot) -> Result<(), PublishError> {
        self.tx.try_send(snapshot).map_err(|e| match e {
            TrySendError::Full(snapshot) => PublishError::Backpressure(Box::new(snapshot)),
            TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

/// Bounded dispatcher input queue
pub fn snapshot_channel(capacity: usize) -> (SnapshotSender, mpsc::Receiver<MeasurementSnapshot>) {
    let (tx, rx) = mpsc::channel(capacity);
    (SnapshotSender::new(tx), rx)
}
