//! Output interfaces
//!
//! - [`ResultsSink`]: async renderer running behind the dispatcher
//! - [`SnapshotPublisher`]: non-blocking hand-off used by the poll loop

use thiserror::Error;

use crate::{ContractError, MeasurementSnapshot};

/// Results output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(ResultsSink: Send)]
pub trait LocalResultsSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Render a snapshot
    ///
    /// # Errors
    /// Returns render error (should include context)
    async fn render(&mut self, snapshot: &MeasurementSnapshot) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Reason a snapshot could not be handed off
#[derive(Debug, Error)]
pub enum PublishError {
    /// Downstream queue is full; the snapshot is handed back for a later retry
    #[error("publish queue full, snapshot {} deferred", .0.sequence)]
    Backpressure(Box<MeasurementSnapshot>),

    /// Downstream side has gone away
    #[error("publish channel closed")]
    Closed,
}

/// Synchronous, non-blocking snapshot hand-off
///
/// Called from the measurement poll loop, which must never block or await.
pub trait SnapshotPublisher {
    /// Hand a snapshot downstream without blocking
    fn publish(&mut self, snapshot: MeasurementSnapshot) -> Result<(), PublishError>;
}

impl<P: SnapshotPublisher + ?Sized> SnapshotPublisher for Box<P> {
    fn publish(&mut self, snapshot: MeasurementSnapshot) -> Result<(), PublishError> {
        (**self).publish(snapshot)
    }
}

/// Collects every published snapshot in memory (tests, demos)
impl SnapshotPublisher for Vec<MeasurementSnapshot> {
    fn publish(&mut self, snapshot: MeasurementSnapshot) -> Result<(), PublishError> {
        self.push(snapshot);
        Ok(())
    }
}
