//! Dispatcher - fans snapshots out to the configured results sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{MeasurementSnapshot, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::mailbox::Delivery;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{JsonLinesSink, LogSink};

/// Start the worker for one configured sink
#[instrument(
    name = "dispatcher_spawn_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn spawn_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::JsonLines => {
            let sink = JsonLinesSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    Ok(handle)
}

/// Consumes the snapshot queue of a measurement loop
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<MeasurementSnapshot>,
}

impl Dispatcher {
    /// Dispatcher over already running sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<MeasurementSnapshot>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Forward snapshots until the input queue closes, then drain every sink
    ///
    /// Returns the per-sink counters after the last render.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!("Dispatcher started");

        let mut received: u64 = 0;
        let mut coalesced: u64 = 0;
        let mut last_sequence = None;

        while let Some(snapshot) = self.input_rx.recv().await {
            received += 1;
            last_sequence = Some(snapshot.sequence);
            coalesced += self.fan_out(snapshot);
        }

        info!(
            received,
            coalesced,
            ?last_sequence,
            "Dispatcher input closed, draining sinks"
        );

        let mut metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            metrics.push(handle.shutdown().await);
        }

        info!("Dispatcher shutdown complete");
        metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    /// Offer a snapshot to every sink; returns how many coalesced it
    fn fan_out(&self, snapshot: MeasurementSnapshot) -> u64 {
        let Some((last, rest)) = self.handles.split_last() else {
            debug!(sequence = snapshot.sequence, "No sinks, snapshot discarded");
            return 0;
        };

        let mut coalesced = 0;
        for handle in rest {
            if handle.offer(snapshot.clone()) != Delivery::Queued {
                coalesced += 1;
            }
        }
        if last.offer(snapshot) != Delivery::Queued {
            coalesced += 1;
        }
        coalesced
    }
}

/// Spawn one worker per sink config and wire them to `input_rx`
///
/// Must be called inside a tokio runtime.
#[instrument(name = "dispatcher_create", skip_all, fields(sinks = sink_configs.len()))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<MeasurementSnapshot>,
) -> Result<Dispatcher, DispatcherError> {
    let handles = sink_configs
        .iter()
        .map(spawn_sink)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dispatcher::with_handles(handles, input_rx))
}
