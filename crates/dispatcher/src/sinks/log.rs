//! LogSink - logs each snapshot via tracing

use contracts::{ChannelId, ContractError, MeasurementSnapshot, ResultsSink};
use tracing::{info, instrument};

/// Placeholder for a channel without a measurement yet
const NO_VALUE: &str = "--";

/// Sink that logs a one-line summary of the bench state
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn channel_text(snapshot: &MeasurementSnapshot, channel: ChannelId) -> String {
        match snapshot.exposure(channel) {
            Some(exposure) if snapshot.is_fresh(channel) => format!("{exposure} *"),
            Some(exposure) => exposure.to_string(),
            None => NO_VALUE.to_string(),
        }
    }

    fn log_snapshot(&self, snapshot: &MeasurementSnapshot) {
        let travel = snapshot
            .travel
            .map_or_else(|| NO_VALUE.to_string(), |travel| travel.to_string());

        info!(
            sink = %self.name,
            sequence = snapshot.sequence,
            s1 = %Self::channel_text(snapshot, ChannelId::One),
            s2 = %Self::channel_text(snapshot, ChannelId::Two),
            s3 = %Self::channel_text(snapshot, ChannelId::Three),
            travel = %travel,
            "Measurement"
        );
    }
}

impl ResultsSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_render",
        skip(self, snapshot),
        fields(sink = %self.name, sequence = snapshot.sequence)
    )]
    async fn render(&mut self, snapshot: &MeasurementSnapshot) -> Result<(), ContractError> {
        self.log_snapshot(snapshot);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
