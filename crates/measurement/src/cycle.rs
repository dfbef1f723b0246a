//! Measurement poll loop.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{
    ChannelId, CurtainTravel, CycleConfig, Exposure, FreshMask, IntervalSource,
    MeasurementSnapshot, PublishError, SnapshotPublisher,
};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::{CycleError, IntervalGuard, SpeedCalculator, Throttle, TravelCorrelator};

/// Iterations between edge-count gauge updates in [`MeasurementCycle::run`]
const EDGE_GAUGE_INTERVAL: u64 = 4096;

/// Cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Everything computed so far has been published
    Idle,
    /// New values are waiting for the throttle or a retry
    PendingPublish,
}

/// Outcome of one poll iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Exposures plus travel results computed this iteration
    pub calculations: u32,
    /// Sequence number published this iteration
    pub published: Option<u64>,
    /// A publish was attempted but the queue was full
    pub deferred: bool,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub iterations: u64,
    pub intervals_accepted: u64,
    pub intervals_rejected: u64,
    pub travel_computed: u64,
    pub joins_discarded: u64,
    pub snapshots_published: u64,
    pub publish_retries: u64,
}

/// Half of a travel join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinSlot {
    start_us: u32,
    end_us: u32,
}

#[inline]
fn join_index(channel: ChannelId) -> Option<usize> {
    match channel {
        ChannelId::One => Some(0),
        ChannelId::Three => Some(1),
        ChannelId::Two => None,
    }
}

/// Poll-and-publish loop over the three channels
///
/// Never blocks: each [`poll`](Self::poll) drains every channel once, runs
/// the calculators on what it found and hands at most one snapshot to the
/// publisher.
pub struct MeasurementCycle<S, P> {
    source: S,
    publisher: P,
    guard: IntervalGuard,
    staleness_us: Option<u32>,
    throttle: Throttle,
    /// Channel 1 and channel 3 halves of the travel join
    join: [Option<JoinSlot>; 2],
    exposures: [Option<Exposure>; 3],
    travel: Option<CurtainTravel>,
    fresh: FreshMask,
    /// Last publish attempt hit backpressure
    retry_pending: bool,
    sequence: u64,
    stats: CycleStats,
}

impl<S, P> MeasurementCycle<S, P>
where
    S: IntervalSource,
    P: SnapshotPublisher,
{
    pub fn new(source: S, publisher: P, config: CycleConfig) -> Self {
        debug!(
            min_interval_us = config.interval.min_us,
            max_interval_us = config.interval.max_us,
            join_staleness_us = ?config.join.staleness_us,
            policy = ?config.publish,
            "measurement cycle created"
        );

        Self {
            source,
            publisher,
            guard: IntervalGuard::new(config.interval),
            staleness_us: config.join.staleness_us,
            throttle: Throttle::new(config.publish),
            join: [None; 2],
            exposures: [None; 3],
            travel: None,
            fresh: FreshMask::default(),
            retry_pending: false,
            sequence: 0,
            stats: CycleStats::default(),
        }
    }

    /// Run one iteration
    ///
    /// Only fails when the publisher has gone away.
    #[instrument(level = "trace", name = "measurement_cycle_poll", skip(self))]
    pub fn poll(&mut self) -> Result<PollReport, CycleError> {
        let mut report = PollReport::default();
        self.stats.iterations += 1;

        self.expire_stale_joins(self.source.now_us());

        for channel in ChannelId::ALL {
            if let Some((start_us, end_us)) = self.source.drain(channel) {
                if self.accept_interval(channel, start_us, end_us) {
                    report.calculations += 1;
                }
            }
        }

        if self.try_join() {
            report.calculations += 1;
        }

        let due = self.throttle.tick(report.calculations > 0);
        if (due || self.retry_pending) && self.fresh.any() {
            self.publish(&mut report)?;
        }

        Ok(report)
    }

    /// Publish pending values now, regardless of the throttle
    ///
    /// Returns the published sequence number, or `None` if nothing was
    /// pending or the queue was full.
    #[instrument(name = "measurement_cycle_flush", skip(self))]
    pub fn flush(&mut self) -> Result<Option<u64>, CycleError> {
        if !self.fresh.any() {
            return Ok(None);
        }
        let mut report = PollReport::default();
        self.publish(&mut report)?;
        Ok(report.published)
    }

    /// Poll until `shutdown` is set, then drain once more and flush
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<CycleStats, CycleError> {
        debug!("measurement cycle running");
        while !shutdown.load(Ordering::Relaxed) {
            let report = self.poll()?;
            if report.calculations == 0 && report.published.is_none() {
                std::hint::spin_loop();
            }
            if self.stats.iterations % EDGE_GAUGE_INTERVAL == 0 {
                self.record_edge_counts();
            }
        }

        self.poll()?;
        self.record_edge_counts();
        if self.flush()?.is_none() && self.fresh.any() {
            warn!("final snapshot could not be queued");
        }
        debug!(stats = ?self.stats, "measurement cycle stopped");
        Ok(self.stats)
    }

    pub fn state(&self) -> CycleState {
        if self.fresh.any() {
            CycleState::PendingPublish
        } else {
            CycleState::Idle
        }
    }

    /// No unpublished values and no debounce in progress
    pub fn is_idle(&self) -> bool {
        self.state() == CycleState::Idle && !self.throttle.is_counting()
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Last published sequence number (0 before the first publish)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Bench state right now
    ///
    /// Carries the last published sequence number and the current value of
    /// every channel; `fresh` marks what has not been published yet.
    pub fn current_snapshot(&self) -> MeasurementSnapshot {
        MeasurementSnapshot {
            sequence: self.sequence,
            exposures: self.exposures,
            travel: self.travel,
            fresh: self.fresh,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Validate, compute and stage one interval; returns whether it was accepted
    fn accept_interval(&mut self, channel: ChannelId, start_us: u32, end_us: u32) -> bool {
        let result = self
            .guard
            .check(start_us, end_us)
            .and_then(|_| SpeedCalculator::compute(start_us, end_us));

        match result {
            Ok(exposure) => {
                debug!(
                    channel = %channel,
                    start_us,
                    end_us,
                    duration_us = exposure.duration_us,
                    duration_ms = exposure.duration_ms,
                    reciprocal = exposure.reciprocal,
                    "exposure computed"
                );
                observability::record_exposure(channel, &exposure);

                self.exposures[channel.index()] = Some(exposure);
                self.fresh.mark_exposure(channel);
                self.stats.intervals_accepted += 1;

                if let Some(idx) = join_index(channel) {
                    if self.join[idx].is_some() {
                        trace!(channel = %channel, "join slot replaced by newer interval");
                    }
                    self.join[idx] = Some(JoinSlot { start_us, end_us });
                }
                true
            }
            Err(err) => {
                warn!(
                    channel = %channel,
                    start_us,
                    end_us,
                    duration_us = SpeedCalculator::duration_us(start_us, end_us),
                    error = %err,
                    "interval rejected"
                );
                observability::record_rejected_interval(channel, err.reason());
                self.stats.intervals_rejected += 1;

                // Its timestamps are stale: do not pair them later
                if let Some(idx) = join_index(channel) {
                    self.join[idx] = None;
                }
                false
            }
        }
    }

    /// Run the travel correlator once both outer slots are filled
    fn try_join(&mut self) -> bool {
        let (Some(a), Some(b)) = (self.join[0], self.join[1]) else {
            return false;
        };
        self.join = [None; 2];

        let travel = TravelCorrelator::compute(a.start_us, b.start_us, a.end_us, b.end_us);
        debug!(
            start_a_us = a.start_us,
            start_b_us = b.start_us,
            end_a_us = a.end_us,
            end_b_us = b.end_us,
            leading_ms = travel.leading_ms,
            trailing_ms = travel.trailing_ms,
            "curtain travel computed"
        );
        observability::record_travel(&travel);

        self.travel = Some(travel);
        self.fresh.mark_travel();
        self.stats.travel_computed += 1;
        true
    }

    fn expire_stale_joins(&mut self, now_us: u32) {
        let Some(staleness_us) = self.staleness_us else {
            return;
        };
        let (a, b) = ChannelId::OUTER;
        for channel in [a, b] {
            let Some(idx) = join_index(channel) else {
                continue;
            };
            if let Some(slot) = self.join[idx] {
                let age_us = now_us.wrapping_sub(slot.end_us);
                if age_us > staleness_us {
                    debug!(channel = %channel, age_us, "stale join slot discarded");
                    observability::record_join_discarded(channel);
                    self.join[idx] = None;
                    self.stats.joins_discarded += 1;
                }
            }
        }
    }

    fn publish(&mut self, report: &mut PollReport) -> Result<(), CycleError> {
        let sequence = self.sequence + 1;
        let snapshot = MeasurementSnapshot {
            sequence,
            exposures: self.exposures,
            travel: self.travel,
            fresh: self.fresh,
        };

        match self.publisher.publish(snapshot) {
            Ok(()) => {
                self.sequence = sequence;
                self.fresh = FreshMask::default();
                self.retry_pending = false;
                self.throttle.cancel();
                self.stats.snapshots_published += 1;
                observability::record_snapshot_published(sequence);
                debug!(sequence, "snapshot published");
                report.published = Some(sequence);
                Ok(())
            }
            Err(PublishError::Backpressure(_)) => {
                if !self.retry_pending {
                    debug!(sequence, "publish queue full, retrying next iteration");
                }
                self.retry_pending = true;
                self.stats.publish_retries += 1;
                observability::record_publish_backpressure();
                report.deferred = true;
                Ok(())
            }
            Err(PublishError::Closed) => {
                warn!(sequence, "snapshot publisher closed");
                Err(CycleError::PublisherClosed)
            }
        }
    }

    fn record_edge_counts(&self) {
        for (channel, edges) in ChannelId::ALL.into_iter().zip(self.source.edge_counts()) {
            observability::record_edge_count(channel, edges);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EdgeLevel, IntervalBounds, JoinConfig, PublishPolicy};
    use edge_capture::{ChannelBank, ManualClock};
    use std::sync::Arc;

    type Cycle<P> = MeasurementCycle<Arc<ChannelBank>, P>;

    struct Bench {
        bank: Arc<ChannelBank>,
        clock: Arc<ManualClock>,
    }

    impl Bench {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(0));
            let bank = Arc::new(ChannelBank::new(clock.clone()));
            Self { bank, clock }
        }

        fn edge(&self, channel: ChannelId, level: EdgeLevel, at_us: u32) {
            self.clock.set(at_us);
            self.bank.on_edge(channel, level);
        }

        fn interval(&self, channel: ChannelId, start_us: u32, end_us: u32) {
            self.edge(channel, EdgeLevel::Blocked, start_us);
            self.edge(channel, EdgeLevel::Clear, end_us);
        }

        fn cycle(&self, config: CycleConfig) -> Cycle<Vec<MeasurementSnapshot>> {
            MeasurementCycle::new(self.bank.clone(), Vec::new(), config)
        }
    }

    fn immediate() -> CycleConfig {
        CycleConfig {
            publish: PublishPolicy::Immediate,
            ..Default::default()
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    /// Rejects the first `reject` attempts, then records
    struct FlakyPublisher {
        reject: u32,
        accepted: Vec<MeasurementSnapshot>,
    }

    impl SnapshotPublisher for FlakyPublisher {
        fn publish(&mut self, snapshot: MeasurementSnapshot) -> Result<(), PublishError> {
            if self.reject > 0 {
                self.reject -= 1;
                return Err(PublishError::Backpressure(Box::new(snapshot)));
            }
            self.accepted.push(snapshot);
            Ok(())
        }
    }

    struct ClosedPublisher;

    impl SnapshotPublisher for ClosedPublisher {
        fn publish(&mut self, _snapshot: MeasurementSnapshot) -> Result<(), PublishError> {
            Err(PublishError::Closed)
        }
    }

    #[test]
    fn test_single_channel_exposure() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        let report = cycle.poll().unwrap();
        assert_eq!(report.calculations, 1);
        assert_eq!(report.published, Some(1));

        let snapshot = &cycle.publisher()[0];
        let exposure = snapshot.exposure(ChannelId::Two).unwrap();
        assert_close(exposure.duration_ms, 2.5);
        assert_close(exposure.reciprocal, 400.0);
        assert!(snapshot.is_fresh(ChannelId::Two));
        assert!(snapshot.travel.is_none());
        assert!(cycle.is_idle());
    }

    #[test]
    fn test_travel_forward_and_reverse() {
        for (first, second) in [
            (ChannelId::One, ChannelId::Three),
            (ChannelId::Three, ChannelId::One),
        ] {
            let bench = Bench::new();
            let mut cycle = bench.cycle(immediate());

            bench.edge(first, EdgeLevel::Blocked, 1_000);
            bench.edge(second, EdgeLevel::Blocked, 1_300);
            bench.edge(first, EdgeLevel::Clear, 4_000);
            bench.edge(second, EdgeLevel::Clear, 4_250);

            let report = cycle.poll().unwrap();
            assert_eq!(report.calculations, 3);

            let travel = cycle.publisher()[0].travel.unwrap();
            assert_close(travel.leading_ms, 0.3);
            assert_close(travel.trailing_ms, 0.25);
        }
    }

    #[test]
    fn test_join_across_iterations() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::One, 1_000, 4_000);
        cycle.poll().unwrap();
        assert!(cycle.publisher()[0].travel.is_none());

        bench.interval(ChannelId::Three, 1_300, 4_250);
        cycle.poll().unwrap();

        let second = &cycle.publisher()[1];
        assert!(second.fresh.travel);
        assert_close(second.travel.unwrap().leading_ms, 0.3);
        assert_eq!(cycle.stats().travel_computed, 1);
    }

    #[test]
    fn test_debounced_publishes_on_fifth_idle_iteration() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig {
            publish: PublishPolicy::Debounced { idle_threshold: 5 },
            ..Default::default()
        });

        bench.interval(ChannelId::Two, 1_000, 3_500);
        assert_eq!(cycle.poll().unwrap().published, None);
        assert_eq!(cycle.state(), CycleState::PendingPublish);

        for _ in 0..4 {
            assert_eq!(cycle.poll().unwrap().published, None);
        }
        assert_eq!(cycle.poll().unwrap().published, Some(1));

        for _ in 0..50 {
            assert_eq!(cycle.poll().unwrap().published, None);
        }
        assert_eq!(cycle.publisher().len(), 1);
        assert!(cycle.is_idle());
    }

    #[test]
    fn test_default_debounce_threshold() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig::default());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        cycle.poll().unwrap();

        let mut idle_iterations = 0u32;
        loop {
            idle_iterations += 1;
            if cycle.poll().unwrap().published.is_some() {
                break;
            }
        }
        assert_eq!(idle_iterations, contracts::DEFAULT_IDLE_THRESHOLD);
    }

    #[test]
    fn test_interval_is_published_once() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        for _ in 0..100 {
            cycle.poll().unwrap();
        }
        assert_eq!(cycle.publisher().len(), 1);
        assert_eq!(cycle.sequence(), 1);
    }

    #[test]
    fn test_retained_values_and_fresh_mask() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        cycle.poll().unwrap();
        bench.interval(ChannelId::One, 10_000, 11_000);
        cycle.poll().unwrap();

        let second = &cycle.publisher()[1];
        assert_eq!(second.sequence, 2);
        assert!(second.exposure(ChannelId::Two).is_some());
        assert!(!second.is_fresh(ChannelId::Two));
        assert!(second.is_fresh(ChannelId::One));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::Two, 500, 500);
        let report = cycle.poll().unwrap();

        assert_eq!(report.calculations, 0);
        assert!(cycle.publisher().is_empty());
        assert_eq!(cycle.stats().intervals_rejected, 1);
        assert!(cycle.is_idle());
    }

    #[test]
    fn test_rejected_outer_interval_clears_join_slot() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig {
            interval: IntervalBounds {
                min_us: 1,
                max_us: 10_000,
            },
            publish: PublishPolicy::Immediate,
            ..Default::default()
        });

        bench.interval(ChannelId::One, 1_000, 4_000);
        cycle.poll().unwrap();
        bench.interval(ChannelId::One, 5_000, 50_000);
        cycle.poll().unwrap();
        bench.interval(ChannelId::Three, 50_100, 53_000);
        cycle.poll().unwrap();

        assert_eq!(cycle.stats().travel_computed, 0);
        assert_eq!(cycle.stats().intervals_rejected, 1);
        assert!(cycle.publisher().iter().all(|s| s.travel.is_none()));
    }

    #[test]
    fn test_stale_join_slot_discarded() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::One, 1_000, 4_000);
        cycle.poll().unwrap();

        bench.interval(ChannelId::Three, 2_004_000, 2_004_250);
        cycle.poll().unwrap();

        assert_eq!(cycle.stats().joins_discarded, 1);
        assert_eq!(cycle.stats().travel_computed, 0);
    }

    #[test]
    fn test_staleness_bound_can_be_disabled() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig {
            join: JoinConfig { staleness_us: None },
            publish: PublishPolicy::Immediate,
            ..Default::default()
        });

        bench.interval(ChannelId::One, 1_000, 4_000);
        cycle.poll().unwrap();
        bench.interval(ChannelId::Three, 10_001_000, 10_004_000);
        cycle.poll().unwrap();

        assert_eq!(cycle.stats().joins_discarded, 0);
        let travel = cycle.publisher()[1].travel.unwrap();
        assert_close(travel.leading_ms, 10_000.0);
    }

    #[test]
    fn test_newer_outer_interval_replaces_slot() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::One, 1_000, 4_000);
        cycle.poll().unwrap();
        bench.interval(ChannelId::One, 100_000, 103_000);
        cycle.poll().unwrap();
        bench.interval(ChannelId::Three, 100_400, 103_500);
        cycle.poll().unwrap();

        let travel = cycle.publisher()[2].travel.unwrap();
        assert_close(travel.leading_ms, 0.4);
        assert_close(travel.trailing_ms, 0.5);
    }

    #[test]
    fn test_wraparound_through_cycle() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());

        bench.interval(ChannelId::Two, 4_294_967_290, 5);
        cycle.poll().unwrap();

        let exposure = cycle.publisher()[0].exposure(ChannelId::Two).unwrap();
        assert_eq!(exposure.duration_us, 11);
    }

    #[test]
    fn test_backpressure_retries_without_loss() {
        let bench = Bench::new();
        let publisher = FlakyPublisher {
            reject: 2,
            accepted: Vec::new(),
        };
        let mut cycle = MeasurementCycle::new(bench.bank.clone(), publisher, immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        let report = cycle.poll().unwrap();
        assert!(report.deferred);
        assert_eq!(cycle.state(), CycleState::PendingPublish);

        assert!(cycle.poll().unwrap().deferred);
        assert_eq!(cycle.poll().unwrap().published, Some(1));

        let publisher = cycle.publisher();
        assert_eq!(publisher.accepted.len(), 1);
        assert!(publisher.accepted[0].is_fresh(ChannelId::Two));
        assert_eq!(cycle.stats().publish_retries, 2);
        assert!(cycle.is_idle());
    }

    #[test]
    fn test_retry_folds_in_newer_values() {
        let bench = Bench::new();
        let publisher = FlakyPublisher {
            reject: 1,
            accepted: Vec::new(),
        };
        let mut cycle = MeasurementCycle::new(bench.bank.clone(), publisher, immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        cycle.poll().unwrap();
        bench.interval(ChannelId::One, 5_000, 6_000);
        cycle.poll().unwrap();

        let accepted = &cycle.publisher().accepted;
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].fresh.exposures, [true, true, false]);
    }

    #[test]
    fn test_closed_publisher_is_an_error() {
        let bench = Bench::new();
        let mut cycle = MeasurementCycle::new(bench.bank.clone(), ClosedPublisher, immediate());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        assert!(matches!(cycle.poll(), Err(CycleError::PublisherClosed)));
    }

    #[test]
    fn test_flush_bypasses_debounce() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig::default());

        bench.interval(ChannelId::Two, 1_000, 3_500);
        cycle.poll().unwrap();
        assert_eq!(cycle.flush().unwrap(), Some(1));
        assert_eq!(cycle.flush().unwrap(), None);

        // Throttle cancelled: no second publish of the same values
        for _ in 0..(contracts::DEFAULT_IDLE_THRESHOLD + 10) {
            cycle.poll().unwrap();
        }
        assert_eq!(cycle.publisher().len(), 1);
    }

    #[test]
    fn test_run_stops_on_shutdown_and_flushes() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(CycleConfig::default());
        bench.interval(ChannelId::Two, 1_000, 3_500);

        let shutdown = AtomicBool::new(true);
        let stats = cycle.run(&shutdown).unwrap();

        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.snapshots_published, 1);
        assert_eq!(cycle.publisher()[0].exposure(ChannelId::Two).unwrap().duration_us, 2_500);
    }

    #[test]
    fn test_current_snapshot_tracks_unpublished_values() {
        let bench = Bench::new();
        let mut cycle = bench.cycle(immediate());
        assert_eq!(cycle.current_snapshot().sequence, 0);

        bench.interval(ChannelId::Two, 1_000, 3_500);
        cycle.poll().unwrap();
        let published = cycle.current_snapshot();
        assert_eq!(published.sequence, 1);
        assert!(!published.fresh.any());

        let mut debounced = bench.cycle(CycleConfig::default());
        bench.interval(ChannelId::One, 10_000, 11_000);
        debounced.poll().unwrap();
        let pending = debounced.current_snapshot();
        assert_eq!(pending.sequence, 0);
        assert!(pending.is_fresh(ChannelId::One));
        assert_eq!(pending.exposure(ChannelId::One).unwrap().duration_us, 1_000);
    }
}
