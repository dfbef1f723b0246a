//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟快门 e2e 测试（无需测试台硬件）
//! - 配置文件到输出的完整链路

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        ChannelId, Clock, ContractError, CycleConfig, EdgeLevel, MeasurementSnapshot,
        PublishPolicy, ResultsSink,
    };
    use dispatcher::{snapshot_channel, Dispatcher, SinkHandle, SnapshotSender};
    use edge_capture::{ChannelBank, ManualClock, ShutterProfile, SimulatedShutter, TravelDirection};
    use measurement::MeasurementCycle;

    type BenchCycle = MeasurementCycle<Arc<ChannelBank>, SnapshotSender>;

    /// Sink that keeps every rendered snapshot
    struct RecordingSink {
        name: String,
        seen: Arc<Mutex<Vec<MeasurementSnapshot>>>,
        render_delay: Duration,
    }

    impl RecordingSink {
        fn new(seen: &Arc<Mutex<Vec<MeasurementSnapshot>>>) -> Self {
            Self {
                name: "recorder".to_string(),
                seen: Arc::clone(seen),
                render_delay: Duration::ZERO,
            }
        }
    }

    impl ResultsSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn render(&mut self, snapshot: &MeasurementSnapshot) -> Result<(), ContractError> {
            if !self.render_delay.is_zero() {
                tokio::time::sleep(self.render_delay).await;
            }
            self.seen.lock().unwrap().push(snapshot.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    struct Bench {
        clock: Arc<ManualClock>,
        bank: Arc<ChannelBank>,
    }

    fn bench(start_us: u32) -> Bench {
        let clock = Arc::new(ManualClock::new(start_us));
        let bank = Arc::new(ChannelBank::new(clock.clone()));
        Bench { clock, bank }
    }

    fn immediate() -> CycleConfig {
        CycleConfig {
            publish: PublishPolicy::Immediate,
            ..CycleConfig::default()
        }
    }

    /// Drive a cycle with `steps`, then close the queue and collect what the sink rendered
    async fn run_through_dispatcher(
        bench: &Bench,
        config: CycleConfig,
        steps: impl FnOnce(&mut BenchCycle),
    ) -> Vec<MeasurementSnapshot> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink::new(&seen);

        let (sender, rx) = snapshot_channel(64);
        let dispatcher = Dispatcher::with_handles(vec![SinkHandle::spawn(sink, 64)], rx);
        let handle = dispatcher.spawn();

        let mut cycle = MeasurementCycle::new(Arc::clone(&bench.bank), sender, config);
        steps(&mut cycle);
        let published = cycle.sequence();
        drop(cycle);

        let metrics = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher did not drain")
            .unwrap();
        assert_eq!(metrics[0].1.coalesced_count, 0);
        assert_eq!(metrics[0].1.last_sequence, published);

        let snapshots = seen.lock().unwrap().clone();
        snapshots
    }

    fn fire(bench: &Bench, profile: ShutterProfile) {
        SimulatedShutter::new(profile)
            .unwrap()
            .fire_once(&bench.bank, &bench.clock);
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// A single 2.5 ms block on channel 2 reaches the sink as 2.5 ms / 1/400
    #[tokio::test]
    async fn test_single_channel_exposure() {
        let bench = bench(0);
        bench.bank.on_edge_at(ChannelId::Two, EdgeLevel::Blocked, 1_000);
        bench.bank.on_edge_at(ChannelId::Two, EdgeLevel::Clear, 3_500);

        let snapshots = run_through_dispatcher(&bench, immediate(), |cycle| {
            cycle.poll().unwrap();
            cycle.poll().unwrap();
        })
        .await;

        assert_eq!(snapshots.len(), 1);
        let snapshot = &snapshots[0];
        assert_eq!(snapshot.sequence, 1);
        assert!(snapshot.is_fresh(ChannelId::Two));
        let exposure = snapshot.exposure(ChannelId::Two).unwrap();
        assert_eq!(exposure.duration_us, 2_500);
        assert_close(exposure.duration_ms, 2.5);
        assert_close(exposure.reciprocal, 400.0);
        assert!(snapshot.exposure(ChannelId::One).is_none());
        assert!(snapshot.travel.is_none());
    }

    /// Curtain travel is the same whichever way the curtains cross the gate
    #[tokio::test]
    async fn test_travel_in_both_directions() {
        for direction in [TravelDirection::Forward, TravelDirection::Reverse] {
            let bench = bench(1_000);
            fire(
                &bench,
                ShutterProfile {
                    exposure_us: 2_500,
                    leading_travel_us: 300,
                    trailing_travel_us: 250,
                    direction,
                },
            );

            let snapshots = run_through_dispatcher(&bench, immediate(), |cycle| {
                cycle.poll().unwrap();
            })
            .await;

            assert_eq!(snapshots.len(), 1, "{direction:?}");
            let snapshot = &snapshots[0];
            let travel = snapshot.travel.expect("travel should be computed");
            assert!(snapshot.fresh.travel);
            assert_close(travel.leading_ms, 0.3);
            assert_close(travel.trailing_ms, 0.25);
            assert_eq!(snapshot.exposure(ChannelId::Two).unwrap().duration_us, 2_500);
            assert_eq!(snapshot.measured_channels().count(), 3);
        }
    }

    /// Debounced publishing waits for the idle threshold, then publishes once
    #[tokio::test]
    async fn test_debounced_publish() {
        let bench = bench(0);
        let config = CycleConfig {
            publish: PublishPolicy::Debounced { idle_threshold: 5 },
            ..CycleConfig::default()
        };
        bench.bank.on_edge_at(ChannelId::Two, EdgeLevel::Blocked, 100);
        bench.bank.on_edge_at(ChannelId::Two, EdgeLevel::Clear, 2_100);

        let snapshots = run_through_dispatcher(&bench, config, |cycle| {
            // Calculation iteration
            assert!(cycle.poll().unwrap().published.is_none());
            for idle in 1..5 {
                assert!(cycle.poll().unwrap().published.is_none(), "idle {idle}");
            }
            assert_eq!(cycle.poll().unwrap().published, Some(1));
            for _ in 0..20 {
                assert!(cycle.poll().unwrap().published.is_none());
            }
        })
        .await;

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].exposure(ChannelId::Two).unwrap().duration_us, 2_000);
    }

    /// Intervals straddling the 32-bit counter wrap are measured correctly
    #[tokio::test]
    async fn test_counter_wraparound() {
        let bench = bench(u32::MAX - 5_000);
        fire(
            &bench,
            ShutterProfile {
                exposure_us: 8_000,
                leading_travel_us: 6_000,
                trailing_travel_us: 6_000,
                direction: TravelDirection::Forward,
            },
        );
        assert!(bench.clock.now_us() < 10_000, "clock should have wrapped");

        let snapshots = run_through_dispatcher(&bench, immediate(), |cycle| {
            cycle.poll().unwrap();
        })
        .await;

        assert_eq!(snapshots.len(), 1);
        for channel in ChannelId::ALL {
            assert_eq!(snapshots[0].exposure(channel).unwrap().duration_us, 8_000);
        }
        let travel = snapshots[0].travel.unwrap();
        assert_close(travel.leading_ms, 6.0);
        assert_close(travel.trailing_ms, 6.0);
    }

    /// Degenerate intervals never reach a sink; earlier values are retained
    #[tokio::test]
    async fn test_rejected_interval_keeps_previous_value() {
        let bench = bench(0);
        bench.bank.on_edge_at(ChannelId::One, EdgeLevel::Blocked, 10);
        bench.bank.on_edge_at(ChannelId::One, EdgeLevel::Clear, 1_010);

        let snapshots = run_through_dispatcher(&bench, immediate(), |cycle| {
            cycle.poll().unwrap();
            // Zero-length interval
            bench.bank.on_edge_at(ChannelId::One, EdgeLevel::Blocked, 5_000);
            bench.bank.on_edge_at(ChannelId::One, EdgeLevel::Clear, 5_000);
            let report = cycle.poll().unwrap();
            assert_eq!(report.calculations, 0);
            assert_eq!(cycle.stats().intervals_rejected, 1);
        })
        .await;

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].exposure(ChannelId::One).unwrap().duration_us, 1_000);
    }

    /// Background shutter, busy-polling loop and dispatcher running together
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_simulated_shutter_run() {
        let bench = bench(0);
        let shutter = SimulatedShutter::new(ShutterProfile::default())
            .unwrap()
            .with_shots(3);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink::new(&seen);
        let (sender, rx) = snapshot_channel(64);
        let dispatcher_handle =
            Dispatcher::with_handles(vec![SinkHandle::spawn(sink, 64)], rx).spawn();

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let cycle_stop = Arc::clone(&stop);
        let mut cycle = MeasurementCycle::new(Arc::clone(&bench.bank), sender, immediate());
        let cycle_task = tokio::task::spawn_blocking(move || cycle.run(&cycle_stop));

        let shooter = shutter
            .start(
                Arc::clone(&bench.bank),
                Arc::clone(&bench.clock),
                Duration::from_millis(20),
            )
            .unwrap();
        let shots = tokio::task::spawn_blocking(move || shooter.join().unwrap())
            .await
            .unwrap();
        assert_eq!(shots, 3);

        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        let stats = cycle_task.await.unwrap().unwrap();
        assert_eq!(stats.intervals_accepted, 9);
        assert_eq!(stats.travel_computed, 3);

        tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();

        let seen = seen.lock().unwrap();
        // Every accepted value reached the sink exactly once as fresh
        for channel in ChannelId::ALL {
            let fresh: Vec<_> = seen
                .iter()
                .filter(|s| s.is_fresh(channel))
                .map(|s| s.exposure(channel).unwrap().duration_us)
                .collect();
            assert_eq!(fresh, vec![8_000; 3], "{channel}");
        }
        assert_eq!(seen.iter().filter(|s| s.fresh.travel).count(), 3);

        let last = seen.last().unwrap();
        assert_eq!(last.sequence, stats.snapshots_published);
        let travel = last.travel.unwrap();
        assert_close(travel.leading_ms, 6.0);
        assert_close(travel.trailing_ms, 6.0);
    }

    /// A sink slower than the measurement rate still ends on the latest reading
    #[tokio::test]
    async fn test_slow_sink_renders_latest_measurement() {
        let bench = bench(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sink = RecordingSink::new(&seen);
        sink.render_delay = Duration::from_millis(50);

        let (sender, rx) = snapshot_channel(64);
        let handle = Dispatcher::with_handles(vec![SinkHandle::spawn(sink, 1)], rx).spawn();

        let mut cycle = MeasurementCycle::new(Arc::clone(&bench.bank), sender, immediate());
        for i in 1..=5u32 {
            let start_us = i * 100_000;
            bench.bank.on_edge_at(ChannelId::Two, EdgeLevel::Blocked, start_us);
            bench
                .bank
                .on_edge_at(ChannelId::Two, EdgeLevel::Clear, start_us + i * 1_000);
            assert_eq!(cycle.poll().unwrap().published, Some(i as u64));
        }
        drop(cycle);

        let metrics = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher did not drain")
            .unwrap();
        let sink_metrics = metrics[0].1;
        assert_eq!(sink_metrics.last_sequence, 5);
        assert_eq!(
            sink_metrics.render_count + sink_metrics.coalesced_count,
            5,
            "every snapshot is either rendered or folded into a newer one"
        );

        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last.sequence, 5);
        assert!(last.is_fresh(ChannelId::Two));
        assert_eq!(last.exposure(ChannelId::Two).unwrap().duration_us, 5_000);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;
    use std::sync::Arc;

    use config_loader::ConfigLoader;
    use contracts::{ChannelId, LinePolarity};
    use dispatcher::{create_dispatcher, snapshot_channel};
    use edge_capture::{ChannelBank, ManualClock};
    use measurement::MeasurementCycle;

    /// Config file -> cycle -> json_lines sink writing to a file
    #[tokio::test]
    async fn test_config_file_to_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.jsonl");
        let config_path = dir.path().join("bench.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
[channels]
polarity = "blocked_high"

[publish]
policy = "immediate"

[[sinks]]
name = "results"
sink_type = "json_lines"
params = {{ target = "file", path = "{}" }}
"#,
            output.display()
        )
        .unwrap();
        drop(file);

        let blueprint = ConfigLoader::load_from_path(&config_path).unwrap();
        assert_eq!(blueprint.channels.polarity, LinePolarity::BlockedHigh);

        let clock = Arc::new(ManualClock::new(0));
        let bank = Arc::new(ChannelBank::with_polarity(
            clock.clone(),
            blueprint.channels.polarity,
        ));

        let (sender, rx) = snapshot_channel(8);
        let handle = create_dispatcher(blueprint.sinks.clone(), rx)
            .unwrap()
            .spawn();
        let mut cycle = MeasurementCycle::new(Arc::clone(&bank), sender, blueprint.to_cycle_config());

        // Blocked-high wiring: rising line starts the interval
        clock.set(2_000);
        bank.on_line_change(ChannelId::Three, true);
        clock.set(6_000);
        bank.on_line_change(ChannelId::Three, false);
        assert_eq!(cycle.poll().unwrap().published, Some(1));
        drop(cycle);

        handle.await.unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["sequence"], 1);
        assert_eq!(value["exposures"][2]["duration_us"], 4_000);
        assert_eq!(value["exposures"][2]["reciprocal"], 250.0);
        assert!(value["exposures"][0].is_null());
    }
}
