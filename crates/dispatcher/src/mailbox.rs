//! Coalescing per-sink mailbox
//!
//! A bounded FIFO of snapshots. When it is full the incoming snapshot is
//! folded into the newest queued one instead of being dropped: snapshots
//! carry the latest value of every channel, so the newer snapshot replaces
//! the queued values and the two fresh masks are merged.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::MeasurementSnapshot;
use tokio::sync::Notify;

/// What happened to an offered snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Appended to the queue
    Queued,
    /// Folded into the newest queued snapshot
    Coalesced {
        /// Sequence number of the snapshot that was replaced
        superseded: u64,
    },
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<MeasurementSnapshot>,
    closed: bool,
}

/// Single-producer, single-consumer snapshot mailbox
#[derive(Debug)]
pub struct Mailbox {
    state: Mutex<State>,
    ready: Notify,
    capacity: usize,
}

impl Mailbox {
    /// A capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a snapshot, coalescing into the newest one when full
    pub fn offer(&self, snapshot: MeasurementSnapshot) -> Delivery {
        let delivery = {
            let mut state = self.lock();
            if state.queue.len() < self.capacity {
                state.queue.push_back(snapshot);
                Delivery::Queued
            } else if let Some(newest) = state.queue.pop_back() {
                let mut fresh = newest.fresh;
                fresh.merge(snapshot.fresh);
                state.queue.push_back(MeasurementSnapshot { fresh, ..snapshot });
                Delivery::Coalesced {
                    superseded: newest.sequence,
                }
            } else {
                state.queue.push_back(snapshot);
                Delivery::Queued
            }
        };
        self.ready.notify_one();
        delivery
    }

    /// Next snapshot in order; `None` once closed and empty
    pub async fn next(&self) -> Option<MeasurementSnapshot> {
        loop {
            {
                let mut state = self.lock();
                if let Some(snapshot) = state.queue.pop_front() {
                    return Some(snapshot);
                }
                if state.closed {
                    return None;
                }
            }
            self.ready.notified().await;
        }
    }

    /// Let the consumer finish once the queue is empty
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChannelId, Exposure, FreshMask};
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot(sequence: u64, channel: ChannelId, duration_us: u32) -> MeasurementSnapshot {
        let mut exposures = [None; 3];
        exposures[channel.index()] = Some(Exposure::from_micros(duration_us));
        let mut fresh = FreshMask::default();
        fresh.mark_exposure(channel);
        MeasurementSnapshot {
            sequence,
            exposures,
            travel: None,
            fresh,
        }
    }

    #[tokio::test]
    async fn test_fifo_below_capacity() {
        let mailbox = Mailbox::new(4);
        for sequence in 1..=3 {
            assert_eq!(
                mailbox.offer(snapshot(sequence, ChannelId::Two, 1_000)),
                Delivery::Queued
            );
        }
        mailbox.close();

        let mut order = Vec::new();
        while let Some(s) = mailbox.next().await {
            order.push(s.sequence);
        }
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_full_mailbox_keeps_newest_values_and_merges_fresh() {
        let mailbox = Mailbox::new(1);
        mailbox.offer(snapshot(1, ChannelId::One, 1_000));
        assert_eq!(
            mailbox.offer(snapshot(2, ChannelId::Three, 3_000)),
            Delivery::Coalesced { superseded: 1 }
        );
        mailbox.close();

        let merged = mailbox.next().await.unwrap();
        assert_eq!(merged.sequence, 2);
        assert_eq!(merged.exposure(ChannelId::Three).unwrap().duration_us, 3_000);
        assert!(merged.is_fresh(ChannelId::One));
        assert!(merged.is_fresh(ChannelId::Three));
        assert!(!merged.is_fresh(ChannelId::Two));
        assert!(mailbox.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_drains_queue_first() {
        let mailbox = Mailbox::new(2);
        mailbox.offer(snapshot(1, ChannelId::Two, 1_000));
        mailbox.close();
        assert_eq!(mailbox.next().await.map(|s| s.sequence), Some(1));
        assert!(mailbox.next().await.is_none());
    }

    #[tokio::test]
    async fn test_waiting_consumer_is_woken() {
        let mailbox = Arc::new(Mailbox::new(1));
        let consumer = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move { mailbox.next().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        mailbox.offer(snapshot(7, ChannelId::Two, 2_000));

        let received = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.map(|s| s.sequence), Some(7));
    }
}
