//! Publish throttling.

use contracts::PublishPolicy;

/// Decides on which poll iteration a snapshot is handed to the sinks
#[derive(Debug, Clone)]
pub struct Throttle {
    policy: PublishPolicy,
    /// Idle iterations since the last calculation, `None` when not counting
    idle: Option<u32>,
}

impl Throttle {
    pub fn new(policy: PublishPolicy) -> Self {
        Self { policy, idle: None }
    }

    /// Advance one poll iteration; returns whether to publish now
    ///
    /// `calculated` is whether this iteration produced a new value.
    pub fn tick(&mut self, calculated: bool) -> bool {
        match self.policy {
            PublishPolicy::Immediate => calculated,
            PublishPolicy::Debounced { idle_threshold } => {
                if calculated {
                    self.idle = Some(0);
                }
                match self.idle {
                    Some(n) if n == idle_threshold => {
                        self.idle = None;
                        true
                    }
                    Some(n) => {
                        self.idle = Some(n + 1);
                        false
                    }
                    None => false,
                }
            }
        }
    }

    /// Stop counting, e.g. after a publish forced from outside
    pub fn cancel(&mut self) {
        self.idle = None;
    }

    /// Whether a debounced publish is scheduled
    pub fn is_counting(&self) -> bool {
        self.idle.is_some()
    }
}
