//! Clock trait - monotonic microsecond counter

/// Free-running microsecond counter.
///
/// The counter is unsigned and wraps at `u32::MAX + 1`. Implementations must
/// be callable from edge (interrupt) context with short, bounded latency:
/// no locking, no allocation.
pub trait Clock: Send + Sync {
    /// Current counter value in microseconds
    fn now_us(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    #[inline]
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}
