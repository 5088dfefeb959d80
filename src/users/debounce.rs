use std::time::{Duration, Instant};

/// Holds the latest value until it has been quiet for `delay`.
///
/// There is no background timer: the owner calls [`Debouncer::poll`] from its
/// event loop, so a pending value dies with its owner and can never be
/// delivered after it is gone.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value once its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Take the pending value immediately, ignoring the deadline
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
