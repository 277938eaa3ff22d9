use crate::api::Time;

/// Holds back a value until no newer one was scheduled for `delay`.
///
/// Time is passed in by the caller's event loop rather than read from a clock, so the only
/// thing cancelling does is forget the scheduled value.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: chrono::Duration,
    pending: Option<(T, Time)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: chrono::Duration) -> Debouncer<T> {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the delay. A deadline past the last
    /// representable time is clamped to it.
    pub fn schedule(&mut self, value: T, now: Time) {
        let deadline = now
            .checked_add_signed(self.delay)
            .unwrap_or(Time::MAX_UTC);
        self.pending = Some((value, deadline));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    pub fn deadline(&self) -> Option<Time> {
        self.pending.as_ref().map(|(_, d)| *d)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the pending value if its delay elapsed at `now`
    pub fn poll(&mut self, now: Time) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.cancel(),
            _ => None,
        }
    }
}
