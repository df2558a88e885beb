use embassy_time::{Duration, Instant};

/// Time source for retry timing
pub trait Clock {
    /// Monotonic current time
    fn now(&self) -> Instant;

    /// Short busy wait between iterations of a blocking flush
    fn pause(&mut self);
}

/// Clock backed by the embassy time driver
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn pause(&mut self) {
        embassy_time::block_for(Duration::from_millis(1));
    }
}
