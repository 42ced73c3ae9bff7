use std::hint;
use std::time::{Duration, Instant};

use embedded_hal::blocking::delay::DelayUs;

/// Busy-waits against the monotonic clock. Never returns early.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl SpinDelay {
    pub fn new() -> Self {
        SpinDelay
    }

    pub fn spin(&mut self, period: Duration) {
        let start = Instant::now();
        while start.elapsed() < period {
            hint::spin_loop();
        }
    }
}

impl DelayUs<u32> for SpinDelay {
    fn delay_us(&mut self, us: u32) {
        self.spin(Duration::from_micros(us as u64));
    }
}

impl DelayUs<u16> for SpinDelay {
    fn delay_us(&mut self, us: u16) {
        self.spin(Duration::from_micros(us as u64));
    }
}
