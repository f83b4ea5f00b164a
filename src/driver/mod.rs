use std::time::Duration;

pub mod silabs;

/// Blocking delay backed by `std::thread::sleep`, for drivers running on
/// their own thread.
pub struct ThreadDelay;

impl embedded_hal::blocking::delay::DelayMs<u32> for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64))
    }
}
