use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// Blocking delay used between bus transactions.
///
/// Drivers never call [sleep] directly, so tests can swap in a recording implementation
/// (see [crate::mock::MockDelay]) and run without waiting.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// Delay backed by [std::thread::sleep].
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        sleep(duration);
    }
}
