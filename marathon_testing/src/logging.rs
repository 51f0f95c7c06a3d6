//! Exclusive capture of `log` records for assertions.
//!
//! `tracing` events reach `log` through its `log-always` feature, so request
//! logs emitted by the application are visible here.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use log::Level;
use logtest::Logger;
use rstest::fixture;

/// Handle to the process-wide log capture.
///
/// Holding the handle serialises access so concurrent tests do not drain
/// each other's records. Tests using it should also be marked `#[serial]`
/// since any test may emit records while the handle is held elsewhere.
pub struct LogCapture {
    guard: MutexGuard<'static, Logger>,
}

impl LogCapture {
    /// Acquire the global capture, discarding records left by earlier tests.
    #[must_use]
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let guard = logger.lock().unwrap_or_else(PoisonError::into_inner);

        let mut capture = Self { guard };
        capture.clear();
        capture
    }

    /// Discard every record captured so far.
    pub fn clear(&mut self) { while self.guard.pop().is_some() {} }

    /// Drain records until one at `level` contains `needle`, returning its
    /// message.
    pub fn find(&mut self, level: Level, needle: &str) -> Option<String> {
        while let Some(record) = self.guard.pop() {
            if record.level() == level && record.args().contains(needle) {
                return Some(record.args().to_owned());
            }
        }
        None
    }
}

impl Default for LogCapture {
    fn default() -> Self { Self::new() }
}

impl std::ops::Deref for LogCapture {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LogCapture {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

/// Fixture yielding an emptied [`LogCapture`].
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LogCapture { LogCapture::new() }
