//! Monotonic port allocation for sequential test cases.

use crate::FixtureError;

/// Base port used by [`PortAllocator::default`].
pub const DEFAULT_BASE_PORT: u16 = 9000;

/// Hands out strictly increasing ports above a base.
///
/// The base itself is never returned: a base of `9000` yields `9001`,
/// `9002`, and so on.
///
/// ```
/// use marathon_testing::PortAllocator;
///
/// let mut ports = PortAllocator::new(9000);
/// assert_eq!(ports.allocate().unwrap(), 9001);
/// assert_eq!(ports.allocate().unwrap(), 9002);
/// ```
#[derive(Debug, Clone)]
pub struct PortAllocator {
    last: u16,
}

impl PortAllocator {
    /// Create an allocator whose first port is `base + 1`.
    #[must_use]
    pub const fn new(base: u16) -> Self { Self { last: base } }

    /// Return the next port.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::PortsExhausted`] once `u16::MAX` has been
    /// handed out. The allocator never wraps around.
    pub fn allocate(&mut self) -> Result<u16, FixtureError> {
        let next = self
            .last
            .checked_add(1)
            .ok_or(FixtureError::PortsExhausted { last: self.last })?;
        self.last = next;
        Ok(next)
    }

    /// The most recently allocated port, or the base if none was allocated.
    #[must_use]
    pub const fn last(&self) -> u16 { self.last }
}

impl Default for PortAllocator {
    fn default() -> Self { Self::new(DEFAULT_BASE_PORT) }
}
