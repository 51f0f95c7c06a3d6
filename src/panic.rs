//! Panic capture for request handlers.
//!
//! A handler that panics must not take its connection task down with it.
//! [`catch_panic`] runs a future to completion and turns an unwinding panic
//! into a displayable [`PanicMessage`] instead.

use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;

/// Panic payload rendered for logs.
///
/// String payloads (the `panic!("...")` case) print verbatim; anything else
/// falls back to its `Debug` form.
///
/// ```
/// use marathon::panic::PanicMessage;
///
/// assert_eq!(PanicMessage::from_payload(Box::new("boom")).to_string(), "boom");
/// assert!(
///     PanicMessage::from_payload(Box::new(5_u32))
///         .to_string()
///         .contains("Any")
/// );
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// Wrap a payload obtained from `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self { Self(payload) }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Await `fut`, converting a panic into [`PanicMessage`].
///
/// # Errors
///
/// Returns the panic payload if `fut` panicked while being polled.
pub async fn catch_panic<F>(fut: F) -> Result<F::Output, PanicMessage>
where
    F: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(PanicMessage::from_payload)
}
