//! Handoff primitives shared by the stage workers of one conversation turn.
//!
//! * [`Signal`]: a resettable level-triggered flag with async waiters.
//! * [`Mailbox`]: single-slot, last-write-wins handoff for one value.
//! * [`BatchQueue`]: unbounded FIFO handoff plus an edge-triggered
//!   "batch complete" marker.
//!
//! Both [`Mailbox`] and [`BatchQueue`] deliver a [`Delivery`], which is either
//! a real value or the [`Delivery::Interrupted`] sentinel pushed during
//! cancellation so that a suspended consumer wakes up instead of hanging.
//!
//! All `async` methods here are cancel safe: dropping the future before it
//! completes never loses a value or consumes a completion marker.

pub mod batch;
pub mod mailbox;
pub mod signal;

pub use batch::BatchQueue;
pub use mailbox::Mailbox;
pub use signal::Signal;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// What a consumer receives from a [`Mailbox`] or [`BatchQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T> {
    /// A value written by the producer.
    Value(T),
    /// Cancellation sentinel: the turn is being torn down.
    Interrupted,
}

impl<T> Delivery<T> {
    /// Returns the carried value, or `None` for the sentinel.
    pub fn into_value(self) -> Option<T> {
        match self {
            Delivery::Value(v) => Some(v),
            Delivery::Interrupted => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Delivery::Interrupted)
    }
}

// ---------------------------------------------------------------------------
// HandoffError
// ---------------------------------------------------------------------------

/// Errors reported while tearing a primitive down.
///
/// The primitives themselves never fail on the hot path; a poisoned lock is
/// recovered transparently there.  `reset` still clears the state but reports
/// the poisoning so the controller's cleanup can log it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandoffError {
    #[error("{primitive}: lock was poisoned by a panicking holder")]
    Poisoned { primitive: &'static str },
}

/// Lock `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock `mutex` for a reset, recovering the guard but reporting poisoning.
pub(crate) fn lock_for_reset<'a, T>(
    mutex: &'a Mutex<T>,
    primitive: &'static str,
) -> (MutexGuard<'a, T>, Result<(), HandoffError>) {
    match mutex.lock() {
        Ok(guard) => (guard, Ok(())),
        Err(poisoned) => (
            poisoned.into_inner(),
            Err(HandoffError::Poisoned { primitive }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_into_value() {
        assert_eq!(Delivery::Value(3).into_value(), Some(3));
        assert_eq!(Delivery::<i32>::Interrupted.into_value(), None);
        assert!(Delivery::<i32>::Interrupted.is_interrupted());
        assert!(!Delivery::Value(1).is_interrupted());
    }

    #[test]
    fn lock_for_reset_reports_poisoning() {
        let m = std::sync::Arc::new(Mutex::new(5));
        let m2 = std::sync::Arc::clone(&m);
        let _ = std::thread::spawn(move || {
            let _guard = m2.lock().unwrap();
            panic!("poison");
        })
        .join();

        let (mut guard, status) = lock_for_reset(&m, "test");
        *guard = 0;
        assert_eq!(status, Err(HandoffError::Poisoned { primitive: "test" }));
        drop(guard);
        assert_eq!(*lock_recover(&m), 0);
    }
}
