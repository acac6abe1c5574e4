//! Single-slot, last-write-wins handoff.
//!
//! A [`Mailbox`] holds at most one unread [`Delivery`].  A producer that
//! writes while a previous value is still unread overwrites it; there is no
//! queuing and no back-pressure.  A consumer suspends in
//! [`get`](Mailbox::get) until something is written, takes it, and suspends
//! again on the next call.
//!
//! # Example
//!
//! ```rust
//! use voice_chat::handoff::{Delivery, Mailbox};
//!
//! # tokio_test_block_on(async {
//! let mailbox = Mailbox::new("text");
//! mailbox.set("first".to_string());
//! mailbox.set("second".to_string()); // overwrites the unread "first"
//! assert_eq!(mailbox.get().await, Delivery::Value("second".to_string()));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::Mutex;

use tokio::sync::Notify;

use super::{lock_for_reset, lock_recover, Delivery, HandoffError};

pub struct Mailbox<T> {
    name: &'static str,
    slot: Mutex<Option<Delivery<T>>>,
    ready: Notify,
}

impl<T> Mailbox<T> {
    /// Create an empty mailbox.  `name` only appears in logs and errors.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
            ready: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store `value` and wake one pending [`get`](Self::get).
    pub fn set(&self, value: T) {
        self.store(Delivery::Value(value));
    }

    /// Store the cancellation sentinel and wake one pending getter.
    ///
    /// Overwrites any unread value: a turn being cancelled has no use for it.
    pub fn interrupt(&self) {
        self.store(Delivery::Interrupted);
    }

    /// Suspend until a delivery is ready, then take it.
    pub async fn get(&self) -> Delivery<T> {
        loop {
            if let Some(delivery) = self.take() {
                return delivery;
            }
            // `notify_one` leaves a permit when nobody is waiting yet, so a
            // `set` racing this await is never missed.
            self.ready.notified().await;
        }
    }

    /// Take the pending delivery without suspending.
    pub fn try_get(&self) -> Option<Delivery<T>> {
        self.take()
    }

    /// `true` while an unread delivery is held.
    pub fn is_ready(&self) -> bool {
        lock_recover(&self.slot).is_some()
    }

    /// Drop any unread delivery.  Pending getters are not woken.
    ///
    /// Only call this during teardown, never while a consumer is legitimately
    /// waiting for live data.
    pub fn reset(&self) -> Result<(), HandoffError> {
        let (mut slot, status) = lock_for_reset(&self.slot, self.name);
        *slot = None;
        status
    }

    fn store(&self, delivery: Delivery<T>) {
        *lock_recover(&self.slot) = Some(delivery);
        self.ready.notify_one();
    }

    fn take(&self) -> Option<Delivery<T>> {
        lock_recover(&self.slot).take()
    }

    #[cfg(test)]
    pub(crate) fn lock_slot_for_test(&self) -> std::sync::MutexGuard<'_, Option<Delivery<T>>> {
        lock_recover(&self.slot)
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("ready", &self.is_ready())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
