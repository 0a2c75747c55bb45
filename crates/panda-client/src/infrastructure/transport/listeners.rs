//! Per-handle listener list.
//!
//! Mirrors the DOM `EventTarget` rules for the `message` event:
//!
//! - Listeners run in the order they were attached.
//! - A listener removed while an event is being dispatched is not invoked for
//!   that event if it had not run yet.
//! - A listener added during dispatch first sees the *next* event.
//!
//! Every dispatch runs inside a [`Dispatcher`] turn.  The listener vector is
//! only locked long enough to copy an entry out, so handlers are free to
//! attach or detach listeners (on this or any other handle) while running.

use parking_lot::Mutex;
use panda_core::MessageEvent;

use super::{ListenerId, MessageHandler};
use crate::infrastructure::dispatch::Dispatcher;

/// Ordered set of message listeners belonging to one transport handle.
pub struct ListenerSet {
    dispatcher: Dispatcher,
    entries: Mutex<Vec<(ListenerId, MessageHandler)>>,
}

impl ListenerSet {
    /// Creates an empty set whose dispatches run inside turns of `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Appends a listener and returns its removal token.
    pub fn add(&self, handler: MessageHandler) -> ListenerId {
        let id = ListenerId::next();
        self.entries.lock().push((id, handler));
        id
    }

    /// Removes the listener with `id`.  Returns `false` if it is not present.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of attached listeners.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every attached listener.
    ///
    /// Returns how many listeners were invoked.
    pub fn dispatch(&self, event: &MessageEvent) -> usize {
        let _turn = self.dispatcher.enter();

        let ids: Vec<ListenerId> = self.entries.lock().iter().map(|(id, _)| *id).collect();
        let mut invoked = 0;
        for id in ids {
            // Re-check membership: an earlier listener may have detached this one.
            let handler = self
                .entries
                .lock()
                .iter()
                .find(|(entry_id, _)| *entry_id == id)
                .map(|(_, handler)| MessageHandler::clone(handler));
            if let Some(handler) = handler {
                handler(event);
                invoked += 1;
            }
        }
        invoked
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
