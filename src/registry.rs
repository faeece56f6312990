//! Tracks in-flight actions by `ActionID` and decides, per incoming packet, whether the action is
//! still awaiting more responses.

use std::collections::HashMap;

use futures::future::BoxFuture;

use crate::action::ActionEntry;
use crate::callback::BoxedCallback;
use crate::id_generator::IdGenerator;
use crate::packet::Packet;
use std::time::Duration;

const TERMINAL_RESPONSES: &[&str] = &["Success", "Error", "Fail", "Failure"];
const PING_LIVENESS_THRESHOLD: u32 = 3;

/// What the dispatcher should do with an incoming packet once [`ActionRegistry::resolve`] has
/// classified it.
pub enum Resolution {
    /// The packet's `ActionID` matched a live entry; `callback` is the future its callback (if
    /// any) produced for this packet, already detached from the entry's borrow. `removed` is true
    /// if the entry was just purged (terminal response, non-periodic).
    Matched {
        callback: Option<BoxFuture<'static, ()>>,
        removed: bool,
    },
    /// No live entry had this `ActionID` (or the packet carried none).
    Unmatched,
}

/// Maps `ActionID -> ActionEntry` for every action still awaiting a terminal response.
#[derive(Default)]
pub struct ActionRegistry {
    entries: HashMap<String, ActionEntry>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an `ActionID` via `ids` if `packet` doesn't already carry one, stores the entry,
    /// and returns the outbound packet (with its `ActionID` set) ready for the transport to write.
    pub fn submit(
        &mut self,
        ids: &IdGenerator,
        mut packet: Packet,
        callback: Option<BoxedCallback>,
        periodic: Option<Duration>,
    ) -> Packet {
        let action_id = packet
            .get_str("ActionID")
            .map(String::from)
            .unwrap_or_else(|| ids.next());
        packet.insert("ActionID", action_id.clone());

        self.entries
            .insert(action_id, ActionEntry::new(packet.clone(), callback, periodic));

        packet
    }

    /// Classifies an incoming packet against the live entries and updates `wait_next`/removes the
    /// entry as appropriate.
    pub fn resolve(&mut self, packet: &Packet) -> Resolution {
        let Some(action_id) = packet.get_str("ActionID") else {
            return Resolution::Unmatched;
        };

        let Some(entry) = self.entries.get_mut(action_id) else {
            return Resolution::Unmatched;
        };

        let wait_next = classify(packet);
        entry.wait_next = wait_next;
        let removed = !wait_next && entry.periodic.is_none();
        let callback = entry.callback.as_mut().map(|cb| cb.call(packet.clone()));

        if removed {
            let action_id = action_id.to_string();
            self.entries.remove(&action_id);
        }

        Resolution::Matched { callback, removed }
    }

    /// Removes every non-periodic entry, e.g. on connection loss. Periodic entries survive so the
    /// scheduler can resubmit them after reconnect.
    pub fn clear_non_periodic(&mut self) {
        self.entries.retain(|_, entry| entry.periodic.is_some());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Returns the entry's new `wait_next` per the AMI response/event-list rules.
fn classify(packet: &Packet) -> bool {
    let queued_async = packet
        .get_str("Message")
        .is_some_and(|m| m.ends_with("successfully queued"))
        && packet.has_value("Async", "true");
    if queued_async || packet.has_value("EventList", "start") {
        return true;
    }

    if let Some(response) = packet.get_str("Response") {
        if TERMINAL_RESPONSES.contains(&response) {
            return false;
        }
    }

    if packet.get_str("Event").is_some_and(|e| e.ends_with("Complete")) {
        return false;
    }

    // Ambiguous packet (e.g. an interim event with neither a terminal Response nor a Complete
    // Event): keep waiting, the safe default for a long-running query.
    true
}

#[must_use]
pub fn ping_liveness_exceeded(outstanding: u32) -> bool {
    outstanding > PING_LIVENESS_THRESHOLD
}
