//! Periodic action bookkeeping: the built-in keep-alive ping, user-registered periodic actions,
//! and peer-liveness tracking via an unanswered-ping counter.
//!
//! The registered periodic actions are a single authoritative set, independent of the in-flight
//! [`crate::registry::ActionRegistry`]. Reconnection re-seeds the registry and re-arms the
//! client's intervals from this set, rather than snapshotting state out of the registry itself.

use std::time::Duration;

use crate::callback::{BoxedCallback, SharedCallback};
use crate::packet::Packet;
use crate::registry::ping_liveness_exceeded;

/// One periodic action the scheduler resubmits every `delay`, including after reconnect.
pub struct PeriodicAction {
    pub template: Packet,
    pub callback: Option<SharedCallback>,
    pub delay: Duration,
    /// True for the built-in keep-alive ping, which is excluded from the "idle auto-close" check:
    /// it's infrastructure, not user-requested work.
    pub is_ping: bool,
}

impl PeriodicAction {
    /// A fresh copy of the template packet (no `ActionID` yet, the registry assigns one) and a
    /// fresh callback handle sharing state with every other tick of this same periodic action.
    #[must_use]
    pub fn tick(&self) -> (Packet, Option<BoxedCallback>) {
        (
            self.template.clone(),
            self.callback.as_ref().map(SharedCallback::handle),
        )
    }
}

/// Owns the registered periodic actions (including the built-in ping) and the outstanding-ping
/// liveness counter used to detect a dead peer.
#[derive(Default)]
pub struct Scheduler {
    periodic: Vec<PeriodicAction>,
    outstanding_pings: u32,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user periodic action, wrapping its callback so every tick shares one instance.
    /// Returns the index to arm (see `Client::arm_periodic`).
    pub fn register(&mut self, template: Packet, callback: Option<BoxedCallback>, delay: Duration) -> usize {
        self.periodic.push(PeriodicAction {
            template,
            callback: callback.map(SharedCallback::new),
            delay,
            is_ping: false,
        });
        self.periodic.len() - 1
    }

    /// Registers the built-in keep-alive ping. The caller is expected to check
    /// `ClientConfig::ping_enabled` before calling this.
    pub fn register_ping(&mut self, delay: Duration) -> usize {
        self.periodic.push(PeriodicAction {
            template: Packet::action("Ping"),
            callback: None,
            delay,
            is_ping: true,
        });
        self.periodic.len() - 1
    }

    #[must_use]
    pub fn periodic_actions(&self) -> &[PeriodicAction] {
        &self.periodic
    }

    /// True once every registered periodic action is the built-in ping: no *user* periodic work
    /// remains, the condition the idle auto-close rule actually cares about.
    #[must_use]
    pub fn user_periodic_is_empty(&self) -> bool {
        self.periodic.iter().all(|pa| pa.is_ping)
    }

    /// Call once per ping actually written to the wire.
    pub fn note_ping_sent(&mut self) {
        self.outstanding_pings += 1;
    }

    /// Call on every packet received from the peer: any traffic at all is evidence of liveness,
    /// not just a `Ping` reply specifically.
    pub fn note_packet_received(&mut self) {
        self.outstanding_pings = 0;
    }

    #[must_use]
    pub fn peer_is_dead(&self) -> bool {
        ping_liveness_exceeded(self.outstanding_pings)
    }
}
