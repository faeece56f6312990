//! Classifies a decoded packet and produces the callback futures it triggers.
//!
//! Mirrors the match block the house server's `StreamHandler` impl uses to route an incoming
//! frame (`src/client.rs`), but the AMI client only has three cases instead of a full command set:
//! shutdown notice, a known `ActionID`, or an event subscription match. The caller (the `Client`
//! actor) is responsible for `ctx.spawn`-ing the returned futures so that a user callback never
//! blocks the read loop.

use futures::future::BoxFuture;

use crate::packet::Packet;
use crate::registry::{ActionRegistry, Resolution};
use crate::subscription::SubscriptionSet;

/// What the `Client` actor should do with a packet once dispatch has classified it.
pub enum Outcome {
    /// `Event: Shutdown` was observed; the connection should be treated as lost.
    Shutdown,
    /// Zero or more callback futures to spawn, and whether the matched action entry was just
    /// removed from the registry (used by the idle auto-close check).
    Callbacks {
        futures: Vec<BoxFuture<'static, ()>>,
        action_removed: bool,
    },
}

/// Classifies `packet` as a shutdown notice, an action response, or an event, and gathers the
/// futures its matching callbacks produce.
pub fn dispatch(
    packet: Packet,
    registry: &mut ActionRegistry,
    subscriptions: &mut SubscriptionSet,
) -> Outcome {
    if packet.has_value("Event", "Shutdown") {
        return Outcome::Shutdown;
    }

    if packet.contains("ActionID") {
        match registry.resolve(&packet) {
            Resolution::Matched { callback, removed } => {
                return Outcome::Callbacks {
                    futures: callback.into_iter().collect(),
                    action_removed: removed,
                };
            }
            Resolution::Unmatched => {}
        }
    }

    let futures = subscriptions
        .matching(&packet)
        .map(|sub| sub.callback_mut().call(packet.clone()))
        .collect();

    Outcome::Callbacks {
        futures,
        action_removed: false,
    }
}
