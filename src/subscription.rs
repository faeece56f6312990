//! Event subscriptions: `(pattern, callback)` pairs matched against a packet's `Event` header.

use crate::callback::BoxedCallback;
use crate::packet::Packet;

const WILDCARD: &str = "*";

/// One registered event subscription. Matching is against the `Event` header only, not against
/// any other header a caller's pattern might happen to collide with.
pub struct Subscription {
    pattern: String,
    callback: BoxedCallback,
}

impl Subscription {
    #[must_use]
    pub fn new(pattern: impl Into<String>, callback: BoxedCallback) -> Self {
        Self {
            pattern: pattern.into(),
            callback,
        }
    }

    #[must_use]
    pub fn matches(&self, packet: &Packet) -> bool {
        if self.pattern == WILDCARD {
            return true;
        }
        packet.get_str("Event") == Some(self.pattern.as_str())
    }

    pub fn callback_mut(&mut self) -> &mut BoxedCallback {
        &mut self.callback
    }
}

/// An ordered collection of [`Subscription`]s. Duplicates (same pattern registered twice) are
/// permitted; all matching subscriptions fire, in registration order.
#[derive(Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: impl Into<String>, callback: BoxedCallback) {
        self.subscriptions.push(Subscription::new(pattern, callback));
    }

    /// All subscriptions whose pattern matches `packet`'s `Event` header, in registration order.
    pub fn matching(&mut self, packet: &Packet) -> impl Iterator<Item = &mut Subscription> {
        self.subscriptions
            .iter_mut()
            .filter(|sub| sub.matches(packet))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callback::Immediate;

    fn packet_with_event(event: &str) -> Packet {
        let mut packet = Packet::new();
        packet.insert("Event", event);
        packet
    }

    #[test]
    fn wildcard_matches_any_event() {
        let sub = Subscription::new("*", Box::new(Immediate::new(|_: Packet| {})));
        assert!(sub.matches(&packet_with_event("PeerStatus")));
    }

    #[test]
    fn specific_pattern_matches_only_its_event() {
        let sub = Subscription::new("PeerStatus", Box::new(Immediate::new(|_: Packet| {})));
        assert!(sub.matches(&packet_with_event("PeerStatus")));
        assert!(!sub.matches(&packet_with_event("Newchannel")));
    }

    #[test]
    fn pattern_never_matches_against_unrelated_header_values() {
        // "Event" header is absent but some other header happens to share the pattern's value.
        let sub = Subscription::new("PeerStatus", Box::new(Immediate::new(|_: Packet| {})));
        let mut packet = Packet::new();
        packet.insert("Message", "PeerStatus");

        assert!(!sub.matches(&packet));
    }

    #[test]
    fn duplicate_patterns_both_fire() {
        let mut set = SubscriptionSet::new();
        set.register("PeerStatus", Box::new(Immediate::new(|_: Packet| {})));
        set.register("PeerStatus", Box::new(Immediate::new(|_: Packet| {})));

        let matched: Vec<_> = set.matching(&packet_with_event("PeerStatus")).collect();
        assert_eq!(matched.len(), 2);
    }
}
