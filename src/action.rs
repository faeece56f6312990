//! User-submitted actions and their repeat policy.

use std::time::Duration;

use crate::callback::BoxedCallback;
use crate::packet::Packet;

/// How an action should be resubmitted after its first send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Sent once.
    None,
    /// Resent every `delay`, with a fresh `ActionID` each time, until the connection is lost.
    Periodic(Duration),
}

impl Repeat {
    #[must_use]
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Periodic(_))
    }

    #[must_use]
    pub fn delay(self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Periodic(delay) => Some(delay),
        }
    }
}

/// The registry's bookkeeping for one in-flight `ActionID`.
pub struct ActionEntry {
    pub action: Packet,
    pub callback: Option<BoxedCallback>,
    /// True while additional response packets for this `ActionID` are still expected.
    pub wait_next: bool,
    /// Set for actions registered with [`Repeat::Periodic`]; such entries are never removed by
    /// `Resolve`, only by connection teardown.
    pub periodic: Option<Duration>,
}

impl ActionEntry {
    #[must_use]
    pub fn new(action: Packet, callback: Option<BoxedCallback>, periodic: Option<Duration>) -> Self {
        Self {
            action,
            callback,
            wait_next: false,
            periodic,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn none_has_no_delay() {
        assert_eq!(Repeat::None.delay(), None);
        assert!(!Repeat::None.is_periodic());
    }

    #[test]
    fn periodic_carries_its_delay() {
        let repeat = Repeat::Periodic(Duration::from_secs(30));
        assert_eq!(repeat.delay(), Some(Duration::from_secs(30)));
        assert!(repeat.is_periodic());
    }

    #[test]
    fn fresh_entry_does_not_wait_for_more_packets() {
        let entry = ActionEntry::new(Packet::action("Ping"), None, None);
        assert!(!entry.wait_next);
        assert!(entry.periodic.is_none());
    }
}
