//! `ActionID` token generation.
//!
//! Ported from the original client's `IdGenerator`: each generator owns a random v4 UUID picked
//! once at construction, then yields `<prefix>/<uuid>/<hi>/<lo>` tokens from a monotonic counter,
//! where `hi = counter / 10_000 + 1` and `lo = counter % 10_000 + 1`. The counter never resets for
//! the lifetime of the generator, so tokens stay unique even across reconnects.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

const BUCKET: u64 = 10_000;

/// Produces unique `ActionID` strings for one client instance.
pub struct IdGenerator {
    prefix: String,
    uid: Uuid,
    counter: AtomicU64,
}

impl IdGenerator {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uid: Uuid::new_v4(),
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the next token, e.g. `ami/3fa85f64-.../1/1`, then `ami/3fa85f64-.../1/2`, and so on.
    pub fn next(&self) -> String {
        let i = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}/{}/{}/{}", self.prefix, self.uid, i / BUCKET + 1, i % BUCKET + 1)
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("prefix", &self.prefix)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}
