//! The AMI packet data model: an ordered run of `Name: Value` header fields.

use std::fmt;

/// The value of a header field. Repeated header names within one packet collapse into a
/// [`HeaderValue::Multi`], with the first repetition promoting the prior scalar into the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// The first (or only) value, for call sites that only care about one.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multi(v) => v.first().map_or("", String::as_str),
        }
    }

    /// All values as a slice-like iterator.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Single(v) => std::slice::from_ref(v).iter().map(String::as_str),
            Self::Multi(v) => v.iter().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                *self = Self::Multi(vec![std::mem::take(existing), value]);
            }
            Self::Multi(values) => values.push(value),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

/// An ordered sequence of header fields: an action, response, or event as AMI frames it on the
/// wire.
///
/// Insertion order is preserved (so `Encode` round-trips byte-for-byte with the order the
/// headers were set in), and lookups are case-sensitive exact matches on the header name, as
/// AMI itself does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    fields: Vec<(String, HeaderValue)>,
}

impl Packet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a packet from a single `Action` header, the common case for submitting actions.
    #[must_use]
    pub fn action(name: impl Into<String>) -> Self {
        let mut packet = Self::new();
        packet.insert("Action", name);
        packet
    }

    /// Sets a header, appending to the existing value if the name already exists (matching the
    /// decoder's own repeated-header accumulation rule).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        if let Some((_, existing)) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            existing.push(value);
        } else {
            self.fields.push((name, HeaderValue::Single(value)));
        }

        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// The first value for `name`, if present.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if `name: value` is present, comparing against every value of a repeated header.
    #[must_use]
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .is_some_and(|v| v.values().any(|v| v == value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
