//! Type-safe snowflake IDs with marker types.
//!
//! Markers perform no logical action and only ensure that IDs of different
//! resource kinds cannot be mixed up: a `Id<MessageMarker>` will not compile
//! where a `Id<UserMarker>` is required. On the wire Discord sends snowflakes
//! as decimal strings (occasionally as bare integers in older payloads), so
//! deserialization accepts both and serialization always emits a string.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Marker for application IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct ApplicationMarker;

/// Marker for guild IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct GuildMarker;

/// Marker for interaction IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct InteractionMarker;

/// Marker for message IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct MessageMarker;

/// Marker for user IDs.
#[derive(Debug)]
#[non_exhaustive]
pub struct UserMarker;

// ---------------------------------------------------------------------------
// Id
// ---------------------------------------------------------------------------

/// A snowflake ID tagged with a resource marker.
pub struct Id<M> {
    value: u64,
    phantom: PhantomData<fn(M) -> M>,
}

impl<M> Id<M> {
    /// Create an ID from a raw snowflake value.
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }

    /// The raw snowflake value.
    pub const fn get(self) -> u64 {
        self.value
    }

    /// Re-tag this ID with a different marker.
    pub const fn cast<N>(self) -> Id<N> {
        Id::new(self.value)
    }
}

// Manual impls so that `M` doesn't need to satisfy the derive bounds.

impl<M> Clone for Id<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Id<M> {}

impl<M> PartialEq for Id<M> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<M> Eq for Id<M> {}

impl<M> Hash for Id<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<M> PartialOrd for Id<M> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Id<M> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<M> fmt::Debug for Id<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<M> fmt::Display for Id<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<M> From<u64> for Id<M> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl<M> Serialize for Id<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.value)
    }
}

struct IdVisitor<M> {
    phantom: PhantomData<fn(M) -> M>,
}

impl<'de, M> Visitor<'de> for IdVisitor<M> {
    type Value = Id<M>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Id::new(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map(Id::new).map_err(de::Error::custom)
    }
}

impl<'de, M> Deserialize<'de> for Id<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor {
            phantom: PhantomData,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_string() {
        let id = Id::<UserMarker>::new(175928847299117063);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"175928847299117063\"");
    }

    #[test]
    fn id_deserializes_from_string() {
        let id: Id<MessageMarker> = serde_json::from_str("\"12345\"").unwrap();
        assert_eq!(id.get(), 12345);
    }

    #[test]
    fn id_deserializes_from_integer() {
        let id: Id<GuildMarker> = serde_json::from_str("12345").unwrap();
        assert_eq!(id.get(), 12345);
    }

    #[test]
    fn id_rejects_non_numeric_string() {
        let result: Result<Id<UserMarker>, _> = serde_json::from_str("\"not-a-number\"");
        assert!(result.is_err());
    }

    #[test]
    fn id_display_is_bare_number() {
        let id = Id::<InteractionMarker>::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn ids_with_same_value_are_equal() {
        assert_eq!(Id::<UserMarker>::new(7), Id::<UserMarker>::new(7));
        assert_ne!(Id::<UserMarker>::new(7), Id::<UserMarker>::new(8));
    }

    #[test]
    fn cast_retags_without_changing_value() {
        let user = Id::<UserMarker>::new(99);
        let message: Id<MessageMarker> = user.cast();
        assert_eq!(message.get(), 99);
    }
}
