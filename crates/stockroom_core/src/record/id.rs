//! Record identifiers and id generation.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Opaque unique identifier for a record.
///
/// Record ids are:
/// - Unique within their record store
/// - Immutable once assigned
/// - Compared as exact strings
///
/// Ids serialize as strings. For compatibility with older documents that
/// stored integer ids, deserialization also accepts non-negative integers.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordIdVisitor;

        impl Visitor<'_> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or non-negative integer record id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                Ok(RecordId::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RecordId, E> {
                Ok(RecordId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                u64::try_from(v)
                    .map(RecordId::from)
                    .map_err(|_| E::custom("record id must not be negative"))
            }
        }

        deserializer.deserialize_any(RecordIdVisitor)
    }
}

/// Source of fresh record ids.
///
/// Implementations must never return the same id twice for the lifetime of
/// the generator, including under rapid successive calls.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh, unique id.
    fn generate(&self) -> RecordId;
}

/// Generates random version 4 UUIDs. This is the default generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> RecordId {
        RecordId(Uuid::new_v4().to_string())
    }
}

/// Generates `"{prefix}{n}"` ids from a monotonic counter.
///
/// Deterministic, which makes it the generator of choice for fixtures.
#[derive(Debug)]
pub struct SequentialGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialGenerator {
    /// Creates a generator whose first id is `"{prefix}1"`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    /// Creates a generator whose first id is `"{prefix}{first}"`.
    #[must_use]
    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(first),
        }
    }
}

impl IdGenerator for SequentialGenerator {
    fn generate(&self) -> RecordId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        RecordId(format!("{}{}", self.prefix, n))
    }
}
