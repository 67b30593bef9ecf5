//! Field readers that turn untyped documents into complete records.
//!
//! Every reader is total: a missing, null or ill-typed field yields the
//! default instead of an error.

use super::{Document, IdGenerator, RecordId};
use serde_json::Value;

/// Reads `id`. Non-empty strings and non-negative integers are kept; anything
/// else gets a fresh id from `ids`.
pub(crate) fn read_id(doc: &Document, ids: &dyn IdGenerator) -> RecordId {
    match doc.get("id") {
        Some(Value::String(s)) if !s.is_empty() => RecordId::new(s.as_str()),
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(v), _) => RecordId::from(v),
            (None, Some(f)) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                RecordId::from(f as u64)
            }
            _ => ids.generate(),
        },
        _ => ids.generate(),
    }
}

/// Reads a text field. Strings are kept, numbers and booleans are rendered,
/// everything else becomes the empty string.
pub(crate) fn read_text(doc: &Document, key: &str) -> String {
    match doc.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Reads `quantity`. Only non-negative integral numbers that fit in a `u32`
/// are valid; anything else defaults to 1.
pub(crate) fn read_quantity(doc: &Document) -> u32 {
    let Some(Value::Number(n)) = doc.get("quantity") else {
        return 1;
    };
    if let Some(v) = n.as_u64() {
        return u32::try_from(v).unwrap_or(1);
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => f as u32,
        _ => 1,
    }
}
