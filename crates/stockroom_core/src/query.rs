//! Predicate scans over record stores.
//!
//! Filtering is plain host-language iteration; there is no index. Matching is
//! case-sensitive and performs no normalization.

use crate::record::Record;
use std::collections::BTreeSet;

/// A location and keyword filter, ANDed together.
///
/// Empty strings are treated the same as an absent filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Keep only records whose location equals this exactly.
    pub location: Option<String>,
    /// Keep only records whose name (or notes) contain this substring.
    pub keyword: Option<String>,
    /// Whether the keyword is also matched against notes.
    pub include_notes: bool,
}

impl RecordFilter {
    /// Creates a filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to an exact location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restricts to records containing `keyword`.
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Sets whether notes are searched too.
    #[must_use]
    pub fn include_notes(mut self, value: bool) -> Self {
        self.include_notes = value;
        self
    }

    /// Returns true if `record` passes the filter.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        if let Some(location) = non_empty(&self.location) {
            if record.location() != location {
                return false;
            }
        }
        if let Some(keyword) = non_empty(&self.keyword) {
            let in_name = record.name().contains(keyword);
            let in_notes = self.include_notes && record.notes().contains(keyword);
            if !in_name && !in_notes {
                return false;
            }
        }
        true
    }

    /// Returns the matching records, preserving input order.
    pub fn apply<'a, R, I>(&self, records: I) -> Vec<R>
    where
        R: Record,
        I: IntoIterator<Item = &'a R>,
    {
        records
            .into_iter()
            .filter(|r| self.matches(*r))
            .cloned()
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Returns the distinct non-empty locations, sorted.
pub fn distinct_locations<'a, R, I>(records: I) -> Vec<String>
where
    R: Record,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .map(Record::location)
        .filter(|l| !l.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
