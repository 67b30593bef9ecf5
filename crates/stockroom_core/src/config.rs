//! Inventory configuration.

use crate::types::RecordKind;

/// Configuration for opening an inventory.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Blob key of the storage-items document.
    pub storage_key: String,

    /// Blob key of the taken-out-items document.
    pub taken_out_key: String,

    /// Whether to write an empty document when none exists yet.
    pub create_if_missing: bool,

    /// Whether persistence failures are returned to the caller.
    ///
    /// When false (the default) an unreadable document loads as an empty
    /// store and a failed write is logged while the in-memory state is kept.
    /// When true both surface as errors and a failed write rolls the
    /// in-memory state back.
    pub strict_persistence: bool,

    /// Whether documents are written as indented JSON.
    pub pretty: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            storage_key: RecordKind::Storage.default_document_key().to_string(),
            taken_out_key: RecordKind::TakenOut.default_document_key().to_string(),
            create_if_missing: true,
            strict_persistence: false,
            pretty: true,
        }
    }
}

impl InventoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the blob key of the storage-items document.
    #[must_use]
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the blob key of the taken-out-items document.
    #[must_use]
    pub fn taken_out_key(mut self, key: impl Into<String>) -> Self {
        self.taken_out_key = key.into();
        self
    }

    /// Sets whether to create empty documents when missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether persistence failures are propagated.
    #[must_use]
    pub fn strict_persistence(mut self, value: bool) -> Self {
        self.strict_persistence = value;
        self
    }

    /// Sets whether documents are pretty-printed.
    #[must_use]
    pub fn pretty(mut self, value: bool) -> Self {
        self.pretty = value;
        self
    }

    /// Returns the blob key for a record kind.
    #[must_use]
    pub fn document_key(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Storage => &self.storage_key,
            RecordKind::TakenOut => &self.taken_out_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = InventoryConfig::default();
        assert!(config.create_if_missing);
        assert!(!config.strict_persistence);
        assert_eq!(config.document_key(RecordKind::Storage), "items.json");
        assert_eq!(config.document_key(RecordKind::TakenOut), "takenOutItems.json");
    }

    #[test]
    fn builder_pattern() {
        let config = InventoryConfig::new()
            .storage_key("stock.json")
            .create_if_missing(false)
            .strict_persistence(true)
            .pretty(false);

        assert_eq!(config.storage_key, "stock.json");
        assert!(!config.create_if_missing);
        assert!(config.strict_persistence);
        assert!(!config.pretty);
    }
}
