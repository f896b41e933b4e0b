//! Settings snapshot and the storage-facing interface.
//!
//! The extension's storage backend is an external collaborator; this module
//! only consumes it. State lives in two logical namespaces: a small synced
//! one carrying the license flag, and a local one carrying everything else.
//! `load_settings` merges both into an immutable [`Settings`] snapshot and
//! falls back to safe defaults on any failure, so a broken store can never
//! leave a page permanently disabled.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::rule::{Bundle, DomainFilter, FilterMode};

/// Storage keys in the synced namespace.
pub const KEY_LICENSED: &str = "licensed";
/// Storage keys in the local namespace.
pub const KEY_ENABLED: &str = "enabled";
pub const KEY_ACTIVE_BUNDLE_ID: &str = "activeBundleId";
pub const KEY_GLOBAL_DOMAIN_FILTER: &str = "globalDomainFilter";
pub const KEY_DISABLED_RULE_IDS: &str = "disabledRuleIds";
pub const KEY_BUNDLES: &str = "bundles";

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of all persisted state, loaded once per execution context
/// and rebuilt wholesale on a "settings updated" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Master kill switch.
    pub enabled: bool,
    /// Gates bundles flagged `requires_license`.
    pub licensed: bool,
    pub active_bundle_id: String,
    /// Inherited by every rule whose own filter mode is `Inherit`.
    pub global_domain_filter: DomainFilter,
    pub disabled_rule_ids: HashSet<String>,
    pub bundles: Vec<Bundle>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            licensed: false,
            active_bundle_id: String::new(),
            global_domain_filter: DomainFilter {
                mode: FilterMode::Disabled,
                patterns: Vec::new(),
            },
            disabled_rule_ids: HashSet::new(),
            bundles: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse a full snapshot from a single JSON document (used by the CLI
    /// and the wasm bindings, which receive both namespaces pre-merged).
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The bundle identified by `active_bundle_id`, if present.
    pub fn active_bundle(&self) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.id == self.active_bundle_id)
    }
}

// =============================================================================
// Store interface
// =============================================================================

/// Read access to the key-value settings backend.
///
/// Change notification is out of band: the host delivers a "settings
/// updated" message with no payload, and the core re-reads ground truth
/// through this trait.
pub trait SettingsStore {
    /// Raw JSON object for the synced namespace (license flag).
    fn get_synced(&self) -> Result<serde_json::Value, SettingsError>;
    /// Raw JSON object for the local namespace (everything else).
    fn get_local(&self) -> Result<serde_json::Value, SettingsError>;
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SyncedSnapshot {
    licensed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LocalSnapshot {
    enabled: bool,
    active_bundle_id: String,
    global_domain_filter: DomainFilter,
    disabled_rule_ids: HashSet<String>,
    bundles: Vec<Bundle>,
}

impl Default for LocalSnapshot {
    fn default() -> Self {
        let defaults = Settings::default();
        Self {
            enabled: defaults.enabled,
            active_bundle_id: defaults.active_bundle_id,
            global_domain_filter: defaults.global_domain_filter,
            disabled_rule_ids: defaults.disabled_rule_ids,
            bundles: defaults.bundles,
        }
    }
}

/// Load a settings snapshot, degrading to defaults per namespace.
///
/// A namespace that fails to load or decode is replaced by its defaults and
/// logged; the other namespace is still honored.
pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    let synced = match store
        .get_synced()
        .and_then(|v| serde_json::from_value::<SyncedSnapshot>(v).map_err(Into::into))
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("synced settings unavailable, using defaults: {e}");
            SyncedSnapshot::default()
        }
    };

    let local = match store
        .get_local()
        .and_then(|v| serde_json::from_value::<LocalSnapshot>(v).map_err(Into::into))
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("local settings unavailable, using defaults: {e}");
            LocalSnapshot::default()
        }
    };

    Settings {
        enabled: local.enabled,
        licensed: synced.licensed,
        active_bundle_id: local.active_bundle_id,
        global_domain_filter: local.global_domain_filter,
        disabled_rule_ids: local.disabled_rule_ids,
        bundles: local.bundles,
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Store backed by in-memory JSON values. Backs the tests and the CLI,
/// which reads both namespaces from one file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    synced: serde_json::Value,
    local: serde_json::Value,
}

impl MemoryStore {
    pub fn new(synced: serde_json::Value, local: serde_json::Value) -> Self {
        Self { synced, local }
    }

    /// Split a full snapshot back into its two namespaces.
    pub fn from_settings(settings: &Settings) -> Self {
        let synced = serde_json::json!({ KEY_LICENSED: settings.licensed });
        let local = serde_json::json!({
            KEY_ENABLED: settings.enabled,
            KEY_ACTIVE_BUNDLE_ID: settings.active_bundle_id,
            KEY_GLOBAL_DOMAIN_FILTER: settings.global_domain_filter,
            KEY_DISABLED_RULE_IDS: settings.disabled_rule_ids,
            KEY_BUNDLES: settings.bundles,
        });
        Self { synced, local }
    }
}

impl SettingsStore for MemoryStore {
    fn get_synced(&self) -> Result<serde_json::Value, SettingsError> {
        Ok(self.synced.clone())
    }

    fn get_local(&self) -> Result<serde_json::Value, SettingsError> {
        Ok(self.local.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn get_synced(&self) -> Result<serde_json::Value, SettingsError> {
            Err(SettingsError::Store("offline".into()))
        }
        fn get_local(&self) -> Result<serde_json::Value, SettingsError> {
            Err(SettingsError::Store("offline".into()))
        }
    }

    #[test]
    fn test_defaults_are_safe() {
        let defaults = Settings::default();
        assert!(defaults.enabled);
        assert!(!defaults.licensed);
        assert_eq!(defaults.global_domain_filter.mode, FilterMode::Disabled);
    }

    #[test]
    fn test_broken_store_falls_back_to_defaults() {
        let settings = load_settings(&BrokenStore);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_round_trip_through_memory_store() {
        let mut original = Settings::default();
        original.licensed = true;
        original.active_bundle_id = "b1".to_string();
        original.disabled_rule_ids.insert("r9".to_string());

        let store = MemoryStore::from_settings(&original);
        let loaded = load_settings(&store);
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_corrupt_local_namespace_keeps_synced_values() {
        let store = MemoryStore::new(
            serde_json::json!({ "licensed": true }),
            serde_json::json!("not an object"),
        );
        let settings = load_settings(&store);
        assert!(settings.licensed);
        assert!(settings.enabled);
        assert!(settings.bundles.is_empty());
    }
}
