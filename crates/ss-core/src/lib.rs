//! Scarlet Swap Core Library
//!
//! This crate owns everything that decides *what* gets replaced: the
//! declarative rule model, the rule compiler, host-based filtering, and the
//! selection cascade that turns a bundle catalog plus license state into the
//! applicable rule set for a page. It knows nothing about the DOM; the
//! `ss-engine` crate consumes the applicable rule set it produces.
//!
//! # Architecture
//!
//! Settings are loaded as an immutable snapshot and passed explicitly into
//! every pipeline invocation. Nothing in this crate holds mutable state
//! across passes: on a "settings updated" notification the host simply loads
//! a fresh snapshot and rebuilds the applicable rule set from it.
//!
//! # Modules
//!
//! - `rule`: declarative rules, domain filters, and bundles
//! - `settings`: the settings snapshot and the storage-facing interface
//! - `compile`: rule -> compiled matcher
//! - `domains`: host filter compilation and evaluation
//! - `select`: bundle selection cascade and applicable-rule-set assembly
//! - `error`: shared error types

pub mod compile;
pub mod domains;
pub mod error;
pub mod rule;
pub mod select;
pub mod settings;

// Re-export commonly used types
pub use compile::{compile, CompiledRule};
pub use domains::HostFilter;
pub use error::SettingsError;
pub use rule::{Bundle, BundleSource, DomainFilter, FilterMode, Rule};
pub use select::{build_applicable_rules, select_rules, ApplicableRuleSet};
pub use settings::{load_settings, MemoryStore, Settings, SettingsStore};
