//! Scarlet Swap DOM Engine
//!
//! Everything that touches the page lives here: an arena-backed DOM, the
//! scanner that finds rewritable text nodes, the substitution engine that
//! swaps matched runs for provenance-carrying spans, and the mutation
//! watcher that keeps dynamically updated pages correct.
//!
//! The engine is driven with an explicit settings snapshot per pass (see
//! `ss-core`); it holds no rule state of its own between passes.
//!
//! # Modules
//!
//! - `dom`: arena document, node handles, tree surgery
//! - `scanner`: lazy candidate traversal with exclusion rules
//! - `rewrite`: segment computation and in-place node replacement
//! - `watcher`: coalesced, re-entrancy-guarded mutation handling

pub mod dom;
pub mod rewrite;
pub mod scanner;
pub mod watcher;

// Re-export commonly used types
pub use dom::{Document, NodeData, NodeFlags, NodeId, SWAP_MARKER_ATTR};
pub use rewrite::{apply_rules, rewrite_node, rewrite_segments, ApplyStats, Segment, Swap};
pub use scanner::candidates;
pub use watcher::{Mutation, MutationWatcher, WatcherState};
