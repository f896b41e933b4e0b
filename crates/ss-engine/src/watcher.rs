//! Mutation handling for dynamically updated pages.
//!
//! The host observes the page and reports additions; the watcher coalesces
//! them into batches and replays the scan+rewrite pipeline over the new
//! content only. The state enum is the re-entrancy guard: the watcher's own
//! substitutions are observable mutations, and recording them while a batch
//! runs would loop forever. This is a cooperative, single-threaded lock,
//! not a general concurrency primitive.

use ss_core::select::build_applicable_rules;
use ss_core::settings::Settings;

use crate::dom::{Document, NodeId};
use crate::rewrite::{apply_rules, rewrite_node, ApplyStats};

/// Watcher lifecycle. One tick per Idle -> Scheduled edge is the
/// animation-frame coalescing analogue: bursts of additions fold into a
/// single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    /// Additions queued, a tick is pending.
    Scheduled,
    /// A batch is being processed; new records are dropped.
    Running,
}

/// A reported DOM addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// An element subtree was inserted; scan and rewrite all of it.
    AddedSubtree(NodeId),
    /// A bare text node was inserted; rewrite it directly.
    AddedText(NodeId),
}

#[derive(Debug)]
pub struct MutationWatcher {
    state: WatcherState,
    queue: Vec<Mutation>,
}

impl Default for MutationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self {
            state: WatcherState::Idle,
            queue: Vec::new(),
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Record one addition. Returns true when the caller should schedule a
    /// tick (only on the Idle -> Scheduled edge). While a batch is running
    /// the record is dropped: it can only describe our own replacement
    /// spans, which a later pass would skip anyway.
    pub fn record(&mut self, mutation: Mutation) -> bool {
        match self.state {
            WatcherState::Running => false,
            WatcherState::Scheduled => {
                self.queue.push(mutation);
                false
            }
            WatcherState::Idle => {
                self.queue.push(mutation);
                self.state = WatcherState::Scheduled;
                true
            }
        }
    }

    /// Process the queued batch.
    ///
    /// The applicable rule set is recomputed from the supplied settings
    /// snapshot on every call, never cached across batches, so a
    /// settings change between ticks takes effect immediately.
    pub fn tick(&mut self, doc: &mut Document, settings: &Settings, host: &str) -> ApplyStats {
        if self.state != WatcherState::Scheduled {
            return ApplyStats::default();
        }
        self.state = WatcherState::Running;
        let batch = std::mem::take(&mut self.queue);

        let mut stats = ApplyStats::default();
        let set = build_applicable_rules(settings, host);
        if !set.is_empty() {
            for mutation in batch {
                match mutation {
                    Mutation::AddedSubtree(root) => {
                        stats.merge(apply_rules(doc, root, &set));
                    }
                    Mutation::AddedText(node) => {
                        stats.candidates += 1;
                        let swaps = rewrite_node(doc, node, &set);
                        if swaps > 0 {
                            stats.rewritten += 1;
                            stats.swaps += swaps;
                        }
                    }
                }
            }
        }

        self.state = WatcherState::Idle;
        stats
    }

    #[cfg(test)]
    fn force_state(&mut self, state: WatcherState) {
        self.state = state;
    }
}
