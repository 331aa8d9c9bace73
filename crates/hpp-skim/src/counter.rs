//! Weighted counter accumulation keyed by (path, reco channel, gen channel).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key of one counting bin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    /// Slash-joined category path (e.g. `new/allMassWindow/400/hpp0`).
    pub path: String,
    /// Canonical reconstructed channel label.
    pub reco: String,
    /// Canonical generator channel label (or `all`).
    pub gen: String,
}

/// One flushed counting bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    /// Category path.
    pub path: String,
    /// Reconstructed channel.
    pub reco_channel: String,
    /// Generator channel.
    pub gen_channel: String,
    /// Accumulated sum of weights.
    pub total: f64,
}

/// In-memory accumulator with lazy bin creation.
///
/// Single-threaded by design; for partitioned runs each worker owns its own
/// store and the results are [`merge`](CounterStore::merge)d afterward
/// (accumulation is additive and commutative).
#[derive(Debug, Clone, Default)]
pub struct CounterStore {
    counts: HashMap<CounterKey, f64>,
}

impl CounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` to the bin, creating it on first use.
    pub fn increment(&mut self, path: &str, weight: f64, reco: &str, gen: &str) {
        let key = CounterKey {
            path: path.to_string(),
            reco: reco.to_string(),
            gen: gen.to_string(),
        };
        *self.counts.entry(key).or_insert(0.0) += weight;
    }

    /// Fold another store into this one, summing by key.
    pub fn merge(&mut self, other: CounterStore) {
        for (key, value) in other.counts {
            *self.counts.entry(key).or_insert(0.0) += value;
        }
    }

    /// Number of bins created so far.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no bin has been created yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Accumulated total for one bin, if it exists.
    pub fn get(&self, path: &str, reco: &str, gen: &str) -> Option<f64> {
        self.counts.get(&CounterKey {
            path: path.to_string(),
            reco: reco.to_string(),
            gen: gen.to_string(),
        })
        .copied()
    }

    /// Export all bins, sorted by key for deterministic output.
    pub fn flush(self) -> Vec<CountEntry> {
        let mut entries: Vec<(CounterKey, f64)> = self.counts.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(key, total)| CountEntry {
                path: key.path,
                reco_channel: key.reco,
                gen_channel: key.gen,
                total,
            })
            .collect()
    }
}
