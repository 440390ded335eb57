//! Selection Model
//!
//! Tracks which entries of the currently displayed (already filtered) list are
//! marked for a batch action. Indices are only meaningful against the sequence
//! they were taken from, so the model is rebound, and emptied, every time that
//! sequence is replaced.

use std::collections::BTreeSet;

use crate::model::types::ItemDescriptor;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionModel {
    selected: BTreeSet<usize>,
    /// Length of the sequence the indices refer to
    bound_len: usize,
    /// Bumped on every rebind so callers can detect a stale view
    generation: u64,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to a new displayed sequence, dropping every index
    pub fn rebind(&mut self, len: usize) {
        self.selected.clear();
        self.bound_len = len;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bound_len(&self) -> usize {
        self.bound_len
    }

    /// Flip one index; out-of-range indices are ignored
    pub fn toggle(&mut self, index: usize) {
        if index >= self.bound_len {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    /// Select `0..count`, clamped to the bound sequence
    pub fn select_all(&mut self, count: usize) {
        self.selected = (0..count.min(self.bound_len)).collect();
    }

    /// Select everything, or clear when everything is already selected
    pub fn toggle_all(&mut self) {
        if self.bound_len > 0 && self.selected.len() == self.bound_len {
            self.clear();
        } else {
            self.select_all(self.bound_len);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Map the selected indices back to descriptors, in display order
    ///
    /// Indices past the end of `items` are skipped rather than dereferenced.
    pub fn resolve(&self, items: &[ItemDescriptor]) -> Vec<ItemDescriptor> {
        self.selected
            .iter()
            .filter_map(|&idx| items.get(idx))
            .cloned()
            .collect()
    }
}
