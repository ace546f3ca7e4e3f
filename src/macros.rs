//! Macro binding overlay.
//!
//! The 16 macro values live in the store as `BlockId::MacroValues`. A binding
//! maps one target slot to one macro; many targets may share a macro, so a
//! single knob can drive a whole gesture. Bound targets take the macro value
//! verbatim as the FINAL resolution step, after LFO offsets and after any
//! direct writes that landed this frame.

use std::collections::HashMap;

use crate::params::{BlockId, ParamStore, ResolvedFrame};

pub const MACRO_COUNT: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct MacroBank {
    bindings: HashMap<(BlockId, usize), usize>,
}

impl MacroBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a target slot to a macro. Rebinding moves the target; a slot
    /// can follow at most one macro.
    pub fn bind(&mut self, target: BlockId, slot: usize, macro_index: usize) -> bool {
        if macro_index >= MACRO_COUNT || slot >= target.len() || target == BlockId::MacroValues {
            return false;
        }
        self.bindings.insert((target, slot), macro_index);
        true
    }

    pub fn unbind(&mut self, target: BlockId, slot: usize) {
        self.bindings.remove(&(target, slot));
    }

    pub fn binding(&self, target: BlockId, slot: usize) -> Option<usize> {
        self.bindings.get(&(target, slot)).copied()
    }

    /// Drops every binding. Macro values are untouched.
    pub fn reset_assignments(&mut self) {
        self.bindings.clear();
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BlockId, usize, usize)> + '_ {
        self.bindings.iter().map(|((block, slot), idx)| (*block, *slot, *idx))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Overwrites every bound slot with its macro's current value.
    pub fn apply(&self, store: &ParamStore, frame: &mut ResolvedFrame) {
        for ((target, slot), macro_index) in &self.bindings {
            let value = store.get(BlockId::MacroValues, *macro_index);
            frame.set(*target, *slot, value);
        }
    }
}

/// Zeroes the macro values themselves. Bindings are a separate concern;
/// see [`MacroBank::reset_assignments`].
pub fn reset_values(store: &mut ParamStore) {
    let block = store.block_mut(BlockId::MacroValues);
    for i in 0..block.len() {
        block.set(i, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_direct_write() {
        let mut store = ParamStore::new();
        let mut bank = MacroBank::new();
        assert!(bank.bind(BlockId::Ch1Adjust, 3, 0));
        store.set(BlockId::MacroValues, 0, 0.9);
        // Direct write to the bound slot in the same frame.
        store.set(BlockId::Ch1Adjust, 3, 0.1);

        let mut frame = ResolvedFrame::new();
        frame.load_base(&store);
        bank.apply(&store, &mut frame);
        assert_eq!(frame.get(BlockId::Ch1Adjust, 3), 0.9);
    }

    #[test]
    fn one_macro_fans_out_to_many_targets() {
        let mut store = ParamStore::new();
        let mut bank = MacroBank::new();
        bank.bind(BlockId::Fb1Geo, 0, 4);
        bank.bind(BlockId::Fb2Geo, 0, 4);
        bank.bind(BlockId::MatrixMix, 7, 4);
        store.set(BlockId::MacroValues, 4, 0.33);

        let mut frame = ResolvedFrame::new();
        frame.load_base(&store);
        bank.apply(&store, &mut frame);
        assert_eq!(frame.get(BlockId::Fb1Geo, 0), 0.33);
        assert_eq!(frame.get(BlockId::Fb2Geo, 0), 0.33);
        assert_eq!(frame.get(BlockId::MatrixMix, 7), 0.33);
    }

    #[test]
    fn reset_values_and_assignments_are_independent() {
        let mut store = ParamStore::new();
        let mut bank = MacroBank::new();
        bank.bind(BlockId::Ch1Adjust, 0, 1);
        store.set(BlockId::MacroValues, 1, 0.5);

        reset_values(&mut store);
        assert_eq!(store.get(BlockId::MacroValues, 1), 0.0);
        assert_eq!(bank.binding(BlockId::Ch1Adjust, 0), Some(1));

        store.set(BlockId::MacroValues, 1, 0.7);
        bank.reset_assignments();
        assert!(bank.is_empty());
        assert_eq!(store.get(BlockId::MacroValues, 1), 0.7);
    }

    #[test]
    fn rejects_out_of_range_bindings() {
        let mut bank = MacroBank::new();
        assert!(!bank.bind(BlockId::Ch1Adjust, 0, MACRO_COUNT));
        assert!(!bank.bind(BlockId::Ch1Adjust, 15, 0)); // beyond live length
        assert!(!bank.bind(BlockId::MacroValues, 0, 0)); // macros can't drive macros
        assert!(bank.is_empty());
    }
}
