//! Preset banks.
//!
//! Layout on disk: `<presets_dir>/<bank>/<preset>.json`. A preset is a JSON
//! snapshot of the whole store: block values and shapes, toggles, selects,
//! and macro bindings (macro values travel with the blocks). Loads are
//! tolerant in both directions: fields a newer build added are ignored by
//! older ones, and anything missing keeps its current value, so presets
//! survive version skew in either direction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lfo::WaveShape;
use crate::macros::MacroBank;
use crate::params::{BlockId, ParamStore};
use crate::{logi, logw};

pub const DEFAULT_BANK: &str = "Default";

/// -------------------------------
/// Snapshot format
/// -------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    blocks: BTreeMap<String, BlockSnapshot>,

    #[serde(default)]
    toggles: Option<BTreeMap<String, bool>>,

    #[serde(default)]
    selects: Option<BTreeMap<String, i32>>,

    #[serde(default)]
    macro_bindings: Option<Vec<BindingSnapshot>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BlockSnapshot {
    #[serde(default)]
    values: Vec<f32>,

    #[serde(default)]
    shapes: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BindingSnapshot {
    block: String,
    slot: usize,
    macro_index: usize,
}

impl Snapshot {
    pub fn capture(store: &ParamStore, macros: &MacroBank) -> Snapshot {
        let mut blocks = BTreeMap::new();
        for id in BlockId::ALL {
            let block = store.block(id);
            blocks.insert(
                id.name().to_string(),
                BlockSnapshot {
                    values: block.values().to_vec(),
                    shapes: (0..id.len()).map(|i| block.shape(i).to_index()).collect(),
                },
            );
        }

        let toggles = store
            .toggles
            .entries()
            .into_iter()
            .map(|(name, v)| (name.to_string(), v))
            .collect();
        let selects = store
            .selects
            .entries()
            .into_iter()
            .map(|(name, v)| (name.to_string(), v))
            .collect();

        let macro_bindings = macros
            .bindings()
            .map(|(block, slot, macro_index)| BindingSnapshot {
                block: block.name().to_string(),
                slot,
                macro_index,
            })
            .collect();

        Snapshot {
            blocks,
            toggles: Some(toggles),
            selects: Some(selects),
            macro_bindings: Some(macro_bindings),
        }
    }

    /// Applies onto the live store. Present fields overwrite; absent fields
    /// keep their current values.
    pub fn apply(&self, store: &mut ParamStore, macros: &mut MacroBank) {
        for (name, snap) in &self.blocks {
            let id = match BlockId::from_name(name) {
                Some(id) => id,
                None => {
                    logw!("PRESET", "unknown block '{name}' ignored");
                    continue;
                }
            };
            let block = store.block_mut(id);
            for (i, v) in snap.values.iter().enumerate().take(id.len()) {
                block.set(i, *v);
            }
            for (i, s) in snap.shapes.iter().enumerate().take(id.len()) {
                block.set_shape(i, WaveShape::from_index(*s));
            }
        }

        if let Some(toggles) = &self.toggles {
            for (name, field) in store.toggles.entries_mut() {
                if let Some(v) = toggles.get(name) {
                    *field = *v;
                }
            }
        }
        if let Some(selects) = &self.selects {
            for (name, field) in store.selects.entries_mut() {
                if let Some(v) = selects.get(name) {
                    *field = *v;
                }
            }
        }

        if let Some(bindings) = &self.macro_bindings {
            macros.reset_assignments();
            for b in bindings {
                match BlockId::from_name(&b.block) {
                    Some(id) => {
                        if !macros.bind(id, b.slot, b.macro_index) {
                            logw!(
                                "PRESET",
                                "binding {}[{}] -> macro {} out of range, skipped",
                                b.block,
                                b.slot,
                                b.macro_index
                            );
                        }
                    }
                    None => logw!("PRESET", "binding for unknown block '{}' skipped", b.block),
                }
            }
        }
    }
}

/// Human name shown for a preset file: extension stripped, underscores
/// become spaces. Deterministic so lists stay stable across rescans.
pub fn clean_display_name(file_stem: &str) -> String {
    file_stem.trim_end_matches(".json").replace('_', " ").trim().to_string()
}

fn file_name_for(display: &str) -> String {
    let stem: String = display
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect();
    format!("{stem}.json")
}

/// -------------------------------
/// Bank manager
/// -------------------------------

pub struct PresetManager {
    root: PathBuf,
    bank: String,
    banks: Vec<String>,
    presets: Vec<String>, // file stems, sorted
}

impl PresetManager {
    pub fn new(root: impl Into<PathBuf>) -> PresetManager {
        let root = root.into();
        let mut mgr = PresetManager {
            root,
            bank: DEFAULT_BANK.to_string(),
            banks: Vec::new(),
            presets: Vec::new(),
        };
        mgr.ensure_layout();
        mgr.migrate_legacy();
        mgr.rescan();
        mgr
    }

    fn ensure_layout(&self) {
        if let Err(e) = fs::create_dir_all(self.root.join(DEFAULT_BANK)) {
            logw!("PRESET", "cannot create {}: {e}", self.root.display());
        }
    }

    /// Old builds wrote flat save-state files straight into the presets dir.
    /// Move them into the Default bank so they show up as presets.
    fn migrate_legacy(&self) {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_owned()) else {
                continue;
            };
            let dest = self.root.join(DEFAULT_BANK).join(&name);
            if dest.exists() {
                continue;
            }
            match fs::rename(&path, &dest) {
                Ok(()) => logi!("PRESET", "migrated legacy save state {:?}", name),
                Err(e) => logw!("PRESET", "could not migrate {:?}: {e}", name),
            }
        }
    }

    pub fn rescan(&mut self) {
        self.banks = list_dirs(&self.root);
        if !self.banks.iter().any(|b| b == &self.bank) {
            self.bank = self.banks.first().cloned().unwrap_or_else(|| DEFAULT_BANK.to_string());
        }
        self.presets = list_presets(&self.bank_path());
    }

    fn bank_path(&self) -> PathBuf {
        self.root.join(&self.bank)
    }

    fn preset_path(&self, stem: &str) -> PathBuf {
        self.bank_path().join(format!("{stem}.json"))
    }

    pub fn bank(&self) -> &str {
        &self.bank
    }

    pub fn banks(&self) -> &[String] {
        &self.banks
    }

    pub fn presets(&self) -> &[String] {
        &self.presets
    }

    pub fn display_names(&self) -> Vec<String> {
        self.presets.iter().map(|s| clean_display_name(s)).collect()
    }

    pub fn select_bank_by_index(&mut self, index: i32) -> bool {
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        match self.banks.get(index) {
            Some(name) => {
                self.bank = name.clone();
                self.presets = list_presets(&self.bank_path());
                logi!("PRESET", "bank -> {}", self.bank);
                true
            }
            None => {
                logw!("PRESET", "no bank at index {index}");
                false
            }
        }
    }

    /// Switches to the named bank, creating it if needed.
    pub fn select_bank_by_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            logw!("PRESET", "bad bank name {name:?}");
            return false;
        }
        if let Err(e) = fs::create_dir_all(self.root.join(name)) {
            logw!("PRESET", "cannot create bank {name}: {e}");
            return false;
        }
        self.bank = name.to_string();
        self.rescan();
        logi!("PRESET", "bank -> {}", self.bank);
        true
    }

    pub fn load(&self, index: i32) -> Option<Snapshot> {
        let stem = self.presets.get(usize::try_from(index).ok()?)?;
        let path = self.preset_path(stem);
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => {
                logw!("PRESET", "read {} failed: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(snap) => {
                logi!("PRESET", "loaded {}", path.display());
                Some(snap)
            }
            Err(e) => {
                logw!("PRESET", "parse {} failed: {e}", path.display());
                None
            }
        }
    }

    /// Saves into slot `index`: overwrites the preset already there, or
    /// creates a numbered file when the slot is past the end of the list.
    pub fn save(&mut self, index: i32, snapshot: &Snapshot) -> bool {
        let slot = usize::try_from(index).unwrap_or(0);
        let stem = match self.presets.get(slot) {
            Some(existing) => existing.clone(),
            None => format!("preset_{}", slot + 1),
        };
        let ok = self.write_snapshot(&stem, snapshot);
        self.presets = list_presets(&self.bank_path());
        ok
    }

    pub fn save_as(&mut self, name: &str, snapshot: &Snapshot) -> bool {
        let file = file_name_for(name);
        let stem = file.trim_end_matches(".json").to_string();
        if stem.is_empty() {
            logw!("PRESET", "empty preset name ignored");
            return false;
        }
        let ok = self.write_snapshot(&stem, snapshot);
        self.presets = list_presets(&self.bank_path());
        ok
    }

    pub fn rename(&mut self, index: i32, new_name: &str) -> bool {
        let Some(stem) = usize::try_from(index).ok().and_then(|i| self.presets.get(i)) else {
            return false;
        };
        let from = self.preset_path(stem);
        let to = self.bank_path().join(file_name_for(new_name));
        match fs::rename(&from, &to) {
            Ok(()) => {
                self.presets = list_presets(&self.bank_path());
                true
            }
            Err(e) => {
                logw!("PRESET", "rename {} failed: {e}", from.display());
                false
            }
        }
    }

    fn write_snapshot(&self, stem: &str, snapshot: &Snapshot) -> bool {
        let path = self.preset_path(stem);
        let data = match serde_json::to_string_pretty(snapshot) {
            Ok(d) => d,
            Err(e) => {
                logw!("PRESET", "serialize failed: {e}");
                return false;
            }
        };
        match fs::write(&path, data) {
            Ok(()) => {
                logi!("PRESET", "saved {}", path.display());
                true
            }
            Err(e) => {
                logw!("PRESET", "write {} failed: {e}", path.display());
                false
            }
        }
    }
}

fn list_dirs(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    out.push(name.to_string());
                }
            }
        }
    }
    out.sort();
    out
}

fn list_presets(bank: &Path) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(bank) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    out.push(stem.to_string());
                }
            }
        }
    }
    out.sort();
    out
}
