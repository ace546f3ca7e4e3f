//! OSC parameter registry.
//!
//! Every controllable value and every one-shot command registers an address
//! exactly once at startup; inbound dispatch and outbound dumps both route
//! through this table, so there is a single source of truth for the wire
//! surface. Duplicate registration is a programming error and panics during
//! construction.
//!
//! Typed narrowing at dispatch: floats pass through, toggles treat `> 0.5`
//! as on, selects truncate toward zero (with an optional clamp). Malformed
//! payloads and unknown addresses are dropped, never errors; the transport
//! logs them and moves on.

use std::collections::HashMap;

use rosc::OscType;

use crate::logi;
use crate::params::{BlockId, ParamStore, FPS_RANGE};

pub type ToggleAccess = fn(&mut ParamStore) -> &mut bool;
pub type SelectAccess = fn(&mut ParamStore) -> &mut i32;
pub type CommandFn = fn(&mut ParamStore);
pub type IntCommandFn = fn(&mut ParamStore, i32);
pub type StringCommandFn = fn(&mut ParamStore, &str);

#[derive(Clone, Copy)]
pub enum Target {
    Slot { block: BlockId, index: usize },
    Toggle(ToggleAccess),
    Select { access: SelectAccess, clamp: Option<(i32, i32)> },
    /// Edge-triggered reset of one block.
    ResetBlock(BlockId),
    /// Edge-triggered reset of a block group.
    ResetGroup(&'static [BlockId]),
    Command(CommandFn),
    IntCommand(IntCommandFn),
    StringCommand(StringCommandFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Unknown,
    Malformed,
}

pub struct Registry {
    entries: HashMap<String, Target>,
    /// Value-bearing addresses in registration order; this is the dump order.
    order: Vec<String>,
}

fn float_arg(args: &[OscType]) -> Option<f32> {
    match args.first() {
        Some(OscType::Float(f)) => Some(*f),
        Some(OscType::Double(d)) => Some(*d as f32),
        Some(OscType::Int(i)) => Some(*i as f32),
        Some(OscType::Long(l)) => Some(*l as f32),
        _ => None,
    }
}

fn string_arg(args: &[OscType]) -> Option<&str> {
    match args.first() {
        Some(OscType::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl Registry {
    pub fn build() -> Registry {
        let mut reg = Registry {
            entries: HashMap::new(),
            order: Vec::new(),
        };
        reg.register_blocks();
        reg.register_toggles();
        reg.register_selects();
        reg.register_commands();
        logi!(
            "OSC",
            "registry built: {} addresses ({} dumpable)",
            reg.entries.len(),
            reg.order.len()
        );
        reg
    }

    fn insert(&mut self, addr: String, target: Target, dumpable: bool) {
        let previous = self.entries.insert(addr.clone(), target);
        assert!(previous.is_none(), "duplicate OSC address registration: {addr}");
        if dumpable {
            self.order.push(addr);
        }
    }

    fn float(&mut self, addr: String, block: BlockId, index: usize) {
        self.insert(addr, Target::Slot { block, index }, true);
    }

    fn toggle(&mut self, addr: &str, access: ToggleAccess) {
        self.insert(addr.to_string(), Target::Toggle(access), true);
    }

    fn select(&mut self, addr: &str, access: SelectAccess, clamp: Option<(i32, i32)>) {
        self.insert(addr.to_string(), Target::Select { access, clamp }, true);
    }

    fn command(&mut self, addr: &str, f: CommandFn) {
        self.insert(addr.to_string(), Target::Command(f), false);
    }

    fn int_command(&mut self, addr: &str, f: IntCommandFn) {
        self.insert(addr.to_string(), Target::IntCommand(f), false);
    }

    fn string_command(&mut self, addr: &str, f: StringCommandFn) {
        self.insert(addr.to_string(), Target::StringCommand(f), false);
    }

    fn register_blocks(&mut self) {
        for block in BlockId::ALL {
            let prefix = block.osc_prefix();
            for (index, name) in block.slot_names().iter().enumerate() {
                self.float(format!("{prefix}/{name}"), block, index);
            }
        }
    }

    fn register_toggles(&mut self) {
        let toggles: &[(&str, ToggleAccess)] = &[
            ("/gravity/block1/ch1/hMirror", |s| &mut s.toggles.ch1_h_mirror),
            ("/gravity/block1/ch1/vMirror", |s| &mut s.toggles.ch1_v_mirror),
            ("/gravity/block1/ch1/hFlip", |s| &mut s.toggles.ch1_h_flip),
            ("/gravity/block1/ch1/vFlip", |s| &mut s.toggles.ch1_v_flip),
            ("/gravity/block1/ch1/hueInvert", |s| &mut s.toggles.ch1_hue_invert),
            ("/gravity/block1/ch1/saturationInvert", |s| {
                &mut s.toggles.ch1_saturation_invert
            }),
            ("/gravity/block1/ch1/brightInvert", |s| &mut s.toggles.ch1_bright_invert),
            ("/gravity/block1/ch1/rgbInvert", |s| &mut s.toggles.ch1_rgb_invert),
            ("/gravity/block1/ch1/solarize", |s| &mut s.toggles.ch1_solarize),
            ("/gravity/block1/ch2/hMirror", |s| &mut s.toggles.ch2_h_mirror),
            ("/gravity/block1/ch2/vMirror", |s| &mut s.toggles.ch2_v_mirror),
            ("/gravity/block1/ch2/hFlip", |s| &mut s.toggles.ch2_h_flip),
            ("/gravity/block1/ch2/vFlip", |s| &mut s.toggles.ch2_v_flip),
            ("/gravity/block1/ch2/hueInvert", |s| &mut s.toggles.ch2_hue_invert),
            ("/gravity/block1/ch2/saturationInvert", |s| {
                &mut s.toggles.ch2_saturation_invert
            }),
            ("/gravity/block1/ch2/brightInvert", |s| &mut s.toggles.ch2_bright_invert),
            ("/gravity/block1/ch2/rgbInvert", |s| &mut s.toggles.ch2_rgb_invert),
            ("/gravity/block1/ch2/solarize", |s| &mut s.toggles.ch2_solarize),
            ("/gravity/block2/input/hMirror", |s| &mut s.toggles.input_h_mirror),
            ("/gravity/block2/input/vMirror", |s| &mut s.toggles.input_v_mirror),
            ("/gravity/block2/input/hFlip", |s| &mut s.toggles.input_h_flip),
            ("/gravity/block2/input/vFlip", |s| &mut s.toggles.input_v_flip),
            ("/gravity/block2/input/hueInvert", |s| &mut s.toggles.input_hue_invert),
            ("/gravity/block2/input/saturationInvert", |s| {
                &mut s.toggles.input_saturation_invert
            }),
            ("/gravity/block2/input/brightInvert", |s| &mut s.toggles.input_bright_invert),
            ("/gravity/block2/input/rgbInvert", |s| &mut s.toggles.input_rgb_invert),
            ("/gravity/block2/input/solarize", |s| &mut s.toggles.input_solarize),
            ("/gravity/block1/fb1/hMirror", |s| &mut s.toggles.fb1_h_mirror),
            ("/gravity/block1/fb1/vMirror", |s| &mut s.toggles.fb1_v_mirror),
            ("/gravity/block1/fb1/hFlip", |s| &mut s.toggles.fb1_h_flip),
            ("/gravity/block1/fb1/vFlip", |s| &mut s.toggles.fb1_v_flip),
            ("/gravity/block1/fb1/rotateMode", |s| &mut s.toggles.fb1_rotate_mode),
            ("/gravity/block1/fb1/hypercube", |s| &mut s.toggles.fb1_hypercube),
            ("/gravity/block1/fb1/dancingLine", |s| &mut s.toggles.fb1_dancing_line),
            ("/gravity/block1/fb1/septagram", |s| &mut s.toggles.fb1_septagram),
            ("/gravity/block1/fb1/lissajousBall", |s| &mut s.toggles.fb1_lissajous_ball),
            ("/gravity/block1/fb1/hueInvert", |s| &mut s.toggles.fb1_hue_invert),
            ("/gravity/block1/fb1/saturationInvert", |s| {
                &mut s.toggles.fb1_saturation_invert
            }),
            ("/gravity/block1/fb1/brightInvert", |s| &mut s.toggles.fb1_bright_invert),
            ("/gravity/block2/fb2/hMirror", |s| &mut s.toggles.fb2_h_mirror),
            ("/gravity/block2/fb2/vMirror", |s| &mut s.toggles.fb2_v_mirror),
            ("/gravity/block2/fb2/hFlip", |s| &mut s.toggles.fb2_h_flip),
            ("/gravity/block2/fb2/vFlip", |s| &mut s.toggles.fb2_v_flip),
            ("/gravity/block2/fb2/rotateMode", |s| &mut s.toggles.fb2_rotate_mode),
            ("/gravity/block2/fb2/hypercube", |s| &mut s.toggles.fb2_hypercube),
            ("/gravity/block2/fb2/dancingLine", |s| &mut s.toggles.fb2_dancing_line),
            ("/gravity/block2/fb2/septagram", |s| &mut s.toggles.fb2_septagram),
            ("/gravity/block2/fb2/lissajousBall", |s| &mut s.toggles.fb2_lissajous_ball),
            ("/gravity/block2/fb2/hueInvert", |s| &mut s.toggles.fb2_hue_invert),
            ("/gravity/block2/fb2/saturationInvert", |s| {
                &mut s.toggles.fb2_saturation_invert
            }),
            ("/gravity/block2/fb2/brightInvert", |s| &mut s.toggles.fb2_bright_invert),
            ("/gravity/block3/b1/hMirror", |s| &mut s.toggles.b1_h_mirror),
            ("/gravity/block3/b1/vMirror", |s| &mut s.toggles.b1_v_mirror),
            ("/gravity/block3/b1/hFlip", |s| &mut s.toggles.b1_h_flip),
            ("/gravity/block3/b1/vFlip", |s| &mut s.toggles.b1_v_flip),
            ("/gravity/block3/b1/colorize/active", |s| &mut s.toggles.b1_colorize_active),
            ("/gravity/block3/b2/hMirror", |s| &mut s.toggles.b2_h_mirror),
            ("/gravity/block3/b2/vMirror", |s| &mut s.toggles.b2_v_mirror),
            ("/gravity/block3/b2/hFlip", |s| &mut s.toggles.b2_h_flip),
            ("/gravity/block3/b2/vFlip", |s| &mut s.toggles.b2_v_flip),
            ("/gravity/block3/b2/colorize/active", |s| &mut s.toggles.b2_colorize_active),
        ];
        for (addr, access) in toggles {
            self.toggle(addr, *access);
        }
    }

    fn register_selects(&mut self) {
        let plain: &[(&str, SelectAccess)] = &[
            ("/gravity/block1/ch1/inputSelect", |s| &mut s.selects.ch1_input_select),
            ("/gravity/block1/ch1/geoOverflow", |s| &mut s.selects.ch1_geo_overflow),
            ("/gravity/block1/ch2/inputSelect", |s| &mut s.selects.ch2_input_select),
            ("/gravity/block1/ch2/geoOverflow", |s| &mut s.selects.ch2_geo_overflow),
            ("/gravity/block1/ch2/keyOrder", |s| &mut s.selects.ch2_key_order),
            ("/gravity/block1/ch2/mixType", |s| &mut s.selects.ch2_mix_type),
            ("/gravity/block1/ch2/mixOverflow", |s| &mut s.selects.ch2_mix_overflow),
            ("/gravity/block1/ch2/keyMode", |s| &mut s.selects.ch2_key_mode),
            ("/gravity/block2/input/inputSelect", |s| &mut s.selects.input_input_select),
            ("/gravity/block2/input/geoOverflow", |s| &mut s.selects.input_geo_overflow),
            ("/gravity/block1/fb1/geoOverflow", |s| &mut s.selects.fb1_geo_overflow),
            ("/gravity/block1/fb1/keyOrder", |s| &mut s.selects.fb1_key_order),
            ("/gravity/block1/fb1/mixType", |s| &mut s.selects.fb1_mix_type),
            ("/gravity/block1/fb1/mixOverflow", |s| &mut s.selects.fb1_mix_overflow),
            ("/gravity/block1/fb1/keyMode", |s| &mut s.selects.fb1_key_mode),
            ("/gravity/block1/fb1/delayTime", |s| &mut s.selects.fb1_delay_time),
            ("/gravity/block2/fb2/geoOverflow", |s| &mut s.selects.fb2_geo_overflow),
            ("/gravity/block2/fb2/keyOrder", |s| &mut s.selects.fb2_key_order),
            ("/gravity/block2/fb2/mixType", |s| &mut s.selects.fb2_mix_type),
            ("/gravity/block2/fb2/mixOverflow", |s| &mut s.selects.fb2_mix_overflow),
            ("/gravity/block2/fb2/keyMode", |s| &mut s.selects.fb2_key_mode),
            ("/gravity/block2/fb2/delayTime", |s| &mut s.selects.fb2_delay_time),
            ("/gravity/block3/b1/geoOverflow", |s| &mut s.selects.b1_geo_overflow),
            ("/gravity/block3/b1/rotateMode", |s| &mut s.selects.b1_rotate_mode),
            ("/gravity/block3/b1/colorize/colorspace", |s| &mut s.selects.b1_colorspace),
            ("/gravity/block3/b2/geoOverflow", |s| &mut s.selects.b2_geo_overflow),
            ("/gravity/block3/b2/rotateMode", |s| &mut s.selects.b2_rotate_mode),
            ("/gravity/block3/b2/colorize/colorspace", |s| &mut s.selects.b2_colorspace),
            ("/gravity/block3/matrixMix/mixType", |s| &mut s.selects.matrix_mix_type),
            ("/gravity/block3/matrixMix/overflow", |s| &mut s.selects.matrix_overflow),
            ("/gravity/block3/final/keyOrder", |s| &mut s.selects.final_key_order),
            ("/gravity/block3/final/mixType", |s| &mut s.selects.final_mix_type),
            ("/gravity/block3/final/overflow", |s| &mut s.selects.final_overflow),
            ("/gravity/block3/final/keyMode", |s| &mut s.selects.final_key_mode),
        ];
        for (addr, access) in plain {
            self.select(addr, *access, None);
        }
        self.select("/gravity/settings/fps", |s| &mut s.target_fps, Some(FPS_RANGE));
        self.select("/gravity/ui/scale", |s| &mut s.selects.ui_scale, Some((0, 2)));
    }

    fn register_commands(&mut self) {
        // Per-block resets raise the block's own reset flag; the frame
        // update applies it exactly once.
        let resets: &[(&str, BlockId)] = &[
            ("/gravity/block1/ch1/resetAdjust", BlockId::Ch1Adjust),
            ("/gravity/block1/ch1/lfo/resetAdjust", BlockId::Ch1AdjustLfo),
            ("/gravity/block1/ch2/resetAdjust", BlockId::Ch2Adjust),
            ("/gravity/block1/ch2/lfo/resetAdjust", BlockId::Ch2AdjustLfo),
            ("/gravity/block1/ch2/resetMixAndKey", BlockId::Ch2MixAndKey),
            ("/gravity/block1/ch2/lfo/resetMixAndKey", BlockId::Ch2MixAndKeyLfo),
            ("/gravity/block1/fb1/resetMixAndKey", BlockId::Fb1MixAndKey),
            ("/gravity/block1/fb1/lfo/resetMixAndKey", BlockId::Fb1MixAndKeyLfo),
            ("/gravity/block1/fb1/resetGeo", BlockId::Fb1Geo),
            ("/gravity/block1/fb1/lfo/resetGeo1", BlockId::Fb1GeoLfo1),
            ("/gravity/block1/fb1/lfo/resetGeo2", BlockId::Fb1GeoLfo2),
            ("/gravity/block1/fb1/resetColor", BlockId::Fb1Color),
            ("/gravity/block1/fb1/lfo/resetColor", BlockId::Fb1ColorLfo),
            ("/gravity/block1/fb1/resetFilters", BlockId::Fb1Filters),
            ("/gravity/block2/input/resetAdjust", BlockId::InputAdjust),
            ("/gravity/block2/input/lfo/resetAdjust", BlockId::InputAdjustLfo),
            ("/gravity/block2/fb2/resetMixAndKey", BlockId::Fb2MixAndKey),
            ("/gravity/block2/fb2/lfo/resetMixAndKey", BlockId::Fb2MixAndKeyLfo),
            ("/gravity/block2/fb2/resetGeo", BlockId::Fb2Geo),
            ("/gravity/block2/fb2/lfo/resetGeo1", BlockId::Fb2GeoLfo1),
            ("/gravity/block2/fb2/lfo/resetGeo2", BlockId::Fb2GeoLfo2),
            ("/gravity/block2/fb2/resetColor", BlockId::Fb2Color),
            ("/gravity/block2/fb2/lfo/resetColor", BlockId::Fb2ColorLfo),
            ("/gravity/block2/fb2/resetFilters", BlockId::Fb2Filters),
            ("/gravity/block3/b1/resetGeo", BlockId::B1Geo),
            ("/gravity/block3/b1/lfo/resetGeo1", BlockId::B1GeoLfo1),
            ("/gravity/block3/b1/lfo/resetGeo2", BlockId::B1GeoLfo2),
            ("/gravity/block3/b1/resetColorize", BlockId::B1Colorize),
            ("/gravity/block3/b1/lfo/resetColorize1", BlockId::B1ColorizeLfo1),
            ("/gravity/block3/b1/lfo/resetColorize2", BlockId::B1ColorizeLfo2),
            ("/gravity/block3/b1/lfo/resetColorize3", BlockId::B1ColorizeLfo3),
            ("/gravity/block3/b1/resetFilters", BlockId::B1Filters),
            ("/gravity/block3/b2/resetGeo", BlockId::B2Geo),
            ("/gravity/block3/b2/lfo/resetGeo1", BlockId::B2GeoLfo1),
            ("/gravity/block3/b2/lfo/resetGeo2", BlockId::B2GeoLfo2),
            ("/gravity/block3/b2/resetColorize", BlockId::B2Colorize),
            ("/gravity/block3/b2/lfo/resetColorize1", BlockId::B2ColorizeLfo1),
            ("/gravity/block3/b2/lfo/resetColorize2", BlockId::B2ColorizeLfo2),
            ("/gravity/block3/b2/lfo/resetColorize3", BlockId::B2ColorizeLfo3),
            ("/gravity/block3/b2/resetFilters", BlockId::B2Filters),
            ("/gravity/block3/matrixMix/reset", BlockId::MatrixMix),
            ("/gravity/block3/matrixMix/lfo/reset1", BlockId::MatrixMixLfo1),
            ("/gravity/block3/matrixMix/lfo/reset2", BlockId::MatrixMixLfo2),
            ("/gravity/block3/final/resetMixAndKey", BlockId::FinalMixAndKey),
            ("/gravity/block3/final/lfo/reset", BlockId::FinalMixAndKeyLfo),
        ];
        for (addr, block) in resets {
            self.insert(addr.to_string(), Target::ResetBlock(*block), false);
        }

        let groups: &[(&str, &'static [BlockId])] = &[
            ("/gravity/block1/resetAll", &BlockId::BLOCK1_MEMBERS),
            ("/gravity/block1/resetInputs", &BlockId::BLOCK1_INPUT_MEMBERS),
            ("/gravity/block1/fb1/resetAll", &BlockId::FB1_MEMBERS),
            ("/gravity/block2/resetAll", &BlockId::BLOCK2_MEMBERS),
            ("/gravity/block2/resetInput", &BlockId::BLOCK2_INPUT_MEMBERS),
            ("/gravity/block2/fb2/resetAll", &BlockId::FB2_MEMBERS),
            ("/gravity/block3/resetAll", &BlockId::BLOCK3_MEMBERS),
        ];
        for (addr, members) in groups {
            self.insert(addr.to_string(), Target::ResetGroup(members), false);
        }

        let flags: &[(&str, CommandFn)] = &[
            ("/gravity/resetAll", |s| s.commands.reset_all = true),
            ("/gravity/sendAll", |s| s.commands.send_all = true),
            ("/gravity/block1/fb1/clear", |s| s.commands.fb1_clear = true),
            ("/gravity/block2/fb2/clear", |s| s.commands.fb2_clear = true),
            ("/gravity/macro/reset", |s| s.commands.macro_reset = true),
            ("/gravity/macro/resetAssignments", |s| {
                s.commands.macro_reset_assignments = true
            }),
            ("/gravity/preset/load", |s| s.commands.preset.load = true),
            ("/gravity/preset/save", |s| s.commands.preset.save = true),
        ];
        for (addr, f) in flags {
            self.command(addr, *f);
        }

        let int_commands: &[(&str, IntCommandFn)] = &[
            ("/gravity/preset/selectLoad", |s, v| {
                s.commands.preset.select_load = Some(v)
            }),
            ("/gravity/preset/selectSave", |s, v| {
                s.commands.preset.select_save = Some(v)
            }),
            ("/gravity/preset/saveBank/index", |s, v| {
                s.commands.preset.save_bank_index = Some(v)
            }),
            ("/gravity/preset/loadBank/index", |s, v| {
                s.commands.preset.load_bank_index = Some(v)
            }),
        ];
        for (addr, f) in int_commands {
            self.int_command(addr, *f);
        }

        let string_commands: &[(&str, StringCommandFn)] = &[
            ("/gravity/preset/saveBank/name", |s, v| {
                s.commands.preset.save_bank_name = Some(v.to_string())
            }),
            ("/gravity/preset/loadBank/name", |s, v| {
                s.commands.preset.load_bank_name = Some(v.to_string())
            }),
            ("/gravity/preset/saveAs", |s, v| {
                s.commands.preset.save_as = Some(v.to_string())
            }),
        ];
        for (addr, f) in string_commands {
            self.string_command(addr, *f);
        }
    }

    /// Applies one inbound message. Unknown addresses and malformed payloads
    /// are reported to the caller for logging; neither is an error.
    pub fn dispatch(&self, store: &mut ParamStore, addr: &str, args: &[OscType]) -> Dispatch {
        self.apply(store, addr, args, false)
    }

    /// Like [`dispatch`], but slot writes also raise the slot's MIDI-active
    /// flag so the display layer can show hardware takeover.
    ///
    /// [`dispatch`]: Registry::dispatch
    pub fn dispatch_midi(&self, store: &mut ParamStore, addr: &str, value: f32) -> Dispatch {
        self.apply(store, addr, &[OscType::Float(value)], true)
    }

    fn apply(
        &self,
        store: &mut ParamStore,
        addr: &str,
        args: &[OscType],
        from_midi: bool,
    ) -> Dispatch {
        let target = match self.entries.get(addr) {
            Some(t) => t,
            None => return Dispatch::Unknown,
        };
        match target {
            Target::Slot { block, index } => match float_arg(args) {
                Some(v) => {
                    store.set(*block, *index, v);
                    if from_midi {
                        store.block_mut(*block).set_midi_active(*index, true);
                    }
                    Dispatch::Handled
                }
                None => Dispatch::Malformed,
            },
            Target::Toggle(access) => match float_arg(args) {
                Some(v) => {
                    *access(store) = v > 0.5;
                    Dispatch::Handled
                }
                None => Dispatch::Malformed,
            },
            Target::Select { access, clamp } => match float_arg(args) {
                Some(v) => {
                    let mut value = v as i32;
                    if let Some((lo, hi)) = clamp {
                        value = value.clamp(*lo, *hi);
                    }
                    *access(store) = value;
                    Dispatch::Handled
                }
                None => Dispatch::Malformed,
            },
            Target::ResetBlock(block) => {
                store.block_mut(*block).request_reset();
                Dispatch::Handled
            }
            Target::ResetGroup(members) => {
                store.request_group_reset(members);
                Dispatch::Handled
            }
            Target::Command(f) => {
                f(store);
                Dispatch::Handled
            }
            Target::IntCommand(f) => match float_arg(args) {
                Some(v) => {
                    f(store, v as i32);
                    Dispatch::Handled
                }
                None => Dispatch::Malformed,
            },
            Target::StringCommand(f) => match string_arg(args) {
                Some(s) => {
                    f(store, s);
                    Dispatch::Handled
                }
                None => Dispatch::Malformed,
            },
        }
    }

    /// Current value of every dumpable address under `prefix`, in
    /// registration order.
    pub fn dump(&self, store: &mut ParamStore, prefix: &str) -> Vec<(String, f32)> {
        let mut out = Vec::new();
        for addr in &self.order {
            if !addr.starts_with(prefix) {
                continue;
            }
            if let Some(value) = self.read_value(store, addr) {
                out.push((addr.clone(), value));
            }
        }
        out
    }

    fn read_value(&self, store: &mut ParamStore, addr: &str) -> Option<f32> {
        match self.entries.get(addr)? {
            Target::Slot { block, index } => Some(store.get(*block, *index)),
            Target::Toggle(access) => Some(if *access(store) { 1.0 } else { 0.0 }),
            Target::Select { access, .. } => Some(*access(store) as f32),
            _ => None,
        }
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.entries.contains_key(addr)
    }

    pub fn dumpable_len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Registry, ParamStore) {
        (Registry::build(), ParamStore::new())
    }

    #[test]
    fn float_dispatch_sets_slot() {
        let (reg, mut store) = setup();
        let r = reg.dispatch(
            &mut store,
            "/gravity/block1/ch1/xDisplace",
            &[OscType::Float(0.42)],
        );
        assert_eq!(r, Dispatch::Handled);
        assert_eq!(store.get(BlockId::Ch1Adjust, 0), 0.42);
    }

    #[test]
    fn dispatch_is_idempotent() {
        let (reg, mut store) = setup();
        for _ in 0..3 {
            reg.dispatch(
                &mut store,
                "/gravity/block3/final/mixAmount",
                &[OscType::Float(0.8)],
            );
        }
        assert_eq!(store.get(BlockId::FinalMixAndKey, 0), 0.8);
    }

    #[test]
    fn bool_narrowing_uses_half_threshold() {
        let (reg, mut store) = setup();
        reg.dispatch(&mut store, "/gravity/block1/fb1/hypercube", &[OscType::Float(0.6)]);
        assert!(store.toggles.fb1_hypercube);
        reg.dispatch(&mut store, "/gravity/block1/fb1/hypercube", &[OscType::Float(0.4)]);
        assert!(!store.toggles.fb1_hypercube);
    }

    #[test]
    fn int_narrowing_truncates_and_clamps() {
        let (reg, mut store) = setup();
        reg.dispatch(&mut store, "/gravity/block1/fb1/delayTime", &[OscType::Float(14.9)]);
        assert_eq!(store.selects.fb1_delay_time, 14);
        reg.dispatch(&mut store, "/gravity/settings/fps", &[OscType::Float(999.0)]);
        assert_eq!(store.target_fps, 60);
        reg.dispatch(&mut store, "/gravity/settings/fps", &[OscType::Float(0.0)]);
        assert_eq!(store.target_fps, 1);
        reg.dispatch(&mut store, "/gravity/ui/scale", &[OscType::Int(7)]);
        assert_eq!(store.selects.ui_scale, 2);
    }

    #[test]
    fn unknown_address_is_reported_not_fatal() {
        let (reg, mut store) = setup();
        let r = reg.dispatch(&mut store, "/gravity/nope/nothing", &[OscType::Float(1.0)]);
        assert_eq!(r, Dispatch::Unknown);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let (reg, mut store) = setup();
        let r = reg.dispatch(&mut store, "/gravity/block1/ch1/xDisplace", &[]);
        assert_eq!(r, Dispatch::Malformed);
        assert_eq!(store.get(BlockId::Ch1Adjust, 0), 0.0);
        let r = reg.dispatch(
            &mut store,
            "/gravity/preset/saveAs",
            &[OscType::Float(1.0)],
        );
        assert_eq!(r, Dispatch::Malformed);
        assert!(store.commands.preset.save_as.is_none());
    }

    #[test]
    fn reset_commands_raise_block_flags() {
        let (reg, mut store) = setup();
        reg.dispatch(&mut store, "/gravity/block1/ch1/resetAdjust", &[OscType::Float(1.0)]);
        assert!(store.block(BlockId::Ch1Adjust).reset_requested());
        reg.dispatch(&mut store, "/gravity/block1/fb1/resetAll", &[OscType::Float(1.0)]);
        for id in BlockId::FB1_MEMBERS {
            assert!(store.block(id).reset_requested());
        }
    }

    #[test]
    fn string_commands_carry_their_payload() {
        let (reg, mut store) = setup();
        reg.dispatch(
            &mut store,
            "/gravity/preset/saveAs",
            &[OscType::String("sunset drift".into())],
        );
        assert_eq!(store.commands.preset.save_as.as_deref(), Some("sunset drift"));
        reg.dispatch(
            &mut store,
            "/gravity/preset/selectLoad",
            &[OscType::Float(3.0)],
        );
        assert_eq!(store.commands.preset.select_load, Some(3));
    }

    #[test]
    fn legacy_addresses_route_to_their_original_slots() {
        let (reg, mut store) = setup();
        let cases: &[(&str, BlockId, usize)] = &[
            ("/gravity/block1/fb1/huePowmap", BlockId::Fb1Color, 6),
            ("/gravity/block1/fb1/temp2q", BlockId::Fb1Filters, 7),
            ("/gravity/block2/input/lfo/kaleidoscopeSliceRate", BlockId::InputAdjustLfo, 15),
            ("/gravity/block3/b1/colorize/brightBand5", BlockId::B1Colorize, 14),
            ("/gravity/block3/lfo/b2/saturationBand3Rate", BlockId::B2ColorizeLfo2, 4),
            ("/gravity/block3/matrixMix/b1BlueToB2Green", BlockId::MatrixMix, 7),
            ("/gravity/block3/lfo/matrixMix/b1GreenToB2BlueRate", BlockId::MatrixMixLfo1, 11),
            ("/gravity/block3/final/keyInvert", BlockId::FinalMixAndKey, 3),
            ("/gravity/macro/value/15", BlockId::MacroValues, 15),
        ];
        for (addr, block, index) in cases {
            let r = reg.dispatch(&mut store, addr, &[OscType::Float(0.5)]);
            assert_eq!(r, Dispatch::Handled, "{addr} not handled");
            assert_eq!(store.get(*block, *index), 0.5, "{addr} landed wrong");
            store.set(*block, *index, 0.0);
        }
    }

    #[test]
    fn dump_respects_prefix_and_registration_order() {
        let (reg, mut store) = setup();
        store.set(BlockId::FinalMixAndKey, 0, 0.9);
        store.selects.final_key_mode = 2;
        let dump = reg.dump(&mut store, "/gravity/block3/final");
        // Six mix/key floats plus four selects; commands are not dumped.
        assert_eq!(dump.len(), 10);
        assert_eq!(dump[0].0, "/gravity/block3/final/mixAmount");
        assert_eq!(dump[0].1, 0.9);
        assert!(dump.iter().any(|(a, v)| a == "/gravity/block3/final/keyMode" && *v == 2.0));
        assert!(dump.iter().all(|(a, _)| a.starts_with("/gravity/block3/final")));

        // Block floats come before toggles/selects within the full dump.
        let all = reg.dump(&mut store, "/gravity");
        assert_eq!(all.len(), reg.dumpable_len());
    }

    #[test]
    fn midi_dispatch_marks_takeover() {
        let (reg, mut store) = setup();
        reg.dispatch_midi(&mut store, "/gravity/block1/ch1/rotate", 0.25);
        assert_eq!(store.get(BlockId::Ch1Adjust, 3), 0.25);
        assert!(store.block(BlockId::Ch1Adjust).midi_active(3));
        // Plain OSC writes do not.
        reg.dispatch(&mut store, "/gravity/block1/ch1/xDisplace", &[OscType::Float(0.1)]);
        assert!(!store.block(BlockId::Ch1Adjust).midi_active(0));
    }
}

