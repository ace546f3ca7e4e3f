//! Per-frame orchestration.
//!
//! Update order matters and is fixed:
//!   1. drain queued MIDI CC events
//!   2. pump the OSC receive socket
//!   3. consume one-shot commands raised by 1 and 2
//!   4. apply pending block resets
//!   5. advance LFO phases and resolve the frame (base + offsets)
//!   6. overlay macro bindings (always last, so a bound slot shows its
//!      macro value even when something wrote the slot this same frame)
//!   7. emit delay-time telemetry
//!
//! The resolved frame is what the render layer uploads; the store keeps
//! clean base values throughout.

use crate::config::Settings;
use crate::lfo::LfoEngine;
use crate::logi;
use crate::macros::{self, MacroBank};
use crate::midi::MidiBridge;
use crate::osc::OscTransport;
use crate::params::{BlockId, Commands, ParamStore, ResolvedFrame, Selects, Toggles, FPS_RANGE};
use crate::presets::{PresetManager, Snapshot};
use crate::registry::Registry;

/// Frame side effects the render layer acts on.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameOutputs {
    pub fb1_clear: bool,
    pub fb2_clear: bool,
    pub fps_changed: Option<i32>,
}

pub struct Engine {
    pub store: ParamStore,
    pub lfo: LfoEngine,
    pub macros: MacroBank,
    pub registry: Registry,
    pub presets: PresetManager,
    frame: ResolvedFrame,
    applied_fps: i32,
    load_index: i32,
    save_index: i32,
    last_fb1_delay: i32,
    last_fb2_delay: i32,
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

impl Engine {
    pub fn new(settings: &Settings) -> Engine {
        let mut store = ParamStore::new();
        store.target_fps = settings.target_fps.clamp(FPS_RANGE.0, FPS_RANGE.1);
        let applied_fps = store.target_fps;
        Engine {
            store,
            lfo: LfoEngine::new(),
            macros: MacroBank::new(),
            registry: Registry::build(),
            presets: PresetManager::new(&settings.presets_dir),
            frame: ResolvedFrame::new(),
            applied_fps,
            load_index: 0,
            save_index: 0,
            last_fb1_delay: 0,
            last_fb2_delay: 0,
        }
    }

    pub fn target_fps(&self) -> i32 {
        self.applied_fps
    }

    pub fn resolved(&self) -> &ResolvedFrame {
        &self.frame
    }

    pub fn update(&mut self, osc: &mut OscTransport, midi: &mut MidiBridge) -> FrameOutputs {
        midi.drain(&mut self.store, &self.registry);
        osc.pump(&mut self.store, &self.registry);

        let commands = std::mem::take(&mut self.store.commands);
        let mut outputs = FrameOutputs {
            fb1_clear: commands.fb1_clear,
            fb2_clear: commands.fb2_clear,
            fps_changed: None,
        };

        self.consume_commands(&commands, osc);

        self.store.apply_resets();

        if self.store.target_fps != self.applied_fps {
            self.applied_fps = self.store.target_fps;
            outputs.fps_changed = Some(self.applied_fps);
            logi!("APP", "target fps -> {}", self.applied_fps);
        }

        self.lfo.advance(&self.store);
        self.frame.load_base(&self.store);
        self.lfo.apply(&self.store, &mut self.frame);
        self.macros.apply(&self.store, &mut self.frame);

        self.send_delay_telemetry(osc);

        outputs
    }

    fn consume_commands(&mut self, commands: &Commands, osc: &mut OscTransport) {
        if commands.reset_all {
            for id in BlockId::ALL {
                self.store.block_mut(id).request_reset();
            }
            self.store.toggles = Toggles::default();
            self.store.selects = Selects::default();
            logi!("APP", "resetAll");
        }

        if commands.macro_reset {
            macros::reset_values(&mut self.store);
        }
        if commands.macro_reset_assignments {
            self.macros.reset_assignments();
        }

        if commands.preset.any() {
            self.consume_preset_commands(commands);
        }

        if commands.send_all {
            osc.send_all(&mut self.store, &self.registry);
        }
    }

    fn consume_preset_commands(&mut self, commands: &Commands) {
        let preset = &commands.preset;
        if let Some(index) = preset.select_load {
            self.load_index = index;
        }
        if let Some(index) = preset.select_save {
            self.save_index = index;
        }
        if let Some(index) = preset.save_bank_index {
            self.presets.select_bank_by_index(index);
        }
        if let Some(name) = &preset.save_bank_name {
            self.presets.select_bank_by_name(name);
        }
        if let Some(index) = preset.load_bank_index {
            self.presets.select_bank_by_index(index);
        }
        if let Some(name) = &preset.load_bank_name {
            self.presets.select_bank_by_name(name);
        }

        if preset.load {
            if let Some(snapshot) = self.presets.load(self.load_index) {
                snapshot.apply(&mut self.store, &mut self.macros);
            }
        }
        if preset.save {
            let snapshot = Snapshot::capture(&self.store, &self.macros);
            self.presets.save(self.save_index, &snapshot);
        }
        if let Some(name) = &preset.save_as {
            let snapshot = Snapshot::capture(&self.store, &self.macros);
            self.presets.save_as(name, &snapshot);
        }
    }

    /// Controllers display feedback delay in seconds, so a changed delay
    /// time is echoed back as `delayFrames / fps` rounded to 2 decimals.
    fn send_delay_telemetry(&mut self, osc: &OscTransport) {
        let fps = self.applied_fps.max(1) as f32;
        let fb1 = self.store.selects.fb1_delay_time;
        if fb1 != self.last_fb1_delay {
            self.last_fb1_delay = fb1;
            osc.send_value("/gravity/block1/fb1/secDelay", round2(fb1 as f32 / fps));
        }
        let fb2 = self.store.selects.fb2_delay_time;
        if fb2 != self.last_fb2_delay {
            self.last_fb2_delay = fb2;
            osc.send_value("/gravity/block2/fb2/secDelay", round2(fb2 as f32 / fps));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MidiSettings, OscSettings};
    use rosc::OscType;

    fn test_engine() -> (Engine, OscTransport, MidiBridge) {
        let settings = Settings {
            presets_dir: std::env::temp_dir()
                .join(format!("gravity-engine-{}", std::process::id()))
                .to_string_lossy()
                .into_owned(),
            ..Settings::default()
        };
        let engine = Engine::new(&settings);
        let osc = OscTransport::new(OscSettings {
            enabled: false,
            ..OscSettings::default()
        });
        let midi = MidiBridge::connect(&MidiSettings::default());
        (engine, osc, midi)
    }

    fn dispatch(engine: &mut Engine, addr: &str, value: f32) {
        let r = engine
            .registry
            .dispatch(&mut engine.store, addr, &[OscType::Float(value)]);
        assert_eq!(r, crate::registry::Dispatch::Handled, "{addr}");
    }

    #[test]
    fn reset_is_applied_exactly_once() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/block1/ch1/xDisplace", 0.8);
        dispatch(&mut engine, "/gravity/block1/ch1/resetAdjust", 1.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.store.get(BlockId::Ch1Adjust, 0), 0.0);

        // A write after the consumed reset must stick.
        dispatch(&mut engine, "/gravity/block1/ch1/xDisplace", 0.3);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.store.get(BlockId::Ch1Adjust, 0), 0.3);
    }

    #[test]
    fn reset_all_clears_blocks_toggles_and_selects_but_not_fps() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/block3/matrixMix/b1RedToB2Red", 1.0);
        dispatch(&mut engine, "/gravity/block1/fb1/hypercube", 1.0);
        dispatch(&mut engine, "/gravity/block1/fb1/delayTime", 10.0);
        dispatch(&mut engine, "/gravity/settings/fps", 45.0);
        engine.update(&mut osc, &mut midi);

        dispatch(&mut engine, "/gravity/resetAll", 1.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.store.get(BlockId::MatrixMix, 0), 0.0);
        assert!(!engine.store.toggles.fb1_hypercube);
        assert_eq!(engine.store.selects.fb1_delay_time, 0);
        assert_eq!(engine.target_fps(), 45);
    }

    #[test]
    fn macro_override_is_the_final_step() {
        let (mut engine, mut osc, mut midi) = test_engine();
        engine.macros.bind(BlockId::Ch1Adjust, 3, 0);
        dispatch(&mut engine, "/gravity/macro/value/0", 0.9);
        // Direct write and an active LFO on the same slot, same frame.
        dispatch(&mut engine, "/gravity/block1/ch1/rotate", 0.1);
        dispatch(&mut engine, "/gravity/block1/ch1/lfo/rotateAmp", 1.0);
        dispatch(&mut engine, "/gravity/block1/ch1/lfo/rotateRate", 1.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.resolved().get(BlockId::Ch1Adjust, 3), 0.9);
        // The store keeps the clean base value underneath the overlay.
        assert_eq!(engine.store.get(BlockId::Ch1Adjust, 3), 0.1);
    }

    #[test]
    fn macro_reset_commands_stay_independent() {
        let (mut engine, mut osc, mut midi) = test_engine();
        engine.macros.bind(BlockId::Fb1Geo, 0, 2);
        dispatch(&mut engine, "/gravity/macro/value/2", 0.5);
        engine.update(&mut osc, &mut midi);

        dispatch(&mut engine, "/gravity/macro/reset", 1.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.store.get(BlockId::MacroValues, 2), 0.0);
        assert_eq!(engine.macros.binding(BlockId::Fb1Geo, 0), Some(2));

        dispatch(&mut engine, "/gravity/macro/resetAssignments", 1.0);
        engine.update(&mut osc, &mut midi);
        assert!(engine.macros.is_empty());
    }

    #[test]
    fn fps_change_is_reported_once() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/settings/fps", 24.0);
        let out = engine.update(&mut osc, &mut midi);
        assert_eq!(out.fps_changed, Some(24));
        let out = engine.update(&mut osc, &mut midi);
        assert_eq!(out.fps_changed, None);
        assert_eq!(engine.target_fps(), 24);
    }

    #[test]
    fn fb_clear_flags_are_edge_triggered() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/block1/fb1/clear", 1.0);
        let out = engine.update(&mut osc, &mut midi);
        assert!(out.fb1_clear);
        assert!(!out.fb2_clear);
        let out = engine.update(&mut osc, &mut midi);
        assert!(!out.fb1_clear);
    }

    #[test]
    fn delay_telemetry_tracks_changes_only() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/block1/fb1/delayTime", 15.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.last_fb1_delay, 15);
        // 15 frames at 30 fps is half a second.
        assert_eq!(round2(15.0 / 30.0), 0.5);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.last_fb1_delay, 15);
    }

    #[test]
    fn preset_save_and_load_round_trip_through_commands() {
        let (mut engine, mut osc, mut midi) = test_engine();
        dispatch(&mut engine, "/gravity/block1/fb1/mixAmount", 0.77);
        engine
            .registry
            .dispatch(
                &mut engine.store,
                "/gravity/preset/saveAs",
                &[OscType::String("engine_test".into())],
            );
        engine.update(&mut osc, &mut midi);

        dispatch(&mut engine, "/gravity/block1/fb1/mixAmount", 0.0);
        let index = engine
            .presets
            .presets()
            .iter()
            .position(|p| p == "engine_test")
            .expect("saved preset") as f32;
        dispatch(&mut engine, "/gravity/preset/selectLoad", index);
        dispatch(&mut engine, "/gravity/preset/load", 1.0);
        engine.update(&mut osc, &mut midi);
        assert_eq!(engine.store.get(BlockId::Fb1MixAndKey, 0), 0.77);
    }
}
