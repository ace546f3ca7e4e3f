//! Runtime settings (`settings.json`).
//!
//! Parsing is lenient on purpose: unknown fields are ignored and missing
//! fields take defaults, so old settings files keep working across versions.

use std::path::Path;

use serde::Deserialize;

use crate::logw;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub osc: OscSettings,

    #[serde(default)]
    pub midi: MidiSettings,

    #[serde(default = "default_presets_dir")]
    pub presets_dir: String,

    #[serde(default = "default_fps")]
    pub target_fps: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OscSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_receive_port")]
    pub receive_port: u16,

    #[serde(default = "default_send_host")]
    pub send_host: String,

    #[serde(default = "default_send_port")]
    pub send_port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MidiSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Case-insensitive substring match against input port names.
    #[serde(default)]
    pub preferred_device_contains: Option<String>,

    #[serde(default)]
    pub mappings: Vec<CcMapping>,
}

/// One CC binding: incoming 0..127 is scaled into `min..max` and dispatched
/// to `addr` through the parameter registry.
#[derive(Debug, Clone, Deserialize)]
pub struct CcMapping {
    pub channel: u8,
    pub cc: u8,
    pub addr: String,

    #[serde(default)]
    pub min: f32,

    #[serde(default = "default_one")]
    pub max: f32,
}

fn default_true() -> bool {
    true
}

fn default_receive_port() -> u16 {
    7000
}

fn default_send_host() -> String {
    "127.0.0.1".into()
}

fn default_send_port() -> u16 {
    7001
}

fn default_presets_dir() -> String {
    "presets".into()
}

fn default_fps() -> i32 {
    crate::params::DEFAULT_FPS
}

fn default_one() -> f32 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            osc: OscSettings::default(),
            midi: MidiSettings::default(),
            presets_dir: default_presets_dir(),
            target_fps: default_fps(),
        }
    }
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            receive_port: default_receive_port(),
            send_host: default_send_host(),
            send_port: default_send_port(),
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let data = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return Settings::default(),
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(cfg) => cfg,
        Err(e) => {
            logw!(
                "CFG",
                "Failed to parse settings ({}): {}. Using defaults.",
                path.display(),
                e
            );
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg: Settings = serde_json::from_str("{}").expect("parse");
        assert!(cfg.osc.enabled);
        assert_eq!(cfg.osc.receive_port, 7000);
        assert_eq!(cfg.osc.send_port, 7001);
        assert_eq!(cfg.osc.send_host, "127.0.0.1");
        assert_eq!(cfg.target_fps, 30);
        assert_eq!(cfg.presets_dir, "presets");
        assert!(!cfg.midi.enabled);
    }

    #[test]
    fn partial_settings_fill_in() {
        let cfg: Settings = serde_json::from_str(
            r#"{
                "osc": { "receive_port": 9000 },
                "midi": {
                    "enabled": true,
                    "mappings": [
                        { "channel": 0, "cc": 21, "addr": "/gravity/block1/ch1/rotate" }
                    ]
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(cfg.osc.receive_port, 9000);
        assert_eq!(cfg.osc.send_port, 7001);
        assert!(cfg.midi.enabled);
        assert_eq!(cfg.midi.mappings.len(), 1);
        assert_eq!(cfg.midi.mappings[0].min, 0.0);
        assert_eq!(cfg.midi.mappings[0].max, 1.0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let cfg: Settings =
            serde_json::from_str(r#"{ "future_feature": { "x": 1 }, "target_fps": 24 }"#)
                .expect("parse");
        assert_eq!(cfg.target_fps, 24);
    }
}
