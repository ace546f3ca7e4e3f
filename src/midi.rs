//! MIDI CC bridge.
//!
//! The midir callback runs on the driver's thread; events cross to the
//! render thread over an unbounded channel and are drained once per frame.
//! Mappings address parameters by their OSC address, so MIDI rides the same
//! registry as network control and gets the same typed narrowing. Slot
//! writes arriving this way raise the slot's MIDI-active flag.

use crossbeam_channel::{Receiver, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection};

use crate::config::{CcMapping, MidiSettings};
use crate::params::ParamStore;
use crate::registry::{Dispatch, Registry};
use crate::{logi, logw};

#[derive(Debug, Clone, Copy)]
pub struct CcEvent {
    pub channel: u8,
    pub cc: u8,
    pub value: u8,
}

pub struct MidiBridge {
    rx: Receiver<CcEvent>,
    mappings: Vec<CcMapping>,
    _conn: Option<MidiInputConnection<()>>,
}

/// Scales a 7-bit CC value into the mapping's range.
fn scale(value: u8, min: f32, max: f32) -> f32 {
    let t = f32::from(value) / 127.0;
    min + t * (max - min)
}

fn open_input(settings: &MidiSettings, tx: Sender<CcEvent>) -> Option<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new("gravity-midi").ok()?;
    midi_in.ignore(Ignore::None);

    let ports = midi_in.ports();
    if ports.is_empty() {
        logi!("MIDI", "No MIDI input ports detected.");
        return None;
    }

    let preferred = settings
        .preferred_device_contains
        .as_ref()
        .map(|s| s.to_lowercase());

    let mut chosen = ports.first().cloned();
    if let Some(pref) = preferred {
        for p in &ports {
            if let Ok(name) = midi_in.port_name(p) {
                if name.to_lowercase().contains(&pref) {
                    chosen = Some(p.clone());
                    break;
                }
            }
        }
    }

    let in_port = chosen?;
    let port_name = midi_in.port_name(&in_port).unwrap_or_else(|_| "Unknown".into());
    logi!("MIDI", "Connecting input: {}", port_name);

    let conn = midi_in.connect(
        &in_port,
        "gravity-midi-in",
        move |_ts, msg, _| {
            if msg.len() == 3 && (msg[0] & 0xF0) == 0xB0 {
                let _ = tx.send(CcEvent {
                    channel: msg[0] & 0x0F,
                    cc: msg[1],
                    value: msg[2],
                });
            }
        },
        (),
    );

    match conn {
        Ok(c) => Some(c),
        Err(e) => {
            logw!("MIDI", "Failed to connect MIDI input: {e}");
            None
        }
    }
}

impl MidiBridge {
    pub fn connect(settings: &MidiSettings) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let conn = if settings.enabled {
            open_input(settings, tx)
        } else {
            None
        };
        Self {
            rx,
            mappings: settings.mappings.clone(),
            _conn: conn,
        }
    }

    /// Applies every queued CC event. Returns how many were mapped.
    pub fn drain(&mut self, store: &mut ParamStore, registry: &Registry) -> usize {
        let mut mapped = 0;
        while let Ok(event) = self.rx.try_recv() {
            let mapping = self
                .mappings
                .iter()
                .find(|m| m.channel == event.channel && m.cc == event.cc);
            match mapping {
                Some(m) => {
                    let value = scale(event.value, m.min, m.max);
                    match registry.dispatch_midi(store, &m.addr, value) {
                        Dispatch::Handled => mapped += 1,
                        _ => {
                            logw!("MIDI", "mapping for cc={} points at bad address {}", event.cc, m.addr);
                        }
                    }
                }
                None => {
                    logi!(
                        "MIDI",
                        "unmapped ch={} cc={} val={}",
                        event.channel,
                        event.cc,
                        event.value
                    );
                }
            }
        }
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BlockId;

    fn bridge_with(mappings: Vec<CcMapping>) -> (Sender<CcEvent>, MidiBridge) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            tx,
            MidiBridge {
                rx,
                mappings,
                _conn: None,
            },
        )
    }

    #[test]
    fn cc_scaling_covers_the_mapped_range() {
        assert_eq!(scale(0, 0.0, 1.0), 0.0);
        assert_eq!(scale(127, 0.0, 1.0), 1.0);
        assert_eq!(scale(127, -1.0, 1.0), 1.0);
        assert!((scale(64, 0.0, 1.0) - 64.0 / 127.0).abs() < 1e-6);
        // Inverted ranges work too.
        assert_eq!(scale(0, 1.0, 0.0), 1.0);
    }

    #[test]
    fn drain_routes_through_the_registry_and_marks_takeover() {
        let registry = Registry::build();
        let mut store = ParamStore::new();
        let (tx, mut bridge) = bridge_with(vec![CcMapping {
            channel: 0,
            cc: 21,
            addr: "/gravity/block1/ch1/rotate".into(),
            min: 0.0,
            max: 2.0,
        }]);

        tx.send(CcEvent { channel: 0, cc: 21, value: 127 }).expect("send");
        assert_eq!(bridge.drain(&mut store, &registry), 1);
        assert_eq!(store.get(BlockId::Ch1Adjust, 3), 2.0);
        assert!(store.block(BlockId::Ch1Adjust).midi_active(3));
    }

    #[test]
    fn unmapped_events_are_skipped() {
        let registry = Registry::build();
        let mut store = ParamStore::new();
        let (tx, mut bridge) = bridge_with(vec![]);
        tx.send(CcEvent { channel: 3, cc: 7, value: 64 }).expect("send");
        assert_eq!(bridge.drain(&mut store, &registry), 0);
    }
}
