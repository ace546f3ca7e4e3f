mod config;
mod engine;
mod lfo;
mod logging;
mod macros;
mod midi;
mod osc;
mod params;
mod presets;
mod registry;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::engine::Engine;
use crate::midi::MidiBridge;
use crate::osc::OscTransport;

fn settings_path() -> PathBuf {
    std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("settings.json"))
}

fn main() -> Result<()> {
    let path = settings_path();
    let settings = config::load_settings(&path);
    logi!("APP", "gravity starting (settings: {})", path.display());

    let mut engine = Engine::new(&settings);
    logi!(
        "APP",
        "registry holds {} dumpable addresses, bank '{}' with {} presets",
        engine.registry.dumpable_len(),
        engine.presets.bank(),
        engine.presets.presets().len()
    );

    let mut osc = OscTransport::new(settings.osc.clone());
    if let Err(e) = osc.start() {
        loge!("OSC", "transport failed to start: {e:#}");
    }
    let mut midi = MidiBridge::connect(&settings.midi);

    let mut next_frame = Instant::now();
    loop {
        let outputs = engine.update(&mut osc, &mut midi);
        if outputs.fb1_clear {
            logi!("APP", "fb1 clear");
        }
        if outputs.fb2_clear {
            logi!("APP", "fb2 clear");
        }

        let period = Duration::from_secs_f64(1.0 / f64::from(engine.target_fps().max(1)));
        next_frame += period;
        let now = Instant::now();
        if next_frame > now {
            std::thread::sleep(next_frame - now);
        } else {
            // Fell behind (blocking preset I/O, clock jump). Don't try to
            // catch up with a burst of frames.
            next_frame = now;
        }
    }
}
