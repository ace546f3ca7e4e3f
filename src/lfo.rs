//! Control-rate LFO engine.
//!
//! Every modulatable slot has a route: an (amp, rate, shape) triple read from
//! an LFO block, plus a private phase accumulator. Each frame the phase
//! advances by `RATE_COEFF * rate` and the route contributes
//! `amp * waveform(shape, theta)` on top of the target's base value. The
//! offset is bounded by |amp| since every waveform stays within [-1, 1].
//!
//! Phases are wrapped modulo 2π on every advance; an unbounded accumulator
//! slowly loses f32 precision at high rates.

use std::f32::consts::PI;

use crate::params::{BlockId, ParamStore, ResolvedFrame};

/// Phase increment per frame is `RATE_COEFF * rate`, with rate in block units.
pub const RATE_COEFF: f32 = 0.15;

const TAU: f32 = 2.0 * PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    Sine,
    Triangle,
    Ramp,
    Saw,
    Square,
}

impl WaveShape {
    /// Presets store shapes as small ints. Unknown values fall back to Sine
    /// so an old or hand-edited file never breaks modulation.
    pub fn from_index(index: i32) -> WaveShape {
        match index {
            1 => WaveShape::Triangle,
            2 => WaveShape::Ramp,
            3 => WaveShape::Saw,
            4 => WaveShape::Square,
            _ => WaveShape::Sine,
        }
    }

    pub fn to_index(self) -> i32 {
        match self {
            WaveShape::Sine => 0,
            WaveShape::Triangle => 1,
            WaveShape::Ramp => 2,
            WaveShape::Saw => 3,
            WaveShape::Square => 4,
        }
    }
}

/// Unit-amplitude waveform at phase `theta`.
pub fn waveform(shape: WaveShape, theta: f32) -> f32 {
    match shape {
        WaveShape::Sine => theta.sin(),
        WaveShape::Triangle => (2.0 / PI) * theta.sin().asin(),
        WaveShape::Ramp => (2.0 / TAU) * (theta + PI).rem_euclid(TAU) - 1.0,
        WaveShape::Saw => 1.0 - (2.0 / TAU) * (theta + PI).rem_euclid(TAU),
        WaveShape::Square => {
            let s = theta.sin();
            if s > 0.0 {
                1.0
            } else if s < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
    }
}

pub fn evaluate(amp: f32, theta: f32, shape: WaveShape) -> f32 {
    amp * waveform(shape, theta)
}

/// One modulation route: where the amp/rate/shape live and which slot the
/// offset lands on.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub lfo: BlockId,
    pub amp: usize,
    pub rate: usize,
    /// Shape slot within the LFO block (one per amp/rate pair or per band
    /// entry, depending on layout).
    pub shape: usize,
    pub target: BlockId,
    pub slot: usize,
}

// Target slots, in pair order, for each pair-layout LFO kind.
const ADJUST_LFO_TARGETS: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 9];
const MIX_AND_KEY_LFO_TARGETS: [usize; 3] = [0, 4, 5];
const GEO_LFO1_TARGETS: [usize; 4] = [0, 1, 2, 3];
const GEO_LFO2_TARGETS: [usize; 5] = [4, 5, 6, 7, 9];
const COLOR_LFO_TARGETS: [usize; 3] = [6, 7, 8];

fn push_pairs(routes: &mut Vec<Route>, lfo: BlockId, target: BlockId, targets: &[usize]) {
    for (pair, slot) in targets.iter().enumerate() {
        routes.push(Route {
            lfo,
            amp: pair * 2,
            rate: pair * 2 + 1,
            shape: pair,
            target,
            slot: *slot,
        });
    }
}

/// Banded layouts interleave three amps then three rates per band of three
/// targets. `first_band` positions the LFO block within the target block.
fn push_bands(
    routes: &mut Vec<Route>,
    lfo: BlockId,
    target: BlockId,
    first_band: usize,
    bands: usize,
) {
    for band in 0..bands {
        for lane in 0..3 {
            routes.push(Route {
                lfo,
                amp: band * 6 + lane,
                rate: band * 6 + 3 + lane,
                shape: band * 3 + lane,
                target,
                slot: (first_band + band) * 3 + lane,
            });
        }
    }
}

pub fn build_routes() -> Vec<Route> {
    let mut routes = Vec::new();

    push_pairs(&mut routes, BlockId::Ch1AdjustLfo, BlockId::Ch1Adjust, &ADJUST_LFO_TARGETS);
    push_pairs(&mut routes, BlockId::Ch2AdjustLfo, BlockId::Ch2Adjust, &ADJUST_LFO_TARGETS);
    push_pairs(
        &mut routes,
        BlockId::InputAdjustLfo,
        BlockId::InputAdjust,
        &ADJUST_LFO_TARGETS,
    );

    push_pairs(
        &mut routes,
        BlockId::Ch2MixAndKeyLfo,
        BlockId::Ch2MixAndKey,
        &MIX_AND_KEY_LFO_TARGETS,
    );
    push_pairs(
        &mut routes,
        BlockId::Fb1MixAndKeyLfo,
        BlockId::Fb1MixAndKey,
        &MIX_AND_KEY_LFO_TARGETS,
    );
    push_pairs(
        &mut routes,
        BlockId::Fb2MixAndKeyLfo,
        BlockId::Fb2MixAndKey,
        &MIX_AND_KEY_LFO_TARGETS,
    );
    push_pairs(
        &mut routes,
        BlockId::FinalMixAndKeyLfo,
        BlockId::FinalMixAndKey,
        &MIX_AND_KEY_LFO_TARGETS,
    );

    for (lfo1, lfo2, geo) in [
        (BlockId::Fb1GeoLfo1, BlockId::Fb1GeoLfo2, BlockId::Fb1Geo),
        (BlockId::Fb2GeoLfo1, BlockId::Fb2GeoLfo2, BlockId::Fb2Geo),
        (BlockId::B1GeoLfo1, BlockId::B1GeoLfo2, BlockId::B1Geo),
        (BlockId::B2GeoLfo1, BlockId::B2GeoLfo2, BlockId::B2Geo),
    ] {
        push_pairs(&mut routes, lfo1, geo, &GEO_LFO1_TARGETS);
        push_pairs(&mut routes, lfo2, geo, &GEO_LFO2_TARGETS);
    }

    push_pairs(&mut routes, BlockId::Fb1ColorLfo, BlockId::Fb1Color, &COLOR_LFO_TARGETS);
    push_pairs(&mut routes, BlockId::Fb2ColorLfo, BlockId::Fb2Color, &COLOR_LFO_TARGETS);

    for (lfo1, lfo2, lfo3, colorize) in [
        (
            BlockId::B1ColorizeLfo1,
            BlockId::B1ColorizeLfo2,
            BlockId::B1ColorizeLfo3,
            BlockId::B1Colorize,
        ),
        (
            BlockId::B2ColorizeLfo1,
            BlockId::B2ColorizeLfo2,
            BlockId::B2ColorizeLfo3,
            BlockId::B2Colorize,
        ),
    ] {
        push_bands(&mut routes, lfo1, colorize, 0, 2);
        push_bands(&mut routes, lfo2, colorize, 2, 2);
        push_bands(&mut routes, lfo3, colorize, 4, 1);
    }

    push_bands(&mut routes, BlockId::MatrixMixLfo1, BlockId::MatrixMix, 0, 2);
    push_bands(&mut routes, BlockId::MatrixMixLfo2, BlockId::MatrixMix, 2, 1);

    routes
}

pub struct LfoEngine {
    routes: Vec<Route>,
    thetas: Vec<f32>,
}

impl LfoEngine {
    pub fn new() -> Self {
        let routes = build_routes();
        let thetas = vec![0.0; routes.len()];
        Self { routes, thetas }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Advances every phase accumulator by one frame.
    pub fn advance(&mut self, store: &ParamStore) {
        for (route, theta) in self.routes.iter().zip(self.thetas.iter_mut()) {
            let rate = store.get(route.lfo, route.rate);
            *theta = (*theta + RATE_COEFF * rate).rem_euclid(TAU);
        }
    }

    /// Adds each route's current offset onto the resolved frame.
    pub fn apply(&self, store: &ParamStore, frame: &mut ResolvedFrame) {
        for (route, theta) in self.routes.iter().zip(self.thetas.iter()) {
            let amp = store.get(route.lfo, route.amp);
            if amp == 0.0 {
                continue;
            }
            let shape = store.block(route.lfo).shape(route.shape);
            frame.add(route.target, route.slot, evaluate(amp, *theta, shape));
        }
    }
}

impl Default for LfoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: [WaveShape; 5] = [
        WaveShape::Sine,
        WaveShape::Triangle,
        WaveShape::Ramp,
        WaveShape::Saw,
        WaveShape::Square,
    ];

    #[test]
    fn waveforms_stay_within_unit_bounds() {
        for shape in SHAPES {
            for step in 0..1000 {
                let theta = step as f32 * 0.02;
                let v = waveform(shape, theta);
                assert!(
                    (-1.0..=1.0).contains(&v),
                    "{shape:?} out of bounds at theta={theta}: {v}"
                );
            }
        }
    }

    #[test]
    fn output_is_linear_in_amplitude() {
        for shape in SHAPES {
            for step in 0..100 {
                let theta = step as f32 * 0.1;
                let one = evaluate(1.0, theta, shape);
                let two = evaluate(2.0, theta, shape);
                assert!((two - 2.0 * one).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn unknown_shape_index_falls_back_to_sine() {
        assert_eq!(WaveShape::from_index(99), WaveShape::Sine);
        assert_eq!(WaveShape::from_index(-1), WaveShape::Sine);
        for shape in SHAPES {
            assert_eq!(WaveShape::from_index(shape.to_index()), shape);
        }
    }

    #[test]
    fn triangle_peaks_at_quarter_cycle() {
        assert!((waveform(WaveShape::Triangle, PI / 2.0) - 1.0).abs() < 1e-5);
        assert!((waveform(WaveShape::Triangle, 3.0 * PI / 2.0) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn square_flips_sign_across_half_cycle() {
        assert_eq!(waveform(WaveShape::Square, PI / 2.0), 1.0);
        assert_eq!(waveform(WaveShape::Square, 3.0 * PI / 2.0), -1.0);
    }

    #[test]
    fn route_table_is_consistent() {
        let routes = build_routes();
        assert_eq!(routes.len(), 117);
        for route in &routes {
            assert!(route.amp < route.lfo.len(), "{route:?} amp out of range");
            assert!(route.rate < route.lfo.len(), "{route:?} rate out of range");
            assert!(route.slot < route.target.len(), "{route:?} slot out of range");
            assert_ne!(route.amp, route.rate);
        }
        // Every amp/rate slot of every LFO block is used exactly once.
        let mut seen = std::collections::HashSet::new();
        for route in &routes {
            assert!(seen.insert((route.lfo, route.amp)));
            assert!(seen.insert((route.lfo, route.rate)));
        }
    }

    #[test]
    fn phases_wrap_and_offsets_respect_amplitude() {
        let mut store = ParamStore::new();
        let mut engine = LfoEngine::new();
        store.set(BlockId::Ch1AdjustLfo, 0, 0.5); // xDisplace amp
        store.set(BlockId::Ch1AdjustLfo, 1, 100.0); // xDisplace rate, forces wrap
        for _ in 0..50 {
            engine.advance(&store);
        }
        for theta in &engine.thetas {
            assert!((0.0..TAU + 1e-4).contains(theta));
        }
        let mut frame = ResolvedFrame::new();
        frame.load_base(&store);
        engine.apply(&store, &mut frame);
        let offset = frame.get(BlockId::Ch1Adjust, 0);
        assert!(offset.abs() <= 0.5 + 1e-6);
    }

    #[test]
    fn offset_is_additive_to_base_value() {
        let mut store = ParamStore::new();
        let mut engine = LfoEngine::new();
        store.set(BlockId::Fb1Color, 6, 1.0); // huePowmap base
        store.set(BlockId::Fb1ColorLfo, 0, 0.25); // huePowmap amp
        store.set(BlockId::Fb1ColorLfo, 1, 1.0); // huePowmap rate
        engine.advance(&store);
        let mut frame = ResolvedFrame::new();
        frame.load_base(&store);
        engine.apply(&store, &mut frame);
        let v = frame.get(BlockId::Fb1Color, 6);
        assert!((v - 1.0).abs() <= 0.25 + 1e-6);
        // One advance of rate 1.0 puts theta at 0.15; sine is positive there.
        assert!(v > 1.0);
    }
}
