//! Parameter store: named float blocks plus scalar toggles/selects.
//!
//! Mental model:
//! - All continuously-variable controls live in fixed-capacity float blocks
//!   (`Block`, capacity 16). A block is the unit of reset, preset save/load,
//!   and LFO targeting. Slot order inside a block is load-bearing: it is the
//!   wire layout for OSC registration and the preset file layout, so it never
//!   changes even when display grouping does.
//! - On/off switches are named bools (`Toggles`), mode pickers are named ints
//!   (`Selects`). They are scalars because nothing modulates them.
//! - One-shot commands (resets, sendAll, preset ops) are edge-triggered flags
//!   in `Commands`: dispatch raises them, the frame update consumes them
//!   exactly once.

use crate::lfo::WaveShape;

pub const BLOCK_CAPACITY: usize = 16;

/// -------------------------------
/// Block identity and layout
/// -------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    // Block 1: two input channels into feedback loop 1
    Ch1Adjust,
    Ch1AdjustLfo,
    Ch2Adjust,
    Ch2AdjustLfo,
    Ch2MixAndKey,
    Ch2MixAndKeyLfo,
    Fb1MixAndKey,
    Fb1MixAndKeyLfo,
    Fb1Geo,
    Fb1GeoLfo1,
    Fb1GeoLfo2,
    Fb1Color,
    Fb1ColorLfo,
    Fb1Filters,
    // Block 2: single input channel into feedback loop 2
    InputAdjust,
    InputAdjustLfo,
    Fb2MixAndKey,
    Fb2MixAndKeyLfo,
    Fb2Geo,
    Fb2GeoLfo1,
    Fb2GeoLfo2,
    Fb2Color,
    Fb2ColorLfo,
    Fb2Filters,
    // Block 3: per-branch post processing, matrix mix, final key
    B1Geo,
    B1GeoLfo1,
    B1GeoLfo2,
    B1Colorize,
    B1ColorizeLfo1,
    B1ColorizeLfo2,
    B1ColorizeLfo3,
    B1Filters,
    B2Geo,
    B2GeoLfo1,
    B2GeoLfo2,
    B2Colorize,
    B2ColorizeLfo1,
    B2ColorizeLfo2,
    B2ColorizeLfo3,
    B2Filters,
    MatrixMix,
    MatrixMixLfo1,
    MatrixMixLfo2,
    FinalMixAndKey,
    FinalMixAndKeyLfo,
    // Macro bank values, addressable like any other block
    MacroValues,
}

const ADJUST_SLOTS: [&str; 15] = [
    "xDisplace",
    "yDisplace",
    "zDisplace",
    "rotate",
    "hueOffset",
    "saturationOffset",
    "brightOffset",
    "posterize",
    "kaleidoscopeAmount",
    "kaleidoscopeSlice",
    "blurAmount",
    "blurRadius",
    "sharpenAmount",
    "sharpenRadius",
    "filtersBoost",
];

const ADJUST_LFO_SLOTS: [&str; 16] = [
    "xDisplaceAmp",
    "xDisplaceRate",
    "yDisplaceAmp",
    "yDisplaceRate",
    "zDisplaceAmp",
    "zDisplaceRate",
    "rotateAmp",
    "rotateRate",
    "hueOffsetAmp",
    "hueOffsetRate",
    "saturationOffsetAmp",
    "saturationOffsetRate",
    "brightOffsetAmp",
    "brightOffsetRate",
    "kaleidoscopeSliceAmp",
    "kaleidoscopeSliceRate",
];

const MIX_AND_KEY_SLOTS: [&str; 6] =
    ["mixAmount", "keyRed", "keyGreen", "keyBlue", "keyThreshold", "keySoft"];

// The final stage keys against luminance, so slot 3 is the key-invert amount
// instead of a blue key component.
const FINAL_MIX_AND_KEY_SLOTS: [&str; 6] =
    ["mixAmount", "keyRed", "keyGreen", "keyInvert", "keyThreshold", "keySoft"];

const MIX_AND_KEY_LFO_SLOTS: [&str; 6] = [
    "mixAmountAmp",
    "mixAmountRate",
    "keyThresholdAmp",
    "keyThresholdRate",
    "keySoftAmp",
    "keySoftRate",
];

const GEO_SLOTS: [&str; 10] = [
    "xDisplace",
    "yDisplace",
    "zDisplace",
    "rotate",
    "xStretch",
    "yStretch",
    "xShear",
    "yShear",
    "kaleidoscopeAmount",
    "kaleidoscopeSlice",
];

const GEO_LFO1_SLOTS: [&str; 8] = [
    "xDisplaceAmp",
    "xDisplaceRate",
    "yDisplaceAmp",
    "yDisplaceRate",
    "zDisplaceAmp",
    "zDisplaceRate",
    "rotateAmp",
    "rotateRate",
];

const GEO_LFO2_SLOTS: [&str; 10] = [
    "xStretchAmp",
    "xStretchRate",
    "yStretchAmp",
    "yStretchRate",
    "xShearAmp",
    "xShearRate",
    "yShearAmp",
    "yShearRate",
    "kaleidoscopeSliceAmp",
    "kaleidoscopeSliceRate",
];

const COLOR_SLOTS: [&str; 11] = [
    "hueOffset",
    "saturationOffset",
    "brightOffset",
    "hueMultiply",
    "saturationMultiply",
    "brightMultiply",
    "huePowmap",
    "saturationPowmap",
    "brightPowmap",
    "hueShaper",
    "posterize",
];

const COLOR_LFO_SLOTS: [&str; 6] = [
    "huePowmapAmp",
    "huePowmapRate",
    "saturationPowmapAmp",
    "saturationPowmapRate",
    "brightPowmapAmp",
    "brightPowmapRate",
];

const FB_FILTERS_SLOTS: [&str; 9] = [
    "blurAmount",
    "blurRadius",
    "sharpenAmount",
    "sharpenRadius",
    "temp1Amount",
    "temp1q",
    "temp2Amount",
    "temp2q",
    "filtersBoost",
];

const OUT_FILTERS_SLOTS: [&str; 5] =
    ["blurAmount", "blurRadius", "sharpenAmount", "sharpenRadius", "filtersBoost"];

const COLORIZE_SLOTS: [&str; 15] = [
    "hueBand1",
    "saturationBand1",
    "brightBand1",
    "hueBand2",
    "saturationBand2",
    "brightBand2",
    "hueBand3",
    "saturationBand3",
    "brightBand3",
    "hueBand4",
    "saturationBand4",
    "brightBand4",
    "hueBand5",
    "saturationBand5",
    "brightBand5",
];

// Banded layout: three amps, then the matching three rates, per band.
const COLORIZE_LFO1_SLOTS: [&str; 12] = [
    "hueBand1Amp",
    "saturationBand1Amp",
    "brightBand1Amp",
    "hueBand1Rate",
    "saturationBand1Rate",
    "brightBand1Rate",
    "hueBand2Amp",
    "saturationBand2Amp",
    "brightBand2Amp",
    "hueBand2Rate",
    "saturationBand2Rate",
    "brightBand2Rate",
];

const COLORIZE_LFO2_SLOTS: [&str; 12] = [
    "hueBand3Amp",
    "saturationBand3Amp",
    "brightBand3Amp",
    "hueBand3Rate",
    "saturationBand3Rate",
    "brightBand3Rate",
    "hueBand4Amp",
    "saturationBand4Amp",
    "brightBand4Amp",
    "hueBand4Rate",
    "saturationBand4Rate",
    "brightBand4Rate",
];

const COLORIZE_LFO3_SLOTS: [&str; 6] = [
    "hueBand5Amp",
    "saturationBand5Amp",
    "brightBand5Amp",
    "hueBand5Rate",
    "saturationBand5Rate",
    "brightBand5Rate",
];

const MATRIX_MIX_SLOTS: [&str; 9] = [
    "b1RedToB2Red",
    "b1RedToB2Green",
    "b1RedToB2Blue",
    "b1GreenToB2Red",
    "b1GreenToB2Green",
    "b1GreenToB2Blue",
    "b1BlueToB2Red",
    "b1BlueToB2Green",
    "b1BlueToB2Blue",
];

const MATRIX_MIX_LFO1_SLOTS: [&str; 12] = [
    "b1RedToB2RedAmp",
    "b1RedToB2GreenAmp",
    "b1RedToB2BlueAmp",
    "b1RedToB2RedRate",
    "b1RedToB2GreenRate",
    "b1RedToB2BlueRate",
    "b1GreenToB2RedAmp",
    "b1GreenToB2GreenAmp",
    "b1GreenToB2BlueAmp",
    "b1GreenToB2RedRate",
    "b1GreenToB2GreenRate",
    "b1GreenToB2BlueRate",
];

const MATRIX_MIX_LFO2_SLOTS: [&str; 6] = [
    "b1BlueToB2RedAmp",
    "b1BlueToB2GreenAmp",
    "b1BlueToB2BlueAmp",
    "b1BlueToB2RedRate",
    "b1BlueToB2GreenRate",
    "b1BlueToB2BlueRate",
];

const MACRO_SLOTS: [&str; 16] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15",
];

impl BlockId {
    pub const COUNT: usize = 46;

    pub const ALL: [BlockId; Self::COUNT] = [
        BlockId::Ch1Adjust,
        BlockId::Ch1AdjustLfo,
        BlockId::Ch2Adjust,
        BlockId::Ch2AdjustLfo,
        BlockId::Ch2MixAndKey,
        BlockId::Ch2MixAndKeyLfo,
        BlockId::Fb1MixAndKey,
        BlockId::Fb1MixAndKeyLfo,
        BlockId::Fb1Geo,
        BlockId::Fb1GeoLfo1,
        BlockId::Fb1GeoLfo2,
        BlockId::Fb1Color,
        BlockId::Fb1ColorLfo,
        BlockId::Fb1Filters,
        BlockId::InputAdjust,
        BlockId::InputAdjustLfo,
        BlockId::Fb2MixAndKey,
        BlockId::Fb2MixAndKeyLfo,
        BlockId::Fb2Geo,
        BlockId::Fb2GeoLfo1,
        BlockId::Fb2GeoLfo2,
        BlockId::Fb2Color,
        BlockId::Fb2ColorLfo,
        BlockId::Fb2Filters,
        BlockId::B1Geo,
        BlockId::B1GeoLfo1,
        BlockId::B1GeoLfo2,
        BlockId::B1Colorize,
        BlockId::B1ColorizeLfo1,
        BlockId::B1ColorizeLfo2,
        BlockId::B1ColorizeLfo3,
        BlockId::B1Filters,
        BlockId::B2Geo,
        BlockId::B2GeoLfo1,
        BlockId::B2GeoLfo2,
        BlockId::B2Colorize,
        BlockId::B2ColorizeLfo1,
        BlockId::B2ColorizeLfo2,
        BlockId::B2ColorizeLfo3,
        BlockId::B2Filters,
        BlockId::MatrixMix,
        BlockId::MatrixMixLfo1,
        BlockId::MatrixMixLfo2,
        BlockId::FinalMixAndKey,
        BlockId::FinalMixAndKeyLfo,
        BlockId::MacroValues,
    ];

    /// Stable name used as the preset-file key for this block.
    pub fn name(self) -> &'static str {
        match self {
            BlockId::Ch1Adjust => "ch1Adjust",
            BlockId::Ch1AdjustLfo => "ch1AdjustLfo",
            BlockId::Ch2Adjust => "ch2Adjust",
            BlockId::Ch2AdjustLfo => "ch2AdjustLfo",
            BlockId::Ch2MixAndKey => "ch2MixAndKey",
            BlockId::Ch2MixAndKeyLfo => "ch2MixAndKeyLfo",
            BlockId::Fb1MixAndKey => "fb1MixAndKey",
            BlockId::Fb1MixAndKeyLfo => "fb1MixAndKeyLfo",
            BlockId::Fb1Geo => "fb1Geo",
            BlockId::Fb1GeoLfo1 => "fb1GeoLfo1",
            BlockId::Fb1GeoLfo2 => "fb1GeoLfo2",
            BlockId::Fb1Color => "fb1Color",
            BlockId::Fb1ColorLfo => "fb1ColorLfo",
            BlockId::Fb1Filters => "fb1Filters",
            BlockId::InputAdjust => "inputAdjust",
            BlockId::InputAdjustLfo => "inputAdjustLfo",
            BlockId::Fb2MixAndKey => "fb2MixAndKey",
            BlockId::Fb2MixAndKeyLfo => "fb2MixAndKeyLfo",
            BlockId::Fb2Geo => "fb2Geo",
            BlockId::Fb2GeoLfo1 => "fb2GeoLfo1",
            BlockId::Fb2GeoLfo2 => "fb2GeoLfo2",
            BlockId::Fb2Color => "fb2Color",
            BlockId::Fb2ColorLfo => "fb2ColorLfo",
            BlockId::Fb2Filters => "fb2Filters",
            BlockId::B1Geo => "b1Geo",
            BlockId::B1GeoLfo1 => "b1GeoLfo1",
            BlockId::B1GeoLfo2 => "b1GeoLfo2",
            BlockId::B1Colorize => "b1Colorize",
            BlockId::B1ColorizeLfo1 => "b1ColorizeLfo1",
            BlockId::B1ColorizeLfo2 => "b1ColorizeLfo2",
            BlockId::B1ColorizeLfo3 => "b1ColorizeLfo3",
            BlockId::B1Filters => "b1Filters",
            BlockId::B2Geo => "b2Geo",
            BlockId::B2GeoLfo1 => "b2GeoLfo1",
            BlockId::B2GeoLfo2 => "b2GeoLfo2",
            BlockId::B2Colorize => "b2Colorize",
            BlockId::B2ColorizeLfo1 => "b2ColorizeLfo1",
            BlockId::B2ColorizeLfo2 => "b2ColorizeLfo2",
            BlockId::B2ColorizeLfo3 => "b2ColorizeLfo3",
            BlockId::B2Filters => "b2Filters",
            BlockId::MatrixMix => "matrixMix",
            BlockId::MatrixMixLfo1 => "matrixMixLfo1",
            BlockId::MatrixMixLfo2 => "matrixMixLfo2",
            BlockId::FinalMixAndKey => "finalMixAndKey",
            BlockId::FinalMixAndKeyLfo => "finalMixAndKeyLfo",
            BlockId::MacroValues => "macroValues",
        }
    }

    pub fn from_name(name: &str) -> Option<BlockId> {
        BlockId::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// OSC address prefix for this block's float slots.
    pub fn osc_prefix(self) -> &'static str {
        match self {
            BlockId::Ch1Adjust => "/gravity/block1/ch1",
            BlockId::Ch1AdjustLfo => "/gravity/block1/ch1/lfo",
            BlockId::Ch2Adjust | BlockId::Ch2MixAndKey => "/gravity/block1/ch2",
            BlockId::Ch2AdjustLfo | BlockId::Ch2MixAndKeyLfo => "/gravity/block1/ch2/lfo",
            BlockId::Fb1MixAndKey
            | BlockId::Fb1Geo
            | BlockId::Fb1Color
            | BlockId::Fb1Filters => "/gravity/block1/fb1",
            BlockId::Fb1MixAndKeyLfo
            | BlockId::Fb1GeoLfo1
            | BlockId::Fb1GeoLfo2
            | BlockId::Fb1ColorLfo => "/gravity/block1/fb1/lfo",
            BlockId::InputAdjust => "/gravity/block2/input",
            BlockId::InputAdjustLfo => "/gravity/block2/input/lfo",
            BlockId::Fb2MixAndKey
            | BlockId::Fb2Geo
            | BlockId::Fb2Color
            | BlockId::Fb2Filters => "/gravity/block2/fb2",
            BlockId::Fb2MixAndKeyLfo
            | BlockId::Fb2GeoLfo1
            | BlockId::Fb2GeoLfo2
            | BlockId::Fb2ColorLfo => "/gravity/block2/fb2/lfo",
            BlockId::B1Geo | BlockId::B1Filters => "/gravity/block3/b1",
            BlockId::B1Colorize => "/gravity/block3/b1/colorize",
            BlockId::B1GeoLfo1
            | BlockId::B1GeoLfo2
            | BlockId::B1ColorizeLfo1
            | BlockId::B1ColorizeLfo2
            | BlockId::B1ColorizeLfo3 => "/gravity/block3/lfo/b1",
            BlockId::B2Geo | BlockId::B2Filters => "/gravity/block3/b2",
            BlockId::B2Colorize => "/gravity/block3/b2/colorize",
            BlockId::B2GeoLfo1
            | BlockId::B2GeoLfo2
            | BlockId::B2ColorizeLfo1
            | BlockId::B2ColorizeLfo2
            | BlockId::B2ColorizeLfo3 => "/gravity/block3/lfo/b2",
            BlockId::MatrixMix => "/gravity/block3/matrixMix",
            BlockId::MatrixMixLfo1 | BlockId::MatrixMixLfo2 => "/gravity/block3/lfo/matrixMix",
            BlockId::FinalMixAndKey => "/gravity/block3/final",
            BlockId::FinalMixAndKeyLfo => "/gravity/block3/lfo/final",
            BlockId::MacroValues => "/gravity/macro/value",
        }
    }

    /// Slot names in wire order. The array length is the block's live length.
    pub fn slot_names(self) -> &'static [&'static str] {
        match self {
            BlockId::Ch1Adjust | BlockId::Ch2Adjust | BlockId::InputAdjust => &ADJUST_SLOTS,
            BlockId::Ch1AdjustLfo | BlockId::Ch2AdjustLfo | BlockId::InputAdjustLfo => {
                &ADJUST_LFO_SLOTS
            }
            BlockId::Ch2MixAndKey | BlockId::Fb1MixAndKey | BlockId::Fb2MixAndKey => {
                &MIX_AND_KEY_SLOTS
            }
            BlockId::FinalMixAndKey => &FINAL_MIX_AND_KEY_SLOTS,
            BlockId::Ch2MixAndKeyLfo
            | BlockId::Fb1MixAndKeyLfo
            | BlockId::Fb2MixAndKeyLfo
            | BlockId::FinalMixAndKeyLfo => &MIX_AND_KEY_LFO_SLOTS,
            BlockId::Fb1Geo | BlockId::Fb2Geo | BlockId::B1Geo | BlockId::B2Geo => &GEO_SLOTS,
            BlockId::Fb1GeoLfo1 | BlockId::Fb2GeoLfo1 | BlockId::B1GeoLfo1 | BlockId::B2GeoLfo1 => {
                &GEO_LFO1_SLOTS
            }
            BlockId::Fb1GeoLfo2 | BlockId::Fb2GeoLfo2 | BlockId::B1GeoLfo2 | BlockId::B2GeoLfo2 => {
                &GEO_LFO2_SLOTS
            }
            BlockId::Fb1Color | BlockId::Fb2Color => &COLOR_SLOTS,
            BlockId::Fb1ColorLfo | BlockId::Fb2ColorLfo => &COLOR_LFO_SLOTS,
            BlockId::Fb1Filters | BlockId::Fb2Filters => &FB_FILTERS_SLOTS,
            BlockId::B1Filters | BlockId::B2Filters => &OUT_FILTERS_SLOTS,
            BlockId::B1Colorize | BlockId::B2Colorize => &COLORIZE_SLOTS,
            BlockId::B1ColorizeLfo1 | BlockId::B2ColorizeLfo1 => &COLORIZE_LFO1_SLOTS,
            BlockId::B1ColorizeLfo2 | BlockId::B2ColorizeLfo2 => &COLORIZE_LFO2_SLOTS,
            BlockId::B1ColorizeLfo3 | BlockId::B2ColorizeLfo3 => &COLORIZE_LFO3_SLOTS,
            BlockId::MatrixMix => &MATRIX_MIX_SLOTS,
            BlockId::MatrixMixLfo1 => &MATRIX_MIX_LFO1_SLOTS,
            BlockId::MatrixMixLfo2 => &MATRIX_MIX_LFO2_SLOTS,
            BlockId::MacroValues => &MACRO_SLOTS,
        }
    }

    pub fn len(self) -> usize {
        self.slot_names().len()
    }

    pub fn index(self) -> usize {
        // Declaration order matches `ALL`.
        self as usize
    }

    // Group-reset membership.
    pub const BLOCK1_MEMBERS: [BlockId; 14] = [
        BlockId::Ch1Adjust,
        BlockId::Ch1AdjustLfo,
        BlockId::Ch2Adjust,
        BlockId::Ch2AdjustLfo,
        BlockId::Ch2MixAndKey,
        BlockId::Ch2MixAndKeyLfo,
        BlockId::Fb1MixAndKey,
        BlockId::Fb1MixAndKeyLfo,
        BlockId::Fb1Geo,
        BlockId::Fb1GeoLfo1,
        BlockId::Fb1GeoLfo2,
        BlockId::Fb1Color,
        BlockId::Fb1ColorLfo,
        BlockId::Fb1Filters,
    ];

    pub const BLOCK1_INPUT_MEMBERS: [BlockId; 6] = [
        BlockId::Ch1Adjust,
        BlockId::Ch1AdjustLfo,
        BlockId::Ch2Adjust,
        BlockId::Ch2AdjustLfo,
        BlockId::Ch2MixAndKey,
        BlockId::Ch2MixAndKeyLfo,
    ];

    pub const FB1_MEMBERS: [BlockId; 8] = [
        BlockId::Fb1MixAndKey,
        BlockId::Fb1MixAndKeyLfo,
        BlockId::Fb1Geo,
        BlockId::Fb1GeoLfo1,
        BlockId::Fb1GeoLfo2,
        BlockId::Fb1Color,
        BlockId::Fb1ColorLfo,
        BlockId::Fb1Filters,
    ];

    pub const BLOCK2_MEMBERS: [BlockId; 10] = [
        BlockId::InputAdjust,
        BlockId::InputAdjustLfo,
        BlockId::Fb2MixAndKey,
        BlockId::Fb2MixAndKeyLfo,
        BlockId::Fb2Geo,
        BlockId::Fb2GeoLfo1,
        BlockId::Fb2GeoLfo2,
        BlockId::Fb2Color,
        BlockId::Fb2ColorLfo,
        BlockId::Fb2Filters,
    ];

    pub const BLOCK2_INPUT_MEMBERS: [BlockId; 2] =
        [BlockId::InputAdjust, BlockId::InputAdjustLfo];

    pub const FB2_MEMBERS: [BlockId; 8] = [
        BlockId::Fb2MixAndKey,
        BlockId::Fb2MixAndKeyLfo,
        BlockId::Fb2Geo,
        BlockId::Fb2GeoLfo1,
        BlockId::Fb2GeoLfo2,
        BlockId::Fb2Color,
        BlockId::Fb2ColorLfo,
        BlockId::Fb2Filters,
    ];

    pub const BLOCK3_MEMBERS: [BlockId; 21] = [
        BlockId::B1Geo,
        BlockId::B1GeoLfo1,
        BlockId::B1GeoLfo2,
        BlockId::B1Colorize,
        BlockId::B1ColorizeLfo1,
        BlockId::B1ColorizeLfo2,
        BlockId::B1ColorizeLfo3,
        BlockId::B1Filters,
        BlockId::B2Geo,
        BlockId::B2GeoLfo1,
        BlockId::B2GeoLfo2,
        BlockId::B2Colorize,
        BlockId::B2ColorizeLfo1,
        BlockId::B2ColorizeLfo2,
        BlockId::B2ColorizeLfo3,
        BlockId::B2Filters,
        BlockId::MatrixMix,
        BlockId::MatrixMixLfo1,
        BlockId::MatrixMixLfo2,
        BlockId::FinalMixAndKey,
        BlockId::FinalMixAndKeyLfo,
    ];
}

/// -------------------------------
/// Block storage
/// -------------------------------

#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    values: [f32; BLOCK_CAPACITY],
    defaults: [f32; BLOCK_CAPACITY],
    shapes: [WaveShape; BLOCK_CAPACITY],
    midi_active: [bool; BLOCK_CAPACITY],
    reset_requested: bool,
}

impl Block {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            values: [0.0; BLOCK_CAPACITY],
            defaults: [0.0; BLOCK_CAPACITY],
            shapes: [WaveShape::Sine; BLOCK_CAPACITY],
            midi_active: [false; BLOCK_CAPACITY],
            reset_requested: false,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn get(&self, index: usize) -> f32 {
        debug_assert!(index < self.len(), "slot {index} out of range for {:?}", self.id);
        if index < self.len() {
            self.values[index]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, index: usize, value: f32) {
        debug_assert!(index < self.len(), "slot {index} out of range for {:?}", self.id);
        if index < self.len() {
            self.values[index] = value;
        }
    }

    pub fn shape(&self, index: usize) -> WaveShape {
        debug_assert!(index < BLOCK_CAPACITY);
        self.shapes[index]
    }

    pub fn set_shape(&mut self, index: usize, shape: WaveShape) {
        debug_assert!(index < BLOCK_CAPACITY);
        if index < BLOCK_CAPACITY {
            self.shapes[index] = shape;
        }
    }

    pub fn midi_active(&self, index: usize) -> bool {
        index < self.len() && self.midi_active[index]
    }

    pub fn set_midi_active(&mut self, index: usize, active: bool) {
        if index < self.len() {
            self.midi_active[index] = active;
        }
    }

    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }

    /// Consumes the reset request. Returns true if a reset was applied.
    pub fn take_reset(&mut self) -> bool {
        if !self.reset_requested {
            return false;
        }
        self.reset_requested = false;
        self.values = self.defaults;
        self.midi_active = [false; BLOCK_CAPACITY];
        true
    }

    pub fn values(&self) -> &[f32] {
        &self.values[..self.len()]
    }
}

/// -------------------------------
/// Scalar toggles and selects
/// -------------------------------

macro_rules! named_scalars {
    ($struct_name:ident, $ty:ty, $($field:ident),* $(,)?) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $struct_name {
            $(pub $field: $ty,)*
        }

        impl $struct_name {
            /// Name/value pairs in declaration order, for preset snapshots.
            pub fn entries(&self) -> Vec<(&'static str, $ty)> {
                vec![$((stringify!($field), self.$field),)*]
            }

            pub fn entries_mut(&mut self) -> Vec<(&'static str, &mut $ty)> {
                vec![$((stringify!($field), &mut self.$field),)*]
            }
        }
    };
}

named_scalars!(
    Toggles,
    bool,
    ch1_h_mirror,
    ch1_v_mirror,
    ch1_h_flip,
    ch1_v_flip,
    ch1_hue_invert,
    ch1_saturation_invert,
    ch1_bright_invert,
    ch1_rgb_invert,
    ch1_solarize,
    ch2_h_mirror,
    ch2_v_mirror,
    ch2_h_flip,
    ch2_v_flip,
    ch2_hue_invert,
    ch2_saturation_invert,
    ch2_bright_invert,
    ch2_rgb_invert,
    ch2_solarize,
    input_h_mirror,
    input_v_mirror,
    input_h_flip,
    input_v_flip,
    input_hue_invert,
    input_saturation_invert,
    input_bright_invert,
    input_rgb_invert,
    input_solarize,
    fb1_h_mirror,
    fb1_v_mirror,
    fb1_h_flip,
    fb1_v_flip,
    fb1_rotate_mode,
    fb1_hypercube,
    fb1_dancing_line,
    fb1_septagram,
    fb1_lissajous_ball,
    fb1_hue_invert,
    fb1_saturation_invert,
    fb1_bright_invert,
    fb2_h_mirror,
    fb2_v_mirror,
    fb2_h_flip,
    fb2_v_flip,
    fb2_rotate_mode,
    fb2_hypercube,
    fb2_dancing_line,
    fb2_septagram,
    fb2_lissajous_ball,
    fb2_hue_invert,
    fb2_saturation_invert,
    fb2_bright_invert,
    b1_h_mirror,
    b1_v_mirror,
    b1_h_flip,
    b1_v_flip,
    b1_colorize_active,
    b2_h_mirror,
    b2_v_mirror,
    b2_h_flip,
    b2_v_flip,
    b2_colorize_active,
);

named_scalars!(
    Selects,
    i32,
    ch1_input_select,
    ch1_geo_overflow,
    ch2_input_select,
    ch2_geo_overflow,
    ch2_key_order,
    ch2_mix_type,
    ch2_mix_overflow,
    ch2_key_mode,
    input_input_select,
    input_geo_overflow,
    fb1_geo_overflow,
    fb1_key_order,
    fb1_mix_type,
    fb1_mix_overflow,
    fb1_key_mode,
    fb1_delay_time,
    fb2_geo_overflow,
    fb2_key_order,
    fb2_mix_type,
    fb2_mix_overflow,
    fb2_key_mode,
    fb2_delay_time,
    b1_geo_overflow,
    b1_rotate_mode,
    b1_colorspace,
    b2_geo_overflow,
    b2_rotate_mode,
    b2_colorspace,
    matrix_mix_type,
    matrix_overflow,
    final_key_order,
    final_mix_type,
    final_overflow,
    final_key_mode,
    ui_scale,
);

/// -------------------------------
/// One-shot commands
/// -------------------------------

/// Edge-triggered command state. Raised by dispatch, consumed exactly once
/// by the next frame update.
#[derive(Debug, Clone, Default)]
pub struct Commands {
    pub send_all: bool,
    pub fb1_clear: bool,
    pub fb2_clear: bool,
    pub macro_reset: bool,
    pub macro_reset_assignments: bool,
    pub reset_all: bool,
    pub preset: PresetCommands,
}

#[derive(Debug, Clone, Default)]
pub struct PresetCommands {
    pub select_load: Option<i32>,
    pub select_save: Option<i32>,
    pub load: bool,
    pub save: bool,
    pub save_bank_index: Option<i32>,
    pub save_bank_name: Option<String>,
    pub load_bank_index: Option<i32>,
    pub load_bank_name: Option<String>,
    pub save_as: Option<String>,
}

impl PresetCommands {
    pub fn any(&self) -> bool {
        self.select_load.is_some()
            || self.select_save.is_some()
            || self.load
            || self.save
            || self.save_bank_index.is_some()
            || self.save_bank_name.is_some()
            || self.load_bank_index.is_some()
            || self.load_bank_name.is_some()
            || self.save_as.is_some()
    }
}

/// -------------------------------
/// Store
/// -------------------------------

pub struct ParamStore {
    blocks: Vec<Block>,
    pub toggles: Toggles,
    pub selects: Selects,
    pub commands: Commands,
    /// Render frame rate. Settings-scoped, so it survives resetAll.
    pub target_fps: i32,
}

pub const DEFAULT_FPS: i32 = 30;
pub const FPS_RANGE: (i32, i32) = (1, 60);

impl ParamStore {
    pub fn new() -> Self {
        Self {
            blocks: BlockId::ALL.iter().map(|id| Block::new(*id)).collect(),
            toggles: Toggles::default(),
            selects: Selects::default(),
            commands: Commands::default(),
            target_fps: DEFAULT_FPS,
        }
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn get(&self, id: BlockId, index: usize) -> f32 {
        self.block(id).get(index)
    }

    pub fn set(&mut self, id: BlockId, index: usize, value: f32) {
        self.block_mut(id).set(index, value);
    }

    pub fn request_group_reset(&mut self, members: &[BlockId]) {
        for id in members {
            self.block_mut(*id).request_reset();
        }
    }

    /// Applies pending block resets; returns how many blocks were reset.
    pub fn apply_resets(&mut self) -> usize {
        let mut applied = 0;
        for block in &mut self.blocks {
            if block.take_reset() {
                applied += 1;
            }
        }
        applied
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

/// -------------------------------
/// Resolved frame
/// -------------------------------

/// Per-frame output values: base + LFO offsets, then macro overrides.
/// This is what gets uploaded as uniforms; the store itself is never
/// mutated by modulation.
pub struct ResolvedFrame {
    values: Vec<[f32; BLOCK_CAPACITY]>,
}

impl ResolvedFrame {
    pub fn new() -> Self {
        Self {
            values: vec![[0.0; BLOCK_CAPACITY]; BlockId::COUNT],
        }
    }

    pub fn get(&self, id: BlockId, index: usize) -> f32 {
        self.values[id.index()][index]
    }

    pub fn set(&mut self, id: BlockId, index: usize, value: f32) {
        self.values[id.index()][index] = value;
    }

    pub fn add(&mut self, id: BlockId, index: usize, delta: f32) {
        self.values[id.index()][index] += delta;
    }

    /// Copies every block's base values in, overwriting the previous frame.
    pub fn load_base(&mut self, store: &ParamStore) {
        for id in BlockId::ALL {
            let block = store.block(id);
            let out = &mut self.values[id.index()];
            out[..block.len()].copy_from_slice(block.values());
        }
    }
}

impl Default for ResolvedFrame {
    fn default() -> Self {
        Self::new()
    }
}
