use crate::notes::FALLBACK_FREQUENCY;

/// Oscillator waveform shapes, mirroring the Web Audio `OscillatorType` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const VARIANTS: &'static [Waveform] = &[
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// The `type` string a Web Audio oscillator uses for this shape.
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

/// ADSR envelope shape. Times are in seconds, levels are gain multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f64,
    pub decay: f64,
    /// Fraction of `peak` held while the key is down.
    pub sustain: f32,
    pub release: f64,
    /// Leaves headroom so several voices can sound together without clipping.
    pub peak: f32,
    /// Exponential ramps cannot reach zero, so release ends here.
    pub floor: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.05,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            peak: 0.8,
            floor: 0.001,
        }
    }
}

impl EnvelopeParams {
    pub fn sustain_gain(&self) -> f32 {
        self.sustain * self.peak
    }
}

/// Fixed voice settings for the keyboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub waveform: Waveform,
    pub envelope: EnvelopeParams,
    pub fallback_frequency: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            envelope: EnvelopeParams::default(),
            fallback_frequency: FALLBACK_FREQUENCY,
        }
    }
}
