use crate::params::Waveform;
use core::f32::consts::PI;

/// A phase-accumulator oscillator with PolyBLEP anti-aliasing.
///
/// PolyBLEP (Polynomial Band-Limited Step) applies a small correction near
/// waveform discontinuities, which keeps the sawtooth voices from aliasing
/// audibly without oversampling.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
    phase_delta: f32,
    // Running sum for the PolyBLEP-integrated triangle
    tri_integrator: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        Self {
            waveform,
            frequency,
            phase: 0.0,
            phase_delta: frequency / sample_rate,
            tri_integrator: 0.0,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Generate the next sample and advance the phase.
    pub fn tick(&mut self) -> f32 {
        let dt = self.phase_delta;
        let sample = match self.waveform {
            Waveform::Sine => (self.phase * 2.0 * PI).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - polyblep(self.phase, dt),
            Waveform::Square => square_polyblep(self.phase, dt),
            Waveform::Triangle => {
                // Leaky integration of the band-limited square; the leak keeps
                // DC from drifting and 4x brings it back to about [-1, 1].
                let square = square_polyblep(self.phase, dt);
                self.tri_integrator = dt * square + (1.0 - dt) * self.tri_integrator;
                self.tri_integrator * 4.0
            }
        };

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

fn square_polyblep(phase: f32, dt: f32) -> f32 {
    let naive = if phase < 0.5 { 1.0 } else { -1.0 };
    naive + polyblep(phase, dt) - polyblep((phase + 0.5) % 1.0, dt)
}

/// PolyBLEP residual: a 2nd-order correction within one sample of the
/// discontinuity at `t = 0`, zero elsewhere. `dt` is the phase increment.
fn polyblep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
