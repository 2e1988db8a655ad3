use crate::param::ParamEvent;
use crate::params::EnvelopeParams;

/// ADSR envelope expressed as gain automation.
///
/// Rather than computing a level per sample, the envelope hands out the
/// parameter events to schedule on a voice's gain when a key goes down and
/// when it comes back up. The audio graph then evaluates the curve on its own
/// clock:
///
/// press:   0 ──linear──▶ peak ──exponential──▶ sustain·peak
/// release: current ──exponential──▶ floor
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    params: EnvelopeParams,
}

impl Envelope {
    pub fn new(params: EnvelopeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    /// Events for a note starting at `now`: silent, attack to peak, decay to sustain.
    pub fn attack(&self, now: f64) -> [ParamEvent; 3] {
        let p = &self.params;
        [
            ParamEvent::SetValue {
                value: 0.0,
                time: now,
            },
            ParamEvent::LinearRamp {
                value: p.peak,
                end_time: now + p.attack,
            },
            ParamEvent::ExponentialRamp {
                value: p.sustain_gain(),
                end_time: now + p.attack + p.decay,
            },
        ]
    }

    /// Events for a note let go at `now` while its gain reads `current`:
    /// drop whatever is still pending, re-anchor, and fade out.
    pub fn release(&self, now: f64, current: f32) -> [ParamEvent; 3] {
        [
            ParamEvent::Cancel { from: now },
            ParamEvent::SetValue {
                value: current,
                time: now,
            },
            ParamEvent::ExponentialRamp {
                value: self.params.floor,
                end_time: self.release_end(now),
            },
        ]
    }

    /// When a release starting at `now` finishes.
    pub fn release_end(&self, now: f64) -> f64 {
        now + self.params.release
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(EnvelopeParams::default())
    }
}
