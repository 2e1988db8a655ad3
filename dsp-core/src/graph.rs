use thiserror::Error;

use crate::param::ParamEvent;
use crate::params::Waveform;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("voice {0} is not part of this graph")]
    UnknownVoice(u64),
    #[error("audio graph call failed: {0}")]
    Backend(String),
}

/// The audio output a [`SynthEngine`](crate::synth::SynthEngine) plays through.
///
/// A voice is an oscillator feeding a gain control feeding the output. The
/// browser implementation maps it onto Web Audio nodes; the offline one
/// renders it in software. All times are seconds on the graph's own clock.
pub trait AudioGraph {
    /// Handle to one oscillator + gain pair.
    type Voice;

    fn current_time(&self) -> f64;

    /// Create a connected oscillator → gain → output chain. The oscillator is
    /// tuned to `frequency` but silent until [`start`](Self::start).
    fn create_voice(&mut self, waveform: Waveform, frequency: f32) -> Result<Self::Voice, GraphError>;

    /// Start the oscillator now.
    fn start(&mut self, voice: &Self::Voice) -> Result<(), GraphError>;

    /// Stop the oscillator at `when`. A later call replaces an earlier one.
    fn stop(&mut self, voice: &Self::Voice, when: f64) -> Result<(), GraphError>;

    fn schedule_gain(&mut self, voice: &Self::Voice, event: ParamEvent) -> Result<(), GraphError>;

    /// The gain value right now, with scheduled automation applied.
    fn gain_value(&self, voice: &Self::Voice) -> f32;

    /// Disconnect the voice and release its nodes.
    fn dispose(&mut self, voice: Self::Voice);

    /// Shut the output down. The graph is not used afterwards.
    fn close(&mut self) {}
}
