use std::collections::HashMap;

use crate::graph::{AudioGraph, GraphError};
use crate::oscillator::Oscillator;
use crate::param::{ParamEvent, ParamTimeline};
use crate::params::Waveform;

/// Handle to a voice inside an [`OfflineGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

#[derive(Debug)]
struct OfflineVoice {
    oscillator: Oscillator,
    gain: ParamTimeline,
    start: Option<f64>,
    stop: Option<f64>,
}

impl OfflineVoice {
    fn is_sounding(&self, t: f64) -> bool {
        self.start.is_some_and(|s| t >= s) && self.stop.map_or(true, |s| t < s)
    }
}

/// An audio graph rendered in software.
///
/// Time only moves when audio is pulled through [`render`](Self::render) or
/// [`advance`](Self::advance), so everything scheduled on it is exactly
/// reproducible.
#[derive(Debug)]
pub struct OfflineGraph {
    sample_rate: f32,
    frame: u64,
    next_id: u64,
    voices: HashMap<VoiceId, OfflineVoice>,
    closed: bool,
}

impl OfflineGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            next_id: 0,
            voices: HashMap::new(),
            closed: false,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Mix every sounding voice into `output` (mono) and advance the clock.
    pub fn render(&mut self, output: &mut [f32]) {
        let sample_rate = self.sample_rate as f64;
        for sample in output.iter_mut() {
            let t = self.frame as f64 / sample_rate;
            let mut mix = 0.0;
            for voice in self.voices.values_mut() {
                if voice.is_sounding(t) {
                    mix += voice.oscillator.tick() * voice.gain.value_at(t);
                }
            }
            *sample = mix;
            self.frame += 1;
        }
    }

    /// Render and discard `seconds` of audio.
    pub fn advance(&mut self, seconds: f64) {
        let mut frames = (seconds * self.sample_rate as f64).round() as usize;
        let mut scratch = [0.0f32; 128];
        while frames > 0 {
            let n = frames.min(scratch.len());
            self.render(&mut scratch[..n]);
            frames -= n;
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_frequency(&self, voice: &VoiceId) -> Option<f32> {
        self.voices.get(voice).map(|v| v.oscillator.frequency())
    }

    pub fn gain_events(&self, voice: &VoiceId) -> Option<&[ParamEvent]> {
        self.voices.get(voice).map(|v| v.gain.events())
    }

    pub fn stop_time(&self, voice: &VoiceId) -> Option<f64> {
        self.voices.get(voice).and_then(|v| v.stop)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn voice_mut(&mut self, voice: &VoiceId) -> Result<&mut OfflineVoice, GraphError> {
        self.voices
            .get_mut(voice)
            .ok_or(GraphError::UnknownVoice(voice.0))
    }
}

impl AudioGraph for OfflineGraph {
    type Voice = VoiceId;

    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn create_voice(&mut self, waveform: Waveform, frequency: f32) -> Result<VoiceId, GraphError> {
        if self.closed {
            return Err(GraphError::Unavailable("offline graph is closed".into()));
        }
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.voices.insert(
            id,
            OfflineVoice {
                oscillator: Oscillator::new(waveform, frequency, self.sample_rate),
                // Web Audio gain nodes default to unity.
                gain: ParamTimeline::new(1.0),
                start: None,
                stop: None,
            },
        );
        Ok(id)
    }

    fn start(&mut self, voice: &VoiceId) -> Result<(), GraphError> {
        let now = self.current_time();
        self.voice_mut(voice)?.start = Some(now);
        Ok(())
    }

    fn stop(&mut self, voice: &VoiceId, when: f64) -> Result<(), GraphError> {
        self.voice_mut(voice)?.stop = Some(when);
        Ok(())
    }

    fn schedule_gain(&mut self, voice: &VoiceId, event: ParamEvent) -> Result<(), GraphError> {
        self.voice_mut(voice)?.gain.schedule(event);
        Ok(())
    }

    fn gain_value(&self, voice: &VoiceId) -> f32 {
        let now = self.current_time();
        self.voices
            .get(voice)
            .map_or(0.0, |v| v.gain.value_at(now))
    }

    fn dispose(&mut self, voice: VoiceId) {
        self.voices.remove(&voice);
    }

    fn close(&mut self) {
        self.voices.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()))
    }

    #[test]
    fn new_graph_starts_at_time_zero() {
        let g = OfflineGraph::new(44100.0);
        assert_eq!(g.current_time(), 0.0);
        assert_eq!(g.voice_count(), 0);
        assert!(!g.is_closed());
    }

    #[test]
    fn render_advances_clock() {
        let mut g = OfflineGraph::new(44100.0);
        let mut buf = vec![0.0; 441];
        g.render(&mut buf);
        assert!((g.current_time() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn advance_covers_partial_chunks() {
        let mut g = OfflineGraph::new(48000.0);
        g.advance(0.001); // 48 frames, less than one chunk
        assert!((g.current_time() - 0.001).abs() < 1e-9);
        g.advance(0.5);
        assert!((g.current_time() - 0.501).abs() < 1e-9);
    }

    #[test]
    fn renders_silence_without_voices() {
        let mut g = OfflineGraph::new(44100.0);
        let mut buf = vec![1.0; 256];
        g.render(&mut buf);
        assert!(buf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn unstarted_voice_is_silent() {
        let mut g = OfflineGraph::new(44100.0);
        g.create_voice(Waveform::Sawtooth, 440.0).unwrap();
        let mut buf = vec![0.0; 256];
        g.render(&mut buf);
        assert_eq!(peak(&buf), 0.0);
    }

    #[test]
    fn started_voice_is_shaped_by_gain() {
        let mut g = OfflineGraph::new(44100.0);
        let v = g.create_voice(Waveform::Sawtooth, 440.0).unwrap();
        g.schedule_gain(&v, ParamEvent::SetValue { value: 0.5, time: 0.0 })
            .unwrap();
        g.start(&v).unwrap();
        let mut buf = vec![0.0; 4410];
        g.render(&mut buf);
        let p = peak(&buf);
        assert!(p > 0.3 && p <= 0.55, "peak {} should follow gain 0.5", p);
    }

    #[test]
    fn voice_goes_quiet_at_stop_time() {
        let mut g = OfflineGraph::new(44100.0);
        let v = g.create_voice(Waveform::Sawtooth, 440.0).unwrap();
        g.schedule_gain(&v, ParamEvent::SetValue { value: 1.0, time: 0.0 })
            .unwrap();
        g.start(&v).unwrap();
        g.stop(&v, 0.01).unwrap();
        let mut buf = vec![0.0; 441];
        g.render(&mut buf);
        assert!(peak(&buf) > 0.5);
        g.render(&mut buf);
        assert_eq!(peak(&buf), 0.0, "voice should be silent after stop");
        assert_eq!(g.stop_time(&v), Some(0.01));
    }

    #[test]
    fn later_stop_replaces_earlier() {
        let mut g = OfflineGraph::new(44100.0);
        let v = g.create_voice(Waveform::Sine, 440.0).unwrap();
        g.stop(&v, 5.0).unwrap();
        g.stop(&v, 1.0).unwrap();
        assert_eq!(g.stop_time(&v), Some(1.0));
    }

    #[test]
    fn gain_value_reads_timeline_at_current_time() {
        let mut g = OfflineGraph::new(1000.0);
        let v = g.create_voice(Waveform::Sine, 100.0).unwrap();
        assert_eq!(g.gain_value(&v), 1.0);
        g.schedule_gain(&v, ParamEvent::SetValue { value: 0.0, time: 0.0 })
            .unwrap();
        g.schedule_gain(&v, ParamEvent::LinearRamp { value: 1.0, end_time: 1.0 })
            .unwrap();
        g.advance(0.25);
        assert!((g.gain_value(&v) - 0.25).abs() < 1e-4);
    }

    #[test]
    fn disposed_voice_is_unknown() {
        let mut g = OfflineGraph::new(44100.0);
        let v = g.create_voice(Waveform::Sawtooth, 261.63).unwrap();
        assert_eq!(g.voice_frequency(&v), Some(261.63));
        g.dispose(v);
        assert_eq!(g.voice_count(), 0);
        assert!(matches!(g.start(&v), Err(GraphError::UnknownVoice(_))));
        assert_eq!(g.gain_value(&v), 0.0);
    }

    #[test]
    fn closed_graph_refuses_new_voices() {
        let mut g = OfflineGraph::new(44100.0);
        g.create_voice(Waveform::Sawtooth, 440.0).unwrap();
        g.close();
        assert!(g.is_closed());
        assert_eq!(g.voice_count(), 0);
        assert!(matches!(
            g.create_voice(Waveform::Sawtooth, 440.0),
            Err(GraphError::Unavailable(_))
        ));
    }
}
