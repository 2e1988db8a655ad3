use std::collections::HashMap;

use log::{debug, info, trace, warn};

use crate::envelope::Envelope;
use crate::graph::{AudioGraph, GraphError};
use crate::notes::frequency_for;
use crate::params::{SynthConfig, Waveform};

/// Receiver of press/release intents from the keys.
pub trait NoteSink {
    fn play_sound(&mut self, note: &str);
    fn stop_sound(&mut self, note: &str);
}

/// Cleanup pending for a released voice.
///
/// The voice stays registered until the deadline has strictly passed on the
/// graph clock; until then a new press of the same note is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseTask {
    deadline: f64,
}

impl ReleaseTask {
    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn is_due(&self, now: f64) -> bool {
        now > self.deadline
    }
}

struct LiveVoice<V> {
    nodes: V,
    frequency: f32,
    release: Option<ReleaseTask>,
}

/// Polyphonic keyboard synth: one voice per note, owned audio output.
///
/// The graph is created once by the host and handed in. Without one (the
/// platform has no audio) every operation is a silent no-op. Dropping the
/// engine shuts the graph down and cancels any pending release.
pub struct SynthEngine<G: AudioGraph> {
    graph: Option<G>,
    config: SynthConfig,
    envelope: Envelope,
    voices: HashMap<String, LiveVoice<G::Voice>>,
}

impl<G: AudioGraph> SynthEngine<G> {
    pub fn new(graph: Option<G>, config: SynthConfig) -> Self {
        if graph.is_none() {
            warn!("no audio output, keyboard will be silent");
        }
        Self {
            graph,
            envelope: Envelope::new(config.envelope),
            config,
            voices: HashMap::new(),
        }
    }

    pub fn with_graph(graph: G) -> Self {
        Self::new(Some(graph), SynthConfig::default())
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn graph(&self) -> Option<&G> {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut G> {
        self.graph.as_mut()
    }

    pub fn is_available(&self) -> bool {
        self.graph.is_some()
    }

    /// Start a voice for `note` unless one is already live, including one
    /// still in its release tail.
    pub fn play_sound(&mut self, note: &str) {
        let Some(now) = self.graph.as_ref().map(|g| g.current_time()) else {
            return;
        };

        let expired = self
            .voices
            .get(note)
            .and_then(|v| v.release)
            .is_some_and(|task| task.is_due(now));
        if expired {
            self.retire(note);
        }

        if self.voices.contains_key(note) {
            trace!("{} already sounding, press ignored", note);
            return;
        }

        let frequency = frequency_for(note).unwrap_or_else(|| {
            debug!(
                "no frequency for {}, using {} Hz",
                note, self.config.fallback_frequency
            );
            self.config.fallback_frequency
        });

        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        match start_voice(graph, &self.envelope, self.config.waveform, frequency, now) {
            Ok(nodes) => {
                debug!("voice on: {} at {:.2} Hz", note, frequency);
                self.voices.insert(
                    note.to_string(),
                    LiveVoice {
                        nodes,
                        frequency,
                        release: None,
                    },
                );
            }
            Err(e) => warn!("could not start {}: {}", note, e),
        }
    }

    /// Fade out the voice for `note` and arm its cleanup. No-op when the note
    /// is silent or already releasing.
    pub fn stop_sound(&mut self, note: &str) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        let Some(voice) = self.voices.get_mut(note) else {
            return;
        };
        if voice.release.is_some() {
            trace!("{} already releasing", note);
            return;
        }

        let now = graph.current_time();
        let deadline = self.envelope.release_end(now);
        if let Err(e) = release_voice(graph, &voice.nodes, &self.envelope, now) {
            warn!("could not release {}: {}", note, e);
        }
        voice.release = Some(ReleaseTask { deadline });
        debug!("voice release: {} until {:.3}s", note, deadline);
    }

    /// Drop every voice whose release has finished. Returns how many went.
    pub fn reap_finished(&mut self) -> usize {
        let Some(now) = self.graph.as_ref().map(|g| g.current_time()) else {
            return 0;
        };
        let due: Vec<String> = self
            .voices
            .iter()
            .filter(|(_, v)| v.release.is_some_and(|task| task.is_due(now)))
            .map(|(note, _)| note.clone())
            .collect();
        for note in &due {
            self.retire(note);
        }
        due.len()
    }

    /// Earliest pending release deadline, for hosts that need to wake up to
    /// run [`reap_finished`](Self::reap_finished).
    pub fn next_release_deadline(&self) -> Option<f64> {
        self.voices
            .values()
            .filter_map(|v| v.release.map(|task| task.deadline()))
            .min_by(f64::total_cmp)
    }

    /// Silence everything now, cancel pending releases and close the output.
    /// The engine is inert afterwards.
    pub fn shutdown(&mut self) {
        let Some(mut graph) = self.graph.take() else {
            return;
        };
        let now = graph.current_time();
        for (note, voice) in self.voices.drain() {
            if let Err(e) = graph.stop(&voice.nodes, now) {
                warn!("could not stop {}: {}", note, e);
            }
            graph.dispose(voice.nodes);
        }
        graph.close();
        info!("audio output closed");
    }

    pub fn has_voice(&self, note: &str) -> bool {
        self.voices.contains_key(note)
    }

    pub fn is_releasing(&self, note: &str) -> bool {
        self.voices.get(note).is_some_and(|v| v.release.is_some())
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_frequency(&self, note: &str) -> Option<f32> {
        self.voices.get(note).map(|v| v.frequency)
    }

    pub fn release_task(&self, note: &str) -> Option<ReleaseTask> {
        self.voices.get(note).and_then(|v| v.release)
    }

    pub fn voice_nodes(&self, note: &str) -> Option<&G::Voice> {
        self.voices.get(note).map(|v| &v.nodes)
    }

    fn retire(&mut self, note: &str) {
        if let (Some(graph), Some(voice)) = (self.graph.as_mut(), self.voices.remove(note)) {
            graph.dispose(voice.nodes);
            debug!("voice off: {}", note);
        }
    }
}

fn start_voice<G: AudioGraph>(
    graph: &mut G,
    envelope: &Envelope,
    waveform: Waveform,
    frequency: f32,
    now: f64,
) -> Result<G::Voice, GraphError> {
    let nodes = graph.create_voice(waveform, frequency)?;
    match arm_attack(graph, &nodes, envelope, now) {
        Ok(()) => Ok(nodes),
        Err(e) => {
            graph.dispose(nodes);
            Err(e)
        }
    }
}

fn arm_attack<G: AudioGraph>(
    graph: &mut G,
    nodes: &G::Voice,
    envelope: &Envelope,
    now: f64,
) -> Result<(), GraphError> {
    for event in envelope.attack(now) {
        graph.schedule_gain(nodes, event)?;
    }
    graph.start(nodes)
}

fn release_voice<G: AudioGraph>(
    graph: &mut G,
    nodes: &G::Voice,
    envelope: &Envelope,
    now: f64,
) -> Result<(), GraphError> {
    let current = graph.gain_value(nodes);
    for event in envelope.release(now, current) {
        graph.schedule_gain(nodes, event)?;
    }
    graph.stop(nodes, envelope.release_end(now))
}

impl<G: AudioGraph> NoteSink for SynthEngine<G> {
    fn play_sound(&mut self, note: &str) {
        SynthEngine::play_sound(self, note);
    }

    fn stop_sound(&mut self, note: &str) {
        SynthEngine::stop_sound(self, note);
    }
}

impl<G: AudioGraph> Drop for SynthEngine<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineGraph;
    use crate::param::ParamEvent;

    const SR: f32 = 44100.0;

    fn engine() -> SynthEngine<OfflineGraph> {
        SynthEngine::with_graph(OfflineGraph::new(SR))
    }

    fn advance(engine: &mut SynthEngine<OfflineGraph>, seconds: f64) {
        engine.graph_mut().unwrap().advance(seconds);
    }

    fn graph_voices(engine: &SynthEngine<OfflineGraph>) -> usize {
        engine.graph().unwrap().voice_count()
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()))
    }

    // --- play_sound ---

    #[test]
    fn play_creates_voice_at_table_frequency() {
        let mut e = engine();
        e.play_sound("C4");
        assert!(e.has_voice("C4"));
        assert_eq!(e.voice_count(), 1);
        assert_eq!(e.voice_frequency("C4"), Some(261.63));
        let nodes = e.voice_nodes("C4").unwrap();
        assert_eq!(e.graph().unwrap().voice_frequency(nodes), Some(261.63));
    }

    #[test]
    fn play_schedules_attack_and_decay() {
        let mut e = engine();
        advance(&mut e, 0.5);
        e.play_sound("E4");
        let nodes = *e.voice_nodes("E4").unwrap();
        let events = e.graph().unwrap().gain_events(&nodes).unwrap().to_vec();
        assert_eq!(events, Envelope::default().attack(0.5).to_vec());
    }

    #[test]
    fn play_twice_is_idempotent() {
        let mut e = engine();
        e.play_sound("C4");
        e.play_sound("C4");
        assert_eq!(e.voice_count(), 1);
        assert_eq!(graph_voices(&e), 1, "no second oscillator");
    }

    #[test]
    fn notes_sound_together() {
        let mut e = engine();
        e.play_sound("C4");
        e.play_sound("E4");
        e.play_sound("G4");
        assert_eq!(e.voice_count(), 3);
        assert_eq!(graph_voices(&e), 3);
    }

    #[test]
    fn c5_falls_back_to_440() {
        let mut e = engine();
        e.play_sound("C5");
        assert_eq!(e.voice_frequency("C5"), Some(440.0));
    }

    #[test]
    fn unknown_note_falls_back_to_440() {
        let mut e = engine();
        e.play_sound("nonsense");
        assert_eq!(e.voice_frequency("nonsense"), Some(440.0));
    }

    #[test]
    fn play_renders_audible_bounded_output() {
        let mut e = engine();
        e.play_sound("A4");
        let mut buf = vec![0.0; 8820]; // 200 ms, past attack and decay
        e.graph_mut().unwrap().render(&mut buf);
        let p = peak(&buf);
        assert!(p > 0.4, "expected audible output, peak {}", p);
        assert!(p <= 0.85, "peak {} exceeds envelope peak", p);
    }

    // --- stop_sound ---

    #[test]
    fn stop_without_voice_is_noop() {
        let mut e = engine();
        e.stop_sound("C4");
        e.stop_sound("not-a-note");
        assert_eq!(e.voice_count(), 0);
        assert_eq!(e.next_release_deadline(), None);
    }

    #[test]
    fn stop_schedules_release_ramp_and_oscillator_stop() {
        let mut e = engine();
        e.play_sound("C4");
        advance(&mut e, 0.2);
        let now = e.graph().unwrap().current_time();
        e.stop_sound("C4");

        let nodes = *e.voice_nodes("C4").unwrap();
        let g = e.graph().unwrap();
        let last = *g.gain_events(&nodes).unwrap().last().unwrap();
        match last {
            ParamEvent::ExponentialRamp { value, end_time } => {
                assert!((value - 0.001).abs() < 1e-9);
                assert!((end_time - (now + 0.3)).abs() < 1e-9);
            }
            other => panic!("expected exponential release, got {:?}", other),
        }
        assert!((g.stop_time(&nodes).unwrap() - (now + 0.3)).abs() < 1e-9);
        assert!(e.is_releasing("C4"));
        let task = e.release_task("C4").unwrap();
        assert!((task.deadline() - (now + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn release_starts_from_current_gain() {
        let mut e = engine();
        e.play_sound("C4");
        advance(&mut e, 0.025); // halfway up the attack
        let nodes = *e.voice_nodes("C4").unwrap();
        let before = e.graph().unwrap().gain_value(&nodes);
        e.stop_sound("C4");
        let after = e.graph().unwrap().gain_value(&nodes);
        assert!((before - 0.4).abs() < 0.01, "mid-attack gain {}", before);
        assert!((after - before).abs() < 1e-6, "release jumped {} -> {}", before, after);
    }

    #[test]
    fn voice_stays_registered_through_release_tail() {
        let mut e = engine();
        e.play_sound("C4");
        e.stop_sound("C4");
        advance(&mut e, 0.29);
        assert_eq!(e.reap_finished(), 0);
        assert!(e.has_voice("C4"));
        e.play_sound("C4");
        assert_eq!(graph_voices(&e), 1, "press during release must be ignored");
        assert!(e.is_releasing("C4"));
    }

    #[test]
    fn voice_removed_after_release_duration() {
        let mut e = engine();
        e.play_sound("C4");
        e.stop_sound("C4");
        advance(&mut e, 0.31);
        assert_eq!(e.reap_finished(), 1);
        assert!(!e.has_voice("C4"));
        assert_eq!(graph_voices(&e), 0);
    }

    #[test]
    fn fresh_trigger_after_release_without_reap() {
        let mut e = engine();
        e.play_sound("D4");
        e.stop_sound("D4");
        advance(&mut e, 0.31);
        e.play_sound("D4");
        assert!(e.has_voice("D4"));
        assert!(!e.is_releasing("D4"), "should be a new voice");
        assert_eq!(graph_voices(&e), 1, "old voice disposed");
    }

    #[test]
    fn second_stop_does_not_rearm_release() {
        let mut e = engine();
        e.play_sound("C4");
        e.stop_sound("C4");
        let first = e.release_task("C4").unwrap();
        advance(&mut e, 0.1);
        e.stop_sound("C4");
        assert_eq!(e.release_task("C4"), Some(first));
    }

    #[test]
    fn output_is_silent_after_release() {
        let mut e = engine();
        e.play_sound("G4");
        advance(&mut e, 0.2);
        e.stop_sound("G4");
        advance(&mut e, 0.31);
        e.reap_finished();
        let mut buf = vec![1.0; 512];
        e.graph_mut().unwrap().render(&mut buf);
        assert_eq!(peak(&buf), 0.0);
    }

    #[test]
    fn next_release_deadline_is_earliest() {
        let mut e = engine();
        e.play_sound("C4");
        e.play_sound("E4");
        e.play_sound("G4");
        e.stop_sound("E4");
        advance(&mut e, 0.1);
        e.stop_sound("C4");
        let deadline = e.next_release_deadline().unwrap();
        assert!((deadline - 0.3).abs() < 1e-9, "got {}", deadline);
    }

    // --- lifecycle / errors ---

    #[test]
    fn missing_graph_makes_everything_noop() {
        let mut e: SynthEngine<OfflineGraph> = SynthEngine::new(None, SynthConfig::default());
        assert!(!e.is_available());
        e.play_sound("C4");
        e.stop_sound("C4");
        assert_eq!(e.voice_count(), 0);
        assert_eq!(e.reap_finished(), 0);
    }

    #[test]
    fn graph_failure_skips_note() {
        let mut g = OfflineGraph::new(SR);
        g.close();
        let mut e = SynthEngine::with_graph(g);
        e.play_sound("C4");
        assert!(!e.has_voice("C4"));
    }

    #[test]
    fn shutdown_cancels_pending_releases() {
        let mut e = engine();
        e.play_sound("C4");
        e.play_sound("D4");
        e.stop_sound("C4");
        e.shutdown();
        assert_eq!(e.voice_count(), 0);
        assert_eq!(e.next_release_deadline(), None);
        assert!(e.graph().is_none());
        e.play_sound("C4");
        assert_eq!(e.voice_count(), 0, "engine is inert after shutdown");
        e.shutdown();
    }

    #[test]
    fn engine_is_a_note_sink() {
        let mut e = engine();
        {
            let sink: &mut dyn NoteSink = &mut e;
            sink.play_sound("A#4");
        }
        assert_eq!(e.voice_frequency("A#4"), Some(466.16));
        {
            let sink: &mut dyn NoteSink = &mut e;
            sink.stop_sound("A#4");
        }
        assert!(e.is_releasing("A#4"));
    }

    #[test]
    fn release_task_due_strictly_after_deadline() {
        let task = ReleaseTask { deadline: 1.0 };
        assert!(!task.is_due(0.9));
        assert!(!task.is_due(1.0));
        assert!(task.is_due(1.0 + 1e-9));
    }
}
