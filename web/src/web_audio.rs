use dsp_core::graph::{AudioGraph, GraphError};
use dsp_core::param::ParamEvent;
use dsp_core::Waveform;
use wasm_bindgen::JsValue;
use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

/// One oscillator → gain pair, connected to the context's destination.
pub struct WebVoice {
    oscillator: OscillatorNode,
    gain: GainNode,
}

/// [`AudioGraph`] on top of the browser's Web Audio API.
///
/// The envelope runs on the browser's audio thread once scheduled; this side
/// only ever issues scheduling calls and reads back the current gain.
pub struct WebAudioGraph {
    context: AudioContext,
}

fn js_err(e: JsValue) -> GraphError {
    GraphError::Backend(format!("{:?}", e))
}

fn oscillator_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Sawtooth => OscillatorType::Sawtooth,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}

impl WebAudioGraph {
    pub fn new() -> Result<Self, GraphError> {
        let context = AudioContext::new().map_err(|e| GraphError::Unavailable(format!("{:?}", e)))?;
        log::info!("audio context ready at {} Hz", context.sample_rate());
        Ok(Self { context })
    }

    /// Browsers create the context suspended until a user gesture; the first
    /// key press is one.
    fn resume_if_suspended(&self) {
        if self.context.state() != AudioContextState::Suspended {
            return;
        }
        match self.context.resume() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::warn!("audio context did not resume: {:?}", e);
                }
            }),
            Err(e) => log::warn!("audio context did not resume: {:?}", e),
        }
    }
}

impl AudioGraph for WebAudioGraph {
    type Voice = WebVoice;

    fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    fn create_voice(&mut self, waveform: Waveform, frequency: f32) -> Result<WebVoice, GraphError> {
        self.resume_if_suspended();
        let now = self.context.current_time();

        let oscillator = self.context.create_oscillator().map_err(js_err)?;
        oscillator.set_type(oscillator_type(waveform));
        oscillator
            .frequency()
            .set_value_at_time(frequency, now)
            .map_err(js_err)?;

        let gain = self.context.create_gain().map_err(js_err)?;
        gain.gain().set_value(0.0);

        oscillator.connect_with_audio_node(&gain).map_err(js_err)?;
        gain.connect_with_audio_node(&self.context.destination())
            .map_err(js_err)?;

        Ok(WebVoice { oscillator, gain })
    }

    fn start(&mut self, voice: &WebVoice) -> Result<(), GraphError> {
        voice.oscillator.start().map_err(js_err)
    }

    fn stop(&mut self, voice: &WebVoice, when: f64) -> Result<(), GraphError> {
        voice.oscillator.stop_with_when(when).map_err(js_err)
    }

    fn schedule_gain(&mut self, voice: &WebVoice, event: ParamEvent) -> Result<(), GraphError> {
        let param = voice.gain.gain();
        let result = match event {
            ParamEvent::SetValue { value, time } => param.set_value_at_time(value, time),
            ParamEvent::LinearRamp { value, end_time } => {
                param.linear_ramp_to_value_at_time(value, end_time)
            }
            ParamEvent::ExponentialRamp { value, end_time } => {
                param.exponential_ramp_to_value_at_time(value, end_time)
            }
            ParamEvent::Cancel { from } => param.cancel_scheduled_values(from),
        };
        result.map(|_| ()).map_err(js_err)
    }

    fn gain_value(&self, voice: &WebVoice) -> f32 {
        voice.gain.gain().value()
    }

    fn dispose(&mut self, voice: WebVoice) {
        if let Err(e) = voice.oscillator.disconnect() {
            log::debug!("oscillator disconnect: {:?}", e);
        }
        if let Err(e) = voice.gain.disconnect() {
            log::debug!("gain disconnect: {:?}", e);
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.context.close() {
            log::warn!("could not close audio context: {:?}", e);
        }
    }
}
