use std::time::Duration;

use dsp_core::{SynthConfig, SynthEngine};
use eframe::egui;
use synth_ui::{render_synth_ui, PianoKeyboard};

use crate::web_audio::WebAudioGraph;

// Cleanup runs on the next frame after a release ends; this is the slack.
const REAP_SLACK: f64 = 0.01;

pub struct SynthWebApp {
    engine: SynthEngine<WebAudioGraph>,
    keyboard: PianoKeyboard,
}

impl SynthWebApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        // The page's one audio output, for as long as the app lives.
        let graph = match WebAudioGraph::new() {
            Ok(graph) => Some(graph),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };

        Self {
            engine: SynthEngine::new(graph, SynthConfig::default()),
            keyboard: PianoKeyboard::new(),
        }
    }

    /// How long until the next voice finishes releasing, if any is.
    fn time_to_next_release(&self) -> Option<Duration> {
        let deadline = self.engine.next_release_deadline()?;
        let now = self.engine.graph()?.current_time();
        Some(Duration::from_secs_f64((deadline - now).max(0.0) + REAP_SLACK))
    }
}

impl eframe::App for SynthWebApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let reaped = self.engine.reap_finished();
        if reaped > 0 {
            log::trace!("reaped {} voices", reaped);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = self.engine.is_available();
            render_synth_ui(ui, &mut self.keyboard, &mut self.engine, available);
        });

        // Wake up again once a release tail is over so its voice is cleaned up
        if let Some(wait) = self.time_to_next_release() {
            ctx.request_repaint_after(wait);
        }
    }
}
