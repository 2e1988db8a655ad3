use dsp_core::NoteSink;
use egui;

use crate::keyboard::PianoKeyboard;

const KEYBOARD_MAX_WIDTH: f32 = 720.0;
const KEYBOARD_ASPECT: f32 = 0.35;

/// Keyboard size for the space available: as wide as allowed, height
/// following the aspect ratio but never taller than the space left.
pub fn keyboard_size(available: egui::Vec2) -> egui::Vec2 {
    let width = available.x.min(KEYBOARD_MAX_WIDTH).max(0.0);
    let height = (width * KEYBOARD_ASPECT).min(available.y).max(0.0);
    egui::vec2(width, height)
}

/// Render the synth page: a header, a hint line, and the keyboard.
///
/// Key presses go straight to `sink`. `audio_available` only changes the
/// hint; a silent sink is still driven so the keys keep working visually.
pub fn render_synth_ui(
    ui: &mut egui::Ui,
    keyboard: &mut PianoKeyboard,
    sink: &mut dyn NoteSink,
    audio_available: bool,
) {
    ui.spacing_mut().item_spacing = egui::vec2(8.0, 6.0);

    ui.vertical_centered(|ui| {
        ui.add_space(16.0);
        ui.heading("Synth Keyboard");
        if audio_available {
            ui.label("Click the keys, or play Z X C V B N M , with S D G H J for the sharps");
        } else {
            ui.colored_label(
                egui::Color32::from_rgb(230, 160, 60),
                "Audio output is unavailable in this browser",
            );
        }
        ui.add_space(12.0);

        let size = keyboard_size(ui.available_size());
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        keyboard.show(ui, rect, sink);
    });
}
