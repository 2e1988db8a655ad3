use dsp_core::{NoteDescriptor, NoteSink};
use egui;

/// Input reaching a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    PointerDown,
    PointerUp,
    PointerLeave,
    /// A physical key went down (or auto-repeated), as the character it types.
    KeyDown(char),
    KeyUp(char),
}

/// One piano key. Owns its pressed state and turns input into
/// `play_sound`/`stop_sound` calls on the sink it is given.
#[derive(Debug, Clone)]
pub struct Key {
    descriptor: NoteDescriptor,
    is_pressed: bool,
}

impl Key {
    pub fn new(descriptor: NoteDescriptor) -> Self {
        Self {
            descriptor,
            is_pressed: false,
        }
    }

    pub fn note(&self) -> &'static str {
        self.descriptor.note
    }

    pub fn keyboard_key(&self) -> char {
        self.descriptor.keyboard_key
    }

    pub fn is_sharp(&self) -> bool {
        self.descriptor.is_sharp
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    pub fn handle(&mut self, input: KeyInput, sink: &mut dyn NoteSink) {
        let bound = self.descriptor.keyboard_key;
        match input {
            KeyInput::PointerDown => self.press(sink),
            KeyInput::PointerUp | KeyInput::PointerLeave => self.release(sink),
            KeyInput::KeyDown(c) if c == bound => self.press(sink),
            KeyInput::KeyUp(c) if c == bound => self.release(sink),
            KeyInput::KeyDown(_) | KeyInput::KeyUp(_) => {}
        }
    }

    fn press(&mut self, sink: &mut dyn NoteSink) {
        // Auto-repeat lands here too
        if !self.is_pressed {
            self.is_pressed = true;
            sink.play_sound(self.descriptor.note);
        }
    }

    // Unconditional: a pointer leaving an idle key still reports a stop.
    fn release(&mut self, sink: &mut dyn NoteSink) {
        self.is_pressed = false;
        sink.stop_sound(self.descriptor.note);
    }

    /// Note name shown on naturals; sharps are too narrow for it.
    pub fn note_label(&self) -> Option<String> {
        (!self.descriptor.is_sharp).then(|| self.descriptor.note.to_uppercase())
    }

    pub fn keyboard_label(&self) -> String {
        self.descriptor.keyboard_key.to_uppercase().collect()
    }

    pub fn paint(&self, painter: &egui::Painter, rect: egui::Rect) {
        let (fill, stroke, text) = match (self.is_sharp(), self.is_pressed) {
            (false, false) => (
                egui::Color32::from_rgb(240, 240, 240),
                egui::Color32::from_rgb(80, 80, 80),
                egui::Color32::from_rgb(100, 100, 100),
            ),
            (false, true) => (
                egui::Color32::from_rgb(100, 180, 255),
                egui::Color32::from_rgb(80, 80, 80),
                egui::Color32::from_rgb(40, 40, 40),
            ),
            (true, false) => (
                egui::Color32::from_rgb(30, 30, 30),
                egui::Color32::from_rgb(10, 10, 10),
                egui::Color32::from_rgb(200, 200, 200),
            ),
            (true, true) => (
                egui::Color32::from_rgb(60, 120, 200),
                egui::Color32::from_rgb(10, 10, 10),
                egui::Color32::from_rgb(230, 230, 230),
            ),
        };

        painter.rect_filled(rect, 2.0, fill);
        painter.rect_stroke(
            rect,
            2.0,
            egui::Stroke::new(1.0, stroke),
            egui::StrokeKind::Middle,
        );

        let font = egui::FontId::proportional((rect.width() * 0.3).clamp(6.0, 14.0));
        let line = font.size + 4.0;
        let bottom = egui::pos2(rect.center().x, rect.bottom() - 4.0);
        painter.text(
            bottom,
            egui::Align2::CENTER_BOTTOM,
            self.keyboard_label(),
            font.clone(),
            text,
        );
        if let Some(label) = self.note_label() {
            painter.text(
                bottom - egui::vec2(0.0, line),
                egui::Align2::CENTER_BOTTOM,
                label,
                font,
                text,
            );
        }
    }
}
