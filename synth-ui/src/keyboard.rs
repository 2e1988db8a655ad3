use dsp_core::{NoteSink, KEYS};
use egui;

use crate::key::{Key, KeyInput};

/// Turns per-frame pointer state into DOM-style key events.
///
/// The pointer leaving a key (by moving or leaving the canvas) reports a
/// leave on that key; a primary press or release over a key reports down or
/// up on it. A press and release in the same frame come out in that order.
#[derive(Debug, Default)]
pub struct PointerTracker {
    hovered: Option<usize>,
}

impl PointerTracker {
    pub fn update(&mut self, hit: Option<usize>, pressed: bool, released: bool) -> Vec<(usize, KeyInput)> {
        let mut events = Vec::new();
        if self.hovered != hit {
            if let Some(prev) = self.hovered {
                events.push((prev, KeyInput::PointerLeave));
            }
            self.hovered = hit;
        }
        if let Some(index) = hit {
            if pressed {
                events.push((index, KeyInput::PointerDown));
            }
            if released {
                events.push((index, KeyInput::PointerUp));
            }
        }
        events
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }
}

/// The character a browser would report for `key`, if it is one a key can
/// be bound to. Shift only produces uppercase letters.
pub fn char_for_key(key: egui::Key, shift: bool) -> Option<char> {
    use egui::Key as K;
    let c = match key {
        K::A => 'a',
        K::B => 'b',
        K::C => 'c',
        K::D => 'd',
        K::E => 'e',
        K::F => 'f',
        K::G => 'g',
        K::H => 'h',
        K::I => 'i',
        K::J => 'j',
        K::K => 'k',
        K::L => 'l',
        K::M => 'm',
        K::N => 'n',
        K::O => 'o',
        K::P => 'p',
        K::Q => 'q',
        K::R => 'r',
        K::S => 's',
        K::T => 't',
        K::U => 'u',
        K::V => 'v',
        K::W => 'w',
        K::X => 'x',
        K::Y => 'y',
        K::Z => 'z',
        K::Num0 => '0',
        K::Num1 => '1',
        K::Num2 => '2',
        K::Num3 => '3',
        K::Num4 => '4',
        K::Num5 => '5',
        K::Num6 => '6',
        K::Num7 => '7',
        K::Num8 => '8',
        K::Num9 => '9',
        K::Comma => ',',
        K::Period => '.',
        K::Semicolon => ';',
        K::Slash => '/',
        K::Minus => '-',
        _ => return None,
    };
    if shift {
        c.is_ascii_lowercase().then(|| c.to_ascii_uppercase())
    } else {
        Some(c)
    }
}

struct KeyLayout {
    index: usize,
    rect: egui::Rect,
    is_sharp: bool,
}

/// The 13-key keyboard: owns the keys and routes pointer and physical-key
/// input to them.
pub struct PianoKeyboard {
    keys: Vec<Key>,
    pointer: PointerTracker,
}

impl PianoKeyboard {
    pub fn new() -> Self {
        Self {
            keys: KEYS.iter().copied().map(Key::new).collect(),
            pointer: PointerTracker::default(),
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn index_of(&self, keyboard_key: char) -> Option<usize> {
        self.keys.iter().position(|k| k.keyboard_key() == keyboard_key)
    }

    /// Deliver pointer input to the key at `index`.
    pub fn pointer_input(&mut self, index: usize, input: KeyInput, sink: &mut dyn NoteSink) {
        if let Some(key) = self.keys.get_mut(index) {
            key.handle(input, sink);
        }
    }

    /// Deliver a physical key event to every key; each decides whether it is
    /// bound to `c`.
    pub fn key_event(&mut self, c: char, pressed: bool, sink: &mut dyn NoteSink) {
        let input = if pressed {
            KeyInput::KeyDown(c)
        } else {
            KeyInput::KeyUp(c)
        };
        for key in &mut self.keys {
            key.handle(input, sink);
        }
    }

    /// Handle this frame's input, then paint the keyboard into `rect`.
    pub fn show(&mut self, ui: &egui::Ui, rect: egui::Rect, sink: &mut dyn NoteSink) {
        let layout = self.compute_layout(rect);

        let (hover, pressed, released, key_events) = ui.input(|i| {
            // Auto-repeats are kept; the keys' own press guard absorbs them.
            let key_events: Vec<(char, bool)> = i
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed,
                        modifiers,
                        ..
                    } => char_for_key(*key, modifiers.shift).map(|c| (c, *pressed)),
                    _ => None,
                })
                .collect();
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                key_events,
            )
        });

        let hit = hover
            .filter(|pos| rect.contains(*pos))
            .and_then(|pos| hit_test(&layout, pos));
        for (index, input) in self.pointer.update(hit, pressed, released) {
            self.pointer_input(index, input, sink);
        }
        for (c, down) in key_events {
            self.key_event(c, down, sink);
        }

        // Naturals first, sharps are drawn over them
        let painter = ui.painter_at(rect);
        for l in layout.iter().filter(|l| !l.is_sharp) {
            self.keys[l.index].paint(&painter, l.rect);
        }
        for l in layout.iter().filter(|l| l.is_sharp) {
            self.keys[l.index].paint(&painter, l.rect);
        }
    }

    fn compute_layout(&self, rect: egui::Rect) -> Vec<KeyLayout> {
        let white_count = self.keys.iter().filter(|k| !k.is_sharp()).count().max(1);
        let white_key_width = rect.width() / white_count as f32;
        let sharp_key_width = white_key_width * 0.6;
        let sharp_key_height = rect.height() * 0.6;

        let mut layout = Vec::with_capacity(self.keys.len());
        let mut white_idx = 0usize;
        for (index, key) in self.keys.iter().enumerate() {
            if key.is_sharp() {
                // Straddles the boundary between its neighbouring naturals
                let x = rect.left() + white_idx as f32 * white_key_width - sharp_key_width / 2.0;
                layout.push(KeyLayout {
                    index,
                    rect: egui::Rect::from_min_size(
                        egui::pos2(x, rect.top()),
                        egui::vec2(sharp_key_width, sharp_key_height),
                    ),
                    is_sharp: true,
                });
            } else {
                let x = rect.left() + white_idx as f32 * white_key_width;
                layout.push(KeyLayout {
                    index,
                    rect: egui::Rect::from_min_size(
                        egui::pos2(x, rect.top()),
                        egui::vec2(white_key_width, rect.height()),
                    ),
                    is_sharp: false,
                });
                white_idx += 1;
            }
        }
        layout
    }
}

impl Default for PianoKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Sharps overlap the naturals, so they win.
fn hit_test(layout: &[KeyLayout], pos: egui::Pos2) -> Option<usize> {
    layout
        .iter()
        .filter(|l| l.is_sharp)
        .chain(layout.iter().filter(|l| !l.is_sharp))
        .find(|l| l.rect.contains(pos))
        .map(|l| l.index)
}
