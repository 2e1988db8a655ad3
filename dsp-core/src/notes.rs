/// One key of the keyboard: the pitch it plays, the physical key bound to it,
/// and whether it is drawn as a sharp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteDescriptor {
    pub note: &'static str,
    pub keyboard_key: char,
    pub is_sharp: bool,
}

const fn key(note: &'static str, keyboard_key: char, is_sharp: bool) -> NoteDescriptor {
    NoteDescriptor {
        note,
        keyboard_key,
        is_sharp,
    }
}

/// The keyboard, left to right: one chromatic octave from C4 up to C5.
/// Bottom letter row plays the naturals, the row above it the sharps.
pub const KEYS: [NoteDescriptor; 13] = [
    key("C4", 'z', false),
    key("C#4", 's', true),
    key("D4", 'x', false),
    key("D#4", 'd', true),
    key("E4", 'c', false),
    key("F4", 'v', false),
    key("F#4", 'g', true),
    key("G4", 'b', false),
    key("G#4", 'h', true),
    key("A4", 'n', false),
    key("A#4", 'j', true),
    key("B4", 'm', false),
    key("C5", ',', false),
];

/// Pitch of each note in Hz. C5 is deliberately absent and resolves
/// through [`FALLBACK_FREQUENCY`].
pub const FREQUENCIES: [(&str, f32); 12] = [
    ("C4", 261.63),
    ("C#4", 277.18),
    ("D4", 293.66),
    ("D#4", 311.13),
    ("E4", 329.63),
    ("F4", 349.23),
    ("F#4", 369.99),
    ("G4", 392.00),
    ("G#4", 415.30),
    ("A4", 440.00),
    ("A#4", 466.16),
    ("B4", 493.88),
];

/// Used for any note identifier missing from [`FREQUENCIES`].
pub const FALLBACK_FREQUENCY: f32 = 440.0;

pub fn frequency_for(note: &str) -> Option<f32> {
    FREQUENCIES
        .iter()
        .find(|(name, _)| *name == note)
        .map(|&(_, freq)| freq)
}

/// The key bound to a physical character, matched exactly (case-sensitive).
pub fn descriptor_for_key(c: char) -> Option<&'static NoteDescriptor> {
    KEYS.iter().find(|k| k.keyboard_key == c)
}

/// Convert a MIDI note number to an equal-tempered frequency in Hz (A4 = 440).
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}
