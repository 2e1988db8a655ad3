pub mod key;
pub mod keyboard;
pub mod layout;

pub use key::{Key, KeyInput};
pub use keyboard::{PianoKeyboard, PointerTracker};
pub use layout::render_synth_ui;
