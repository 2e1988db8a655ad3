//! Platform-free core of the synth keyboard.
//!
//! Everything here runs identically on native and WASM: the note table, the
//! envelope, the voice registry, and an offline audio graph the browser's
//! Web Audio graph can be swapped for.

pub mod envelope;
pub mod graph;
pub mod notes;
pub mod offline;
pub mod oscillator;
pub mod param;
pub mod params;
pub mod synth;

pub use graph::{AudioGraph, GraphError};
pub use notes::{NoteDescriptor, KEYS};
pub use offline::OfflineGraph;
pub use params::{EnvelopeParams, SynthConfig, Waveform};
pub use synth::{NoteSink, SynthEngine};
