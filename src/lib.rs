//! Real-time microtonal MIDI retuning.
//!
//! This crate retunes incoming MIDI note events to arbitrary microtonal
//! scales described by the two Scala text formats: `.scl` scale files
//! (frequency ratios per scale degree) and `.kbm` keyboard mappings (which
//! MIDI keys play which degrees, and where absolute pitch is anchored).
//!
//! The [`Tuning`] engine turns a MIDI note number into a frequency; the
//! [`NoteEventProcessor`] folds that frequency back onto the 12-TET MIDI
//! grid as the nearest note plus a per-note pitch bend, and spreads
//! simultaneous notes across MPE member channels so each bend stays
//! independent.
//!
//! Parsing happens off the real-time path and commits by wholesale value
//! swap: a failed load never leaves partial state behind. The processor
//! itself is single-owner, allocation-light, and drains one event block per
//! call. A host that reloads tuning files from another thread must
//! serialize access to the processor (a lock or an `Arc` swap); no
//! mid-parse state can ever be observed through the public API.

#![warn(missing_docs)]

pub mod midi;
pub mod tuning;

/// Number of MIDI note numbers (0-127).
pub const MIDI_NOTE_COUNT: usize = 128;

/// Standard concert pitch of MIDI note 69 (A4) in Hz.
pub const A4_FREQ: f64 = 440.0;

pub use midi::processor::NoteEventProcessor;
pub use midi::{EventBuffer, MidiMessage, TimedMessage};
pub use tuning::engine::Tuning;
pub use tuning::keyboard_map::KeyboardMap;
pub use tuning::scale::Scale;
pub use tuning::TuningError;
