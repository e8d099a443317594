//! MIDI event model shared between the retuning processor and its host.
//!
//! The host hands the processor one [`EventBuffer`] per audio block; events
//! carry a sample position inside the block and stay ordered by it.

pub mod channels;
pub mod processor;

use serde::{Deserialize, Serialize};

/// Center (no-bend) position of the 14-bit pitch wheel.
pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// Highest legal 14-bit pitch wheel value.
pub const PITCH_WHEEL_MAX: u16 = 16383;

/// The channel-voice messages the processor understands.
///
/// Channels are 0-based (0-15). `ControlChange` stands in for every message
/// type the processor forwards without looking at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    /// Key pressed.
    NoteOn {
        /// 0-based MIDI channel.
        channel: u8,
        /// MIDI note number.
        note: u8,
        /// Key velocity.
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// 0-based MIDI channel.
        channel: u8,
        /// MIDI note number.
        note: u8,
        /// Release velocity.
        velocity: u8,
    },
    /// Per-key pressure while held.
    PolyAftertouch {
        /// 0-based MIDI channel.
        channel: u8,
        /// MIDI note number.
        note: u8,
        /// Pressure amount.
        pressure: u8,
    },
    /// 14-bit pitch wheel position.
    PitchBend {
        /// 0-based MIDI channel.
        channel: u8,
        /// Wheel position, 8192 = centered.
        value: u16,
    },
    /// Controller change (or any other pass-through message).
    ControlChange {
        /// 0-based MIDI channel.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Controller value.
        value: u8,
    },
    /// All-notes-off for the whole zone.
    AllNotesOff {
        /// 0-based MIDI channel.
        channel: u8,
    },
}

/// A message stamped with its sample position inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedMessage {
    /// The message itself.
    pub message: MidiMessage,
    /// Offset in samples from the start of the block.
    pub sample_position: usize,
}

/// One block of MIDI events, kept ordered by sample position. Messages
/// added at the same position keep their arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBuffer {
    events: Vec<TimedMessage>,
}

impl EventBuffer {
    /// An empty block.
    pub fn new() -> Self {
        EventBuffer::default()
    }

    /// Insert a message, keeping the buffer sorted by sample position.
    pub fn add_event(&mut self, message: MidiMessage, sample_position: usize) {
        let index = self
            .events
            .partition_point(|e| e.sample_position <= sample_position);
        self.events.insert(
            index,
            TimedMessage {
                message,
                sample_position,
            },
        );
    }

    /// Events in sample-position order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimedMessage> {
        self.events.iter()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the block holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Exchange contents with another buffer without copying events.
    pub fn swap_with(&mut self, other: &mut EventBuffer) {
        std::mem::swap(&mut self.events, &mut other.events);
    }
}

impl<'a> IntoIterator for &'a EventBuffer {
    type Item = &'a TimedMessage;
    type IntoIter = std::slice::Iter<'a, TimedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Fractional MIDI note number for a frequency, with note 69 at `a4_freq`.
pub fn frequency_to_midi(freq: f64, a4_freq: f64) -> f64 {
    69.0 + 12.0 * (freq / a4_freq).log2()
}

/// Map a signed semitone offset to a 14-bit pitch wheel position for the
/// given bend range, clamped to the legal wheel values.
pub fn pitch_wheel_position(semitones: f64, bend_range_semitones: u8) -> u16 {
    let offset = 8192.0 * semitones / bend_range_semitones as f64;
    (PITCH_WHEEL_CENTER as f64 + offset).round().clamp(0.0, PITCH_WHEEL_MAX as f64) as u16
}
