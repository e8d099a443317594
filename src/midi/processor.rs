//! Block-based MIDI retuning: folds target frequencies back onto the MIDI
//! grid and spreads simultaneous detuned notes across MPE member channels.

use std::path::Path;

use log::trace;

use super::channels::{ChannelAllocator, ZoneLayout};
use super::{frequency_to_midi, pitch_wheel_position, EventBuffer, MidiMessage, TimedMessage};
use crate::tuning::engine::Tuning;
use crate::tuning::TuningError;
use crate::{A4_FREQ, MIDI_NOTE_COUNT};

/// Retunes one block of note events at a time.
///
/// Each sounding note is assigned its own member channel so its fractional
/// pitch offset can ride a per-channel pitch bend without disturbing other
/// notes. The processor owns pitch bend on its output channels, so host
/// pitch bend messages are dropped rather than forwarded. With no scale
/// loaded the processor is a bypass: the block passes through untouched.
pub struct NoteEventProcessor {
    tuning: Tuning,
    allocator: ChannelAllocator,
    /// Member channel and retuned note each held key currently sounds as.
    /// The release must target this stored note; the key's target can
    /// change while it is held (mapping reload, modulation).
    note_channels: [Option<(u8, u8)>; MIDI_NOTE_COUNT],
    last_note_played: Option<u8>,
    mod_center: Option<u8>,
    mod_pivot: Option<u8>,
}

impl Default for NoteEventProcessor {
    fn default() -> Self {
        NoteEventProcessor::new()
    }
}

impl NoteEventProcessor {
    /// A processor with the full 15-member lower zone.
    pub fn new() -> Self {
        NoteEventProcessor::with_zone(ZoneLayout::lower(15))
    }

    /// A processor for a custom zone layout.
    pub fn with_zone(layout: ZoneLayout) -> Self {
        NoteEventProcessor {
            tuning: Tuning::new(),
            allocator: ChannelAllocator::new(layout),
            note_channels: [None; MIDI_NOTE_COUNT],
            last_note_played: None,
            mod_center: None,
            mod_pivot: None,
        }
    }

    /// The tuning engine driving this processor.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Mutable access to the tuning engine.
    pub fn tuning_mut(&mut self) -> &mut Tuning {
        &mut self.tuning
    }

    /// Load a `.scl` scale file from disk.
    pub fn load_scl_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        self.tuning.load_scl_file(path)
    }

    /// Load a `.scl` source from memory.
    pub fn load_scl_str(&mut self, text: &str) -> Result<(), TuningError> {
        self.tuning.load_scl_str(text)
    }

    /// Load a `.kbm` keyboard mapping file from disk.
    pub fn load_kbm_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        self.tuning.load_kbm_file(path)
    }

    /// Load a `.kbm` source from memory.
    pub fn load_kbm_str(&mut self, text: &str) -> Result<(), TuningError> {
        self.tuning.load_kbm_str(text)
    }

    /// Last note-on seen by [`process`](Self::process), mapped or not.
    pub fn last_note_played(&self) -> Option<u8> {
        self.last_note_played
    }

    /// Pick the modulation center explicitly.
    pub fn set_center(&mut self, note: u8) {
        self.mod_center = Some(note);
    }

    /// Use the last played note as the modulation center.
    pub fn set_center_to_last_played(&mut self) {
        self.mod_center = self.last_note_played;
    }

    /// Pick the modulation pivot explicitly.
    pub fn set_pivot(&mut self, note: u8) {
        self.mod_pivot = Some(note);
    }

    /// Use the last played note as the modulation pivot.
    pub fn set_pivot_to_last_played(&mut self) {
        self.mod_pivot = self.last_note_played;
    }

    /// Modulate from the stored center to the stored pivot, if both are
    /// set and inside the MIDI range. See [`Tuning::modulate`].
    pub fn modulate(&mut self) {
        if let (Some(center), Some(pivot)) = (self.mod_center, self.mod_pivot) {
            if (center as usize) < MIDI_NOTE_COUNT && (pivot as usize) < MIDI_NOTE_COUNT {
                self.tuning.modulate(center, pivot);
            }
        }
    }

    /// Transform one block in place. Must fully drain before returning;
    /// nothing here blocks or allocates beyond the output buffer.
    pub fn process(&mut self, buffer: &mut EventBuffer) {
        if !self.tuning.has_scale() {
            return;
        }

        let input = std::mem::take(buffer);
        let mut out = EventBuffer::new();
        for &TimedMessage {
            message,
            sample_position,
        } in input.iter()
        {
            match message {
                MidiMessage::NoteOn { note, velocity, .. } => {
                    self.process_note_on(note, velocity, sample_position, &mut out)
                }
                MidiMessage::NoteOff {
                    channel,
                    note,
                    velocity,
                } => self.process_note_off(channel, note, velocity, sample_position, &mut out),
                MidiMessage::PolyAftertouch {
                    channel,
                    note,
                    pressure,
                } => self.process_aftertouch(channel, note, pressure, sample_position, &mut out),
                MidiMessage::AllNotesOff { .. } => {
                    self.allocator.reset();
                    self.note_channels = [None; MIDI_NOTE_COUNT];
                    out.add_event(message, sample_position);
                }
                // The output channels' bend is ours alone.
                MidiMessage::PitchBend { .. } => trace!("dropping host pitch bend"),
                MidiMessage::ControlChange { .. } => out.add_event(message, sample_position),
            }
        }
        *buffer = out;
    }

    /// Target frequency folded back onto the MIDI grid: the nearest note
    /// plus the fractional remainder in semitones. `None` for silent keys.
    fn retuned_target(&mut self, note: u8) -> Option<(u8, f64)> {
        let freq = self.tuning.frequency_for_note(note)?;
        let target = frequency_to_midi(freq, A4_FREQ);
        let rounded = target.round();
        Some((rounded.clamp(0.0, 127.0) as u8, target - rounded))
    }

    fn process_note_on(&mut self, note: u8, velocity: u8, at: usize, out: &mut EventBuffer) {
        self.last_note_played = Some(note);
        let Some((retuned, fraction)) = self.retuned_target(note) else {
            trace!("note {note} is unmapped, swallowing");
            return;
        };
        let channel = match self.note_channels[note as usize] {
            Some((channel, _)) => channel,
            None => self.allocator.allocate(),
        };
        self.note_channels[note as usize] = Some((channel, retuned));
        let bend = pitch_wheel_position(fraction, self.allocator.layout().per_note_bend_range);
        // Bend first so the note never sounds at its un-bent pitch.
        out.add_event(MidiMessage::PitchBend { channel, value: bend }, at);
        out.add_event(
            MidiMessage::NoteOn {
                channel,
                note: retuned,
                velocity,
            },
            at,
        );
    }

    fn process_note_off(
        &mut self,
        original_channel: u8,
        note: u8,
        velocity: u8,
        at: usize,
        out: &mut EventBuffer,
    ) {
        match self.note_channels[note as usize] {
            // Release the stored note unconditionally; recomputing the
            // target here would strand the channel if the key went silent
            // or moved while held.
            Some((channel, sounding)) => {
                out.add_event(
                    MidiMessage::NoteOff {
                        channel,
                        note: sounding,
                        velocity,
                    },
                    at,
                );
                self.note_channels[note as usize] = None;
                self.allocator.release(channel);
            }
            // A release for a note we never retuned passes through as-is.
            None => out.add_event(
                MidiMessage::NoteOff {
                    channel: original_channel,
                    note,
                    velocity,
                },
                at,
            ),
        }
    }

    fn process_aftertouch(
        &mut self,
        original_channel: u8,
        note: u8,
        pressure: u8,
        at: usize,
        out: &mut EventBuffer,
    ) {
        match self.note_channels[note as usize] {
            // The channel's bend is already set; no fresh bend message.
            Some((channel, sounding)) => out.add_event(
                MidiMessage::PolyAftertouch {
                    channel,
                    note: sounding,
                    pressure,
                },
                at,
            ),
            // Pressure for a key we never retuned passes through as-is.
            None => out.add_event(
                MidiMessage::PolyAftertouch {
                    channel: original_channel,
                    note,
                    pressure,
                },
                at,
            ),
        }
    }
}
