//! Keyboard mapping (`.kbm`) model: the cyclic note-to-degree table and the
//! octave arithmetic around it.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{leading_number, significant_text, TuningError};
use crate::MIDI_NOTE_COUNT;

/// A parsed Scala keyboard mapping.
///
/// The mapping assigns each MIDI key, cyclically around the middle note, to
/// a scale degree of the owning scale (or to silence, the file's `x`
/// sentinel). Degree `0` is the implicit 1/1; degree `k > 0` is the `k`-th
/// listed note of the scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyboardMap {
    /// One entry per key of the repeating period; `None` is unmapped.
    mapping: Vec<Option<usize>>,
    /// First and last MIDI notes eligible for retuning. Informational;
    /// not enforced during lookup.
    retune_range: (i32, i32),
    /// Anchor key: offset 0 of the mapping period. Parsed into 0-127 but
    /// may be carried outside that range by modulation.
    middle_note: i32,
    /// MIDI note whose absolute frequency is pinned.
    reference_note: u8,
    /// Frequency in Hz of the reference note.
    reference_freq: f64,
    /// Zero-based index into the scale's notes whose ratio repeats once per
    /// full period traversal.
    formal_octave_degree: usize,
}

impl Default for KeyboardMap {
    fn default() -> Self {
        KeyboardMap {
            mapping: Vec::new(),
            retune_range: (0, 127),
            middle_note: 60,
            reference_note: 69,
            reference_freq: 440.0,
            formal_octave_degree: 0,
        }
    }
}

impl KeyboardMap {
    /// Default linear mapping for a scale of `note_count` notes: key
    /// `middle + i` plays degree `i`, and the last listed note is the
    /// formal octave.
    pub fn linear(note_count: usize) -> Self {
        KeyboardMap {
            mapping: (0..note_count).map(Some).collect(),
            formal_octave_degree: note_count.saturating_sub(1),
            ..KeyboardMap::default()
        }
    }

    /// Number of keys after which the mapping repeats.
    pub fn period(&self) -> usize {
        self.mapping.len()
    }

    /// The note-to-degree table, one entry per key of the period.
    pub fn mapping(&self) -> &[Option<usize>] {
        &self.mapping
    }

    /// First and last MIDI notes eligible for retuning (inclusive).
    pub fn retune_range(&self) -> (i32, i32) {
        self.retune_range
    }

    /// The mapping's anchor key.
    pub fn middle_note(&self) -> i32 {
        self.middle_note
    }

    pub(crate) fn set_middle_note(&mut self, note: i32) {
        self.middle_note = note;
    }

    /// MIDI note whose frequency is pinned to [`reference_freq`](Self::reference_freq).
    pub fn reference_note(&self) -> u8 {
        self.reference_note
    }

    /// Frequency in Hz that the reference note must resolve to.
    pub fn reference_freq(&self) -> f64 {
        self.reference_freq
    }

    /// Zero-based index of the scale note treated as one formal octave.
    pub fn formal_octave_degree(&self) -> usize {
        self.formal_octave_degree
    }

    /// Scale degree played by `note`, or `None` for unmapped (silent) keys.
    ///
    /// Cyclic lookup with the mapping period, anchored at the middle note;
    /// notes below the anchor wrap with true mathematical modulo.
    ///
    /// Panics if the mapping is empty: lookups on an unloaded map are a
    /// caller bug, not a data error.
    pub fn scale_degree(&self, note: i32) -> Option<usize> {
        assert!(!self.mapping.is_empty(), "keyboard mapping is empty");
        let period = self.mapping.len() as i32;
        let index = (note - self.middle_note).rem_euclid(period);
        self.mapping[index as usize]
    }

    /// Signed number of whole mapping periods between `note` and the middle
    /// note (floor division, so notes below the anchor count negative).
    ///
    /// Panics if the mapping is empty.
    pub fn octave(&self, note: i32) -> i32 {
        assert!(!self.mapping.is_empty(), "keyboard mapping is empty");
        let period = self.mapping.len() as i32;
        (note - self.middle_note).div_euclid(period)
    }

    /// Parse a `.kbm` source against a scale of `note_count` notes.
    ///
    /// Builds a fresh value; the caller commits it by swap, which is what
    /// makes a failed load invisible.
    pub(crate) fn parse(text: &str, note_count: usize) -> Result<Self, TuningError> {
        #[derive(Clone, Copy)]
        enum Field {
            Period,
            RangeLow,
            RangeHigh,
            Middle,
            Reference,
            Frequency,
            OctaveDegree,
            Entries,
        }

        let mut field = Field::Period;
        let mut map = KeyboardMap::default();
        let mut period = 0usize;

        for (index, raw) in text.split('\n').enumerate() {
            let lineno = index + 1;
            let Some(line) = significant_text(raw) else {
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }

            match field {
                Field::Period => {
                    let value = parse_int(line, lineno)?;
                    if value <= 0 {
                        return Err(TuningError::NonPositivePeriod);
                    }
                    // More keys than the keyboard has is a malformed file,
                    // and the period sizes the mapping allocation.
                    if value as usize > MIDI_NOTE_COUNT {
                        return Err(TuningError::OversizedPeriod(value));
                    }
                    period = value as usize;
                }
                Field::RangeLow => map.retune_range.0 = parse_range_bound(line, lineno)?,
                Field::RangeHigh => map.retune_range.1 = parse_range_bound(line, lineno)?,
                Field::Middle => {
                    let value = parse_int(line, lineno)?;
                    if !(0..=127).contains(&value) {
                        return Err(TuningError::MiddleNoteOutOfRange(value));
                    }
                    map.middle_note = value as i32;
                }
                Field::Reference => {
                    let value = parse_int(line, lineno)?;
                    if !(0..=127).contains(&value) {
                        return Err(TuningError::ReferenceNoteOutOfRange(value));
                    }
                    map.reference_note = value as u8;
                }
                Field::Frequency => {
                    let value = parse_float(line, lineno)?;
                    if !(value > 0.0 && value.is_finite()) {
                        return Err(TuningError::NonPositiveReferenceFreq);
                    }
                    map.reference_freq = value;
                }
                Field::OctaveDegree => {
                    // The file counts degrees from 1; stored zero-based.
                    let value = parse_int(line, lineno)?;
                    if value < 1 || value as usize > note_count {
                        return Err(TuningError::FormalOctaveOutOfRange(value));
                    }
                    map.formal_octave_degree = value as usize - 1;
                }
                Field::Entries => {
                    if line.trim() == "x" {
                        map.mapping.push(None);
                    } else {
                        let value = parse_int(line, lineno)
                            .map_err(|_| TuningError::BadMappingEntry { line: lineno })?;
                        if value < 0 {
                            return Err(TuningError::BadMappingEntry { line: lineno });
                        }
                        let degree = value as usize;
                        if degree > note_count {
                            return Err(TuningError::DegreeOutOfRange { degree });
                        }
                        map.mapping.push(Some(degree));
                    }
                    if map.mapping.len() > period {
                        return Err(TuningError::TooManyMappingEntries);
                    }
                }
            }

            field = match field {
                Field::Period => Field::RangeLow,
                Field::RangeLow => Field::RangeHigh,
                Field::RangeHigh => Field::Middle,
                Field::Middle => Field::Reference,
                Field::Reference => Field::Frequency,
                Field::Frequency => Field::OctaveDegree,
                Field::OctaveDegree | Field::Entries => Field::Entries,
            };
        }

        if !matches!(field, Field::Entries) {
            return Err(TuningError::IncompleteHeader);
        }

        // Keys the file leaves out are unmapped.
        while map.mapping.len() < period {
            map.mapping.push(None);
        }

        debug!(
            "parsed keyboard mapping: period {period}, middle {}, reference {} -> {} Hz",
            map.middle_note, map.reference_note, map.reference_freq
        );
        Ok(map)
    }
}

fn parse_range_bound(line: &str, lineno: usize) -> Result<i32, TuningError> {
    let value = parse_int(line, lineno)?;
    if !(0..=127).contains(&value) {
        return Err(TuningError::RetuneRangeOutOfRange(value));
    }
    Ok(value as i32)
}

fn parse_int(line: &str, lineno: usize) -> Result<i64, TuningError> {
    let (token, _) =
        leading_number(line, false).ok_or(TuningError::ExpectedNumber { line: lineno })?;
    token
        .parse()
        .map_err(|_| TuningError::ExpectedNumber { line: lineno })
}

fn parse_float(line: &str, lineno: usize) -> Result<f64, TuningError> {
    let (token, _) =
        leading_number(line, true).ok_or(TuningError::ExpectedNumber { line: lineno })?;
    token
        .parse()
        .map_err(|_| TuningError::ExpectedNumber { line: lineno })
}
