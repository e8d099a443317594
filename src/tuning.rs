//! Microtonal tuning core: Scala file parsing and frequency derivation.
//!
//! [`scale::Scale`] holds the parsed `.scl` ratios and owns the
//! [`keyboard_map::KeyboardMap`] that assigns MIDI keys to scale degrees.
//! [`engine::Tuning`] combines both with a reference-frequency anchor to
//! produce per-note frequencies, and owns modulation (re-anchoring).

pub mod engine;
pub mod keyboard_map;
pub mod scale;

use thiserror::Error;

/// Failure taxonomy of the `.scl`/`.kbm` parsers.
///
/// Every `Err` from a load entry point guarantees that the target value is
/// unchanged; there is no partial-success state.
#[derive(Debug, Error)]
pub enum TuningError {
    /// The source file could not be read.
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    /// A line that should start with a numeric token does not.
    #[error("line {line}: expected a number")]
    ExpectedNumber {
        /// 1-based source line.
        line: usize,
    },

    /// A scale ratio evaluated to zero, a negative value, or a non-finite
    /// value.
    #[error("line {line}: note ratio must be positive")]
    NonPositiveRatio {
        /// 1-based source line.
        line: usize,
    },

    /// The scale file ended before the declared note count was read.
    #[error("scale file ended before the note count")]
    IncompleteScale,

    /// The declared note count is negative.
    #[error("scale note count must not be negative")]
    NegativeNoteCount,

    /// The number of listed notes differs from the declared count.
    #[error("scale declares {declared} notes but lists {found}")]
    NoteCountMismatch {
        /// Count from line 2 of the file.
        declared: usize,
        /// Ratios actually listed.
        found: usize,
    },

    /// No scale is loaded, so there is nothing to map keys onto.
    #[error("cannot load a keyboard mapping before a scale")]
    NoScaleLoaded,

    /// The mapping file ended inside the seven metadata lines.
    #[error("keyboard mapping header is incomplete")]
    IncompleteHeader,

    /// The mapping period must be at least one key.
    #[error("mapping period must be positive")]
    NonPositivePeriod,

    /// The mapping period exceeds the number of MIDI keys.
    #[error("mapping period {0} exceeds the MIDI note range")]
    OversizedPeriod(i64),

    /// A retune-range bound is outside 0-127.
    #[error("retune range bound {0} is outside the MIDI range")]
    RetuneRangeOutOfRange(i64),

    /// The middle note is outside 0-127.
    #[error("middle note {0} is outside the MIDI range")]
    MiddleNoteOutOfRange(i64),

    /// The reference note is outside 0-127.
    #[error("reference note {0} is outside the MIDI range")]
    ReferenceNoteOutOfRange(i64),

    /// The reference frequency is zero, negative, or non-finite.
    #[error("reference frequency must be positive")]
    NonPositiveReferenceFreq,

    /// The formal octave degree does not name a listed scale note.
    #[error("formal octave degree {0} is outside the scale")]
    FormalOctaveOutOfRange(i64),

    /// A mapping entry is neither `x` nor a non-negative integer.
    #[error("line {line}: mapping entry must be a scale degree or 'x'")]
    BadMappingEntry {
        /// 1-based source line.
        line: usize,
    },

    /// A mapping entry names a degree past the end of the scale.
    #[error("mapping entry {degree} exceeds the scale length")]
    DegreeOutOfRange {
        /// Offending degree value.
        degree: usize,
    },

    /// More explicit mapping entries than the declared period.
    #[error("mapping lists more entries than its declared period")]
    TooManyMappingEntries,
}

/// Convert a cents offset to a frequency ratio (1200 cents = one doubling).
pub fn cents_to_ratio(cents: f64) -> f64 {
    (cents * std::f64::consts::LN_2 / 1200.0).exp()
}

/// Strip a trailing carriage return, leading whitespace, and `!` comments
/// from one source line. Returns `None` for lines that are entirely
/// comment; the remaining text may still be empty.
pub(crate) fn significant_text(raw: &str) -> Option<&str> {
    let line = raw.strip_suffix('\r').unwrap_or(raw).trim_start();
    if line.starts_with('!') {
        return None;
    }
    Some(match line.find('!') {
        Some(comment) => &line[..comment],
        None => line,
    })
}

/// Split the leading numeric token (optional sign, digits, at most one
/// decimal point when `allow_dot`) from the rest of the line. Trailing
/// garbage after the token is the caller's business; a line with no leading
/// number at all yields `None`.
pub(crate) fn leading_number(text: &str, allow_dot: bool) -> Option<(&str, &str)> {
    let mut end = 0;
    let mut saw_digit = false;
    let mut saw_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '+' | '-' if i == 0 => end = i + 1,
            '0'..='9' => {
                saw_digit = true;
                end = i + 1;
            }
            '.' if allow_dot && !saw_dot => {
                saw_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !saw_digit {
        return None;
    }
    Some((&text[..end], &text[end..]))
}
