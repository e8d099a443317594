//! Scale (`.scl`) model and parser.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::keyboard_map::KeyboardMap;
use super::{cents_to_ratio, leading_number, significant_text, TuningError};

/// A parsed Scala scale: an ordered sequence of frequency ratios relative
/// to the implicit 1/1, plus the keyboard mapping that assigns MIDI keys to
/// scale degrees.
///
/// Every load replaces the whole value on success and leaves it untouched
/// on failure, so a `Scale` can be snapshotted with a plain `clone` and
/// restored by assignment (which is all a host undo layer needs).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    description: String,
    notes: Vec<f64>,
    keyboard_map: KeyboardMap,
}

impl Scale {
    /// An empty scale: no notes, no usable mapping.
    pub fn new() -> Self {
        Scale::default()
    }

    /// Free-text label from line 1 of the scale file.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The listed frequency ratios, in scale-degree order. The implicit
    /// 1/1 is not stored; see [`degree_ratio`](Self::degree_ratio).
    pub fn notes(&self) -> &[f64] {
        &self.notes
    }

    /// Number of stored notes.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Whether a scale file has been loaded.
    pub fn is_loaded(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Ratio of the `index`-th listed note. Panics on out-of-range
    /// indices; parse-time validation keeps every stored degree in range.
    pub fn note_ratio(&self, index: usize) -> f64 {
        self.notes[index]
    }

    /// Ratio for a mapping degree: degree 0 is the implicit unison, degree
    /// `k` is the `k`-th listed note.
    pub fn degree_ratio(&self, degree: usize) -> f64 {
        if degree == 0 {
            1.0
        } else {
            self.notes[degree - 1]
        }
    }

    /// The keyboard mapping attached to this scale.
    pub fn keyboard_map(&self) -> &KeyboardMap {
        &self.keyboard_map
    }

    pub(crate) fn keyboard_map_mut(&mut self) -> &mut KeyboardMap {
        &mut self.keyboard_map
    }

    /// Load a `.scl` file from disk. See [`load_scl_str`](Self::load_scl_str).
    pub fn load_scl_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        let text = std::fs::read_to_string(path)?;
        self.load_scl_str(&text)
    }

    /// Load a `.scl` source from memory.
    ///
    /// On success the previous notes and description are replaced wholesale
    /// and the keyboard mapping is reset to the linear default for the new
    /// note count. On failure nothing changes.
    pub fn load_scl_str(&mut self, text: &str) -> Result<(), TuningError> {
        let (description, notes) = parse_scl(text)?;
        debug!("loaded scale {:?} with {} notes", description, notes.len());
        self.keyboard_map = KeyboardMap::linear(notes.len());
        self.description = description;
        self.notes = notes;
        Ok(())
    }

    /// Load a `.kbm` file from disk. See [`load_kbm_str`](Self::load_kbm_str).
    pub fn load_kbm_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        let text = std::fs::read_to_string(path)?;
        self.load_kbm_str(&text)
    }

    /// Load a `.kbm` source from memory, replacing the attached mapping.
    /// Requires a loaded scale, since mapping entries are validated against
    /// the scale's note count. On failure the previous mapping survives
    /// untouched.
    pub fn load_kbm_str(&mut self, text: &str) -> Result<(), TuningError> {
        if !self.is_loaded() {
            return Err(TuningError::NoScaleLoaded);
        }
        self.keyboard_map = KeyboardMap::parse(text, self.notes.len())?;
        Ok(())
    }
}

/// Parse a `.scl` source into (description, ratios).
fn parse_scl(text: &str) -> Result<(String, Vec<f64>), TuningError> {
    enum State {
        Description,
        Count,
        Notes,
    }

    let mut state = State::Description;
    let mut description = String::new();
    let mut declared = 0usize;
    let mut notes = Vec::new();

    for (index, raw) in text.split('\n').enumerate() {
        let lineno = index + 1;
        let Some(line) = significant_text(raw) else {
            continue;
        };

        match state {
            // The first non-comment line is the description even when
            // empty; blank lines are only skipped after it.
            State::Description => {
                description = line.trim_end().to_string();
                state = State::Count;
            }
            State::Count if line.trim().is_empty() => {}
            State::Count => {
                let (token, _) =
                    leading_number(line, false).ok_or(TuningError::ExpectedNumber { line: lineno })?;
                let count: i64 = token
                    .parse()
                    .map_err(|_| TuningError::ExpectedNumber { line: lineno })?;
                if count < 0 {
                    return Err(TuningError::NegativeNoteCount);
                }
                declared = count as usize;
                state = State::Notes;
            }
            State::Notes if line.trim().is_empty() => {}
            State::Notes => notes.push(parse_note_line(line, lineno)?),
        }
    }

    if !matches!(state, State::Notes) {
        return Err(TuningError::IncompleteScale);
    }
    if notes.len() != declared {
        return Err(TuningError::NoteCountMismatch {
            declared,
            found: notes.len(),
        });
    }
    if declared == 0 {
        // Degenerate unison scale: every key plays the reference pitch.
        notes.push(1.0);
    }
    Ok((description, notes))
}

/// Evaluate one note line on its leading numeric token: a token containing
/// a decimal point is a cents value, a token followed by `/` is an integer
/// ratio, and a bare number is the ratio itself. Trailing garbage after
/// the parsed number is ignored.
fn parse_note_line(line: &str, lineno: usize) -> Result<f64, TuningError> {
    let expected = || TuningError::ExpectedNumber { line: lineno };
    let Some((token, rest)) = leading_number(line.trim_start(), true) else {
        return Err(expected());
    };

    let ratio = if token.contains('.') {
        let cents: f64 = token.parse().map_err(|_| expected())?;
        cents_to_ratio(cents)
    } else if let Some(denominator_text) = rest.trim_start().strip_prefix('/') {
        let numerator: f64 = token.parse().map_err(|_| expected())?;
        let (den_token, _) =
            leading_number(denominator_text.trim_start(), false).ok_or_else(expected)?;
        let denominator: f64 = den_token.parse().map_err(|_| expected())?;
        numerator / denominator
    } else {
        token.parse().map_err(|_| expected())?
    };

    if !(ratio > 0.0 && ratio.is_finite()) {
        return Err(TuningError::NonPositiveRatio { line: lineno });
    }
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_line(line: &str) -> Result<f64, TuningError> {
        parse_note_line(line, 1)
    }

    #[test]
    fn cents_ratio_and_bare_forms() {
        assert!((parse_line("1200.").unwrap() - 2.0).abs() < 1e-9);
        assert!((parse_line("3/2").unwrap() - 1.5).abs() < 1e-12);
        assert!((parse_line("2").unwrap() - 2.0).abs() < 1e-12);
        // "2." has a decimal point, so it is two cents, not a ratio of 2.
        assert!((parse_line("2.").unwrap() - 1.001156).abs() < 1e-6);
    }

    #[test]
    fn trailing_garbage_is_ignored() {
        assert!((parse_line("1200.0xcj lkdjfx").unwrap() - 2.0).abs() < 1e-9);
        // Integer denominator token; the fractional tail is garbage.
        assert!((parse_line("4/1.999").unwrap() - 4.0).abs() < 1e-12);
        assert!((parse_line("701.955 comment").unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn bad_lines_are_rejected() {
        assert!(matches!(
            parse_line("abc"),
            Err(TuningError::ExpectedNumber { .. })
        ));
        assert!(matches!(
            parse_line("-1/2"),
            Err(TuningError::NonPositiveRatio { .. })
        ));
        assert!(matches!(
            parse_line("1/0"),
            Err(TuningError::NonPositiveRatio { .. })
        ));
    }
}
