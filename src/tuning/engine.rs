//! Frequency derivation: combines the scale and keyboard mapping with an
//! absolute-pitch anchor, memoizes per-note results, and owns modulation.

use std::path::Path;

use log::{debug, warn};

use super::scale::Scale;
use super::TuningError;
use crate::MIDI_NOTE_COUNT;

/// The tuning engine.
///
/// Owns a [`Scale`] (which owns its keyboard mapping) plus the implicit
/// fundamental frequency that pins the whole system to absolute pitch. The
/// frequency of a note is
///
/// ```text
/// degree_ratio(note) * octave_ratio ^ octave(note) * fundamental
/// ```
///
/// where `octave_ratio` is the scale note named by the mapping's formal
/// octave degree. Results are cached per MIDI note and the cache is
/// invalidated in full whenever the scale, the mapping, or the anchor
/// changes.
#[derive(Clone, Debug)]
pub struct Tuning {
    scale: Scale,
    fundamental: f64,
    cache: [Option<f64>; MIDI_NOTE_COUNT],
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::new()
    }
}

impl Tuning {
    /// An engine with no scale loaded. [`frequency_for_note`](Self::frequency_for_note)
    /// yields nothing until a `.scl` file is loaded.
    pub fn new() -> Self {
        Tuning {
            scale: Scale::new(),
            fundamental: 0.0,
            cache: [None; MIDI_NOTE_COUNT],
        }
    }

    /// The current scale and its keyboard mapping.
    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Whether a scale has been loaded.
    pub fn has_scale(&self) -> bool {
        self.scale.is_loaded()
    }

    /// Ratio applied once per full traversal of the mapping period.
    pub fn octave_ratio(&self) -> f64 {
        self.scale
            .note_ratio(self.scale.keyboard_map().formal_octave_degree())
    }

    /// Load a `.scl` file from disk; see [`Scale::load_scl_file`].
    pub fn load_scl_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        self.scale.load_scl_file(path)?;
        self.rebuild();
        Ok(())
    }

    /// Load a `.scl` source from memory; see [`Scale::load_scl_str`].
    pub fn load_scl_str(&mut self, text: &str) -> Result<(), TuningError> {
        self.scale.load_scl_str(text)?;
        self.rebuild();
        Ok(())
    }

    /// Load a `.kbm` file from disk; see [`Scale::load_kbm_file`].
    pub fn load_kbm_file(&mut self, path: impl AsRef<Path>) -> Result<(), TuningError> {
        self.scale.load_kbm_file(path)?;
        self.rebuild();
        Ok(())
    }

    /// Load a `.kbm` source from memory; see [`Scale::load_kbm_str`].
    pub fn load_kbm_str(&mut self, text: &str) -> Result<(), TuningError> {
        self.scale.load_kbm_str(text)?;
        self.rebuild();
        Ok(())
    }

    /// Playback frequency in Hz for a MIDI note, or `None` when no scale
    /// is loaded or the key is unmapped (silent).
    ///
    /// Panics on note numbers past 127; the MIDI range is a caller
    /// precondition, not a recoverable error.
    pub fn frequency_for_note(&mut self, note: u8) -> Option<f64> {
        assert!((note as usize) < MIDI_NOTE_COUNT, "MIDI note out of range");
        if !self.has_scale() {
            return None;
        }
        if let Some(freq) = self.cache[note as usize] {
            return Some(freq);
        }

        let map = self.scale.keyboard_map();
        let degree = map.scale_degree(note as i32)?;
        let octave = map.octave(note as i32);
        let freq =
            self.scale.degree_ratio(degree) * self.octave_ratio().powi(octave) * self.fundamental;
        self.cache[note as usize] = Some(freq);
        Some(freq)
    }

    /// Re-anchor the tuning so the key pattern that surrounded `center`
    /// surrounds `pivot` instead, while the pivot keeps the absolute
    /// frequency it had before the call.
    ///
    /// Implemented as a shift of the mapping anchor by `pivot - center`
    /// (re-wrapped toward the MIDI range by whole periods, which is
    /// frequency-neutral) followed by recomputing the fundamental from the
    /// pivot's pre-modulation frequency. A no-op when `center == pivot`,
    /// when no scale is loaded, or when either note is unmapped.
    pub fn modulate(&mut self, center: u8, pivot: u8) {
        if center == pivot || !self.has_scale() {
            return;
        }
        if self.scale.keyboard_map().scale_degree(center as i32).is_none() {
            warn!("modulation center {center} is unmapped, ignoring");
            return;
        }
        let Some(pivot_freq) = self.frequency_for_note(pivot) else {
            warn!("modulation pivot {pivot} is unmapped, ignoring");
            return;
        };

        let shift = pivot as i32 - center as i32;
        let map = self.scale.keyboard_map_mut();
        let period = map.period() as i32;
        let mut middle = map.middle_note() + shift;
        while middle < 0 {
            middle += period;
        }
        while middle > 127 && middle - period >= 0 {
            middle -= period;
        }
        map.set_middle_note(middle);
        self.cache = [None; MIDI_NOTE_COUNT];

        // The pivot now sits where the center used to, so its degree is the
        // center's old degree; solve for the fundamental that keeps its
        // frequency in place.
        let map = self.scale.keyboard_map();
        let degree = map
            .scale_degree(pivot as i32)
            .expect("pivot degree equals the center's mapped degree");
        let octave = map.octave(pivot as i32);
        self.fundamental =
            pivot_freq / (self.scale.degree_ratio(degree) * self.octave_ratio().powi(octave));
        debug!("modulated {center} -> {pivot}, pivot held at {pivot_freq:.3} Hz");
    }

    /// Drop all memoized frequencies and re-derive the fundamental from the
    /// mapping's reference pair. Runs after every successful load.
    fn rebuild(&mut self) {
        self.cache = [None; MIDI_NOTE_COUNT];
        let map = self.scale.keyboard_map();
        let reference = map.reference_note() as i32;
        // An unmapped reference key anchors on the unison ratio.
        let ratio = match map.scale_degree(reference) {
            Some(degree) => self.scale.degree_ratio(degree),
            None => 1.0,
        };
        let octave = map.octave(reference);
        self.fundamental = map.reference_freq() / ratio * self.octave_ratio().powi(-octave);
    }
}
