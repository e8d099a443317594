#![allow(dead_code)]

/// Relative-tolerance comparison for frequency math.
pub fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-6 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() < tolerance,
        "{actual} differs from expected {expected}"
    );
}

/// The standard 12-tone equal temperament scale.
pub const TWELVE_TET: &str = "! 12-TET.scl
12 tone equal temperament
12
100.0
200.0
300.0
400.0
500.0
600.0
700.0
800.0
900.0
1000.0
1100.0
1200.0
";

/// A deliberately uneven five-note just scale, useful when a test must
/// notice that different degrees have different step sizes.
pub const FIVE_NOTE_JI: &str = "five-note just scale
5
9/8
5/4
3/2
5/3
2/1
";

/// Build a `.kbm` source from its seven metadata values plus entries.
pub fn kbm_string(
    period: i64,
    range_low: i64,
    range_high: i64,
    middle: i64,
    reference: i64,
    reference_freq: f64,
    formal_octave_degree: i64,
    entries: &[&str],
) -> String {
    let mut text = format!(
        "{period}\n{range_low}\n{range_high}\n{middle}\n{reference}\n{reference_freq}\n{formal_octave_degree}\n"
    );
    for entry in entries {
        text.push_str(entry);
        text.push('\n');
    }
    text
}

/// 12-TET frequency of a MIDI note at concert pitch.
pub fn equal_temperament_freq(note: u8) -> f64 {
    440.0 * 2f64.powf((note as f64 - 69.0) / 12.0)
}
