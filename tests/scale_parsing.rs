//! `.scl` parsing: grammar, edge cases, and the atomic-rollback contract.

use micromod::{Scale, TuningError};

mod common;
use common::{assert_close, TWELVE_TET};

#[test]
fn unreadable_file_fails_without_touching_state() {
    let mut scale = Scale::new();
    let before = scale.clone();
    assert!(matches!(
        scale.load_scl_file("/no/such/file.scl"),
        Err(TuningError::Io(_))
    ));
    assert_eq!(scale, before);
}

#[test]
fn description_is_the_first_significant_line() {
    let mut scale = Scale::new();
    scale.load_scl_str("Description\n0\n").unwrap();
    assert_eq!(scale.description(), "Description");
}

#[test]
fn zero_note_scale_becomes_degenerate_unison() {
    let mut scale = Scale::new();
    scale.load_scl_str("0 Note Scale\n0\n").unwrap();
    assert_eq!(scale.notes(), &[1.0][..]);
}

#[test]
fn note_count_must_match_listed_notes() {
    let mut scale = Scale::new();
    scale.load_scl_str(TWELVE_TET).unwrap();
    let before = scale.clone();

    let err = scale.load_scl_str("Wrong count\n1\n1.2\n1.3\n");
    assert!(matches!(
        err,
        Err(TuningError::NoteCountMismatch {
            declared: 1,
            found: 2
        })
    ));
    assert_eq!(scale, before);
}

#[test]
fn declared_count_is_kept() {
    let mut scale = Scale::new();
    scale.load_scl_str(TWELVE_TET).unwrap();
    assert_eq!(scale.note_count(), 12);
}

#[test]
fn negative_note_count_is_rejected() {
    let mut scale = Scale::new();
    assert!(matches!(
        scale.load_scl_str("negative\n-1\n"),
        Err(TuningError::NegativeNoteCount)
    ));
}

#[test]
fn negative_ratio_rolls_back() {
    let mut scale = Scale::new();
    scale.load_scl_str(TWELVE_TET).unwrap();
    let before = scale.clone();

    assert!(matches!(
        scale.load_scl_str("negative ratio\n3\n-1/2\n1.3\n3\n"),
        Err(TuningError::NonPositiveRatio { .. })
    ));
    assert_eq!(scale, before);
}

#[test]
fn ratio_lines_parse_as_fractions() {
    let mut scale = Scale::new();
    scale
        .load_scl_str("ratios\n4\n1/2\n2/3\n3/7\n19/11\n")
        .unwrap();
    assert_close(scale.note_ratio(0), 1.0 / 2.0);
    assert_close(scale.note_ratio(1), 2.0 / 3.0);
    assert_close(scale.note_ratio(2), 3.0 / 7.0);
    assert_close(scale.note_ratio(3), 19.0 / 11.0);
}

#[test]
fn cents_lines_convert_through_the_exponential() {
    let mut scale = Scale::new();
    scale
        .load_scl_str("cents\n4\n1200.\n1200.0\n2400.\n701.955\n")
        .unwrap();
    assert_close(scale.note_ratio(0), 2.0);
    assert_close(scale.note_ratio(1), 2.0);
    assert_close(scale.note_ratio(2), 4.0);
    assert_close(scale.note_ratio(3), 1.5);
}

#[test]
fn bare_integer_is_a_ratio_but_trailing_dot_means_cents() {
    let mut scale = Scale::new();
    scale.load_scl_str("integer vs cents\n2\n2\n2.\n").unwrap();
    assert_close(scale.note_ratio(0), 2.0);
    // "2." is two cents.
    assert!((scale.note_ratio(1) - 1.001156).abs() < 1e-5);
}

#[test]
fn comment_lines_are_ignored_everywhere() {
    let source = "!comment\n!comment\n    !comment\nTest scale\n!comment\n4\n!comment\n1200.\n!comment\n!comment\n1200.0\n2400.0\n!comment\n701.955\n!comment\n";
    let mut scale = Scale::new();
    scale.load_scl_str(source).unwrap();
    assert_eq!(scale.description(), "Test scale");
    assert_eq!(scale.note_count(), 4);
    assert_close(scale.note_ratio(0), 2.0);
    assert_close(scale.note_ratio(3), 1.5);
}

#[test]
fn inline_comments_are_stripped_before_parsing() {
    let source = "Inline comments scale!comment\n4!comment\n1200.!comment\n1200.0              !comment\n4!/2\n701.955 !comment\n";
    let mut scale = Scale::new();
    scale.load_scl_str(source).unwrap();
    assert_eq!(scale.description(), "Inline comments scale");
    assert_close(scale.note_ratio(0), 2.0);
    assert_close(scale.note_ratio(1), 2.0);
    // "4!/2": the comment eats the slash, leaving a bare ratio of 4.
    assert_close(scale.note_ratio(2), 4.0);
    assert_close(scale.note_ratio(3), 1.5);
}

#[test]
fn trailing_garbage_after_the_number_is_ignored() {
    let source = "Garbage scale\n4\n1200.\n1200.0xcj lkdjfx zlckdsf\n4/1.999\n701.955 xldkfj\n";
    let mut scale = Scale::new();
    scale.load_scl_str(source).unwrap();
    assert_close(scale.note_ratio(0), 2.0);
    assert_close(scale.note_ratio(1), 2.0);
    // Integer denominator token; ".999" is garbage, not a decimal.
    assert_close(scale.note_ratio(2), 4.0);
    assert_close(scale.note_ratio(3), 1.5);
}

#[test]
fn crlf_sources_parse_like_lf() {
    let source = "crlf scale\r\n2\r\n3/2\r\n2/1\r\n";
    let mut scale = Scale::new();
    scale.load_scl_str(source).unwrap();
    assert_close(scale.note_ratio(0), 1.5);
    assert_close(scale.note_ratio(1), 2.0);
}

#[test]
fn successful_reload_resets_the_keyboard_map() {
    let mut scale = Scale::new();
    scale.load_scl_str(TWELVE_TET).unwrap();
    scale
        .load_kbm_str(&common::kbm_string(6, 0, 127, 48, 69, 440.0, 12, &["1"]))
        .unwrap();
    assert_eq!(scale.keyboard_map().middle_note(), 48);

    scale.load_scl_str("five\n1\n2/1\n").unwrap();
    // Back to the linear default, sized to the new scale.
    assert_eq!(scale.keyboard_map().middle_note(), 60);
    assert_eq!(scale.keyboard_map().period(), 1);
    assert_eq!(scale.keyboard_map().mapping(), &[Some(0)][..]);
}
