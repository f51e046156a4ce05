//! Pure normalizers turning the raw database columns into display strings.

use crate::error::{ContextError, ErrorKind};

/// Difficulty labels, keyed by the rounded difficulty score.
pub const DIFFICULTY_LABELS: [(i64, &str); 5] = [
    (1, "Beginner"),
    (2, "Beginner+"),
    (3, "Intermediate"),
    (4, "Advanced"),
    (5, "Guru"),
];

/// Where the middle marker of the wrap starts, keyed by the drop-height offset code.
/// The keys are not contiguous: `6` and `7` are the half-step offsets added later on.
pub const DROP_HEIGHT_OFFSETS: [(i64, &str); 9] = [
    (-1, "Follow tutorial for MM start position"),
    (0, "MM starts centred"),
    (6, "MM starts 0.5 DH off centre"),
    (1, "MM starts 1 DH off centre"),
    (7, "MM starts 1.5 DH off centre"),
    (2, "MM starts 2 DH off centre"),
    (3, "MM starts centred on your chest"),
    (4, "MM starts centred on your back"),
    (5, "MM starts under your armpit"),
];

/// Formats the garment-size offset relative to the base size, keeping the sign when negative.
pub fn format_size(size: i64) -> String {
    match size {
        0 => "BASE".to_string(),
        size if size > 0 => format!("BASE + {size}"),
        size => format!("BASE {size}"),
    }
}

/// Upper-cases the body position and appends the `CARRY` suffix.
pub fn format_position(position: &str) -> String {
    format!("{} CARRY", position.to_uppercase())
}

/// Rounds the difficulty to the nearest integer and looks its label up.
pub fn format_difficulty(difficulty: f64) -> Result<String, ContextError> {
    if !difficulty.is_finite() {
        return Err(ContextError::with_context(
            ErrorKind::Lookup,
            format!("Difficulty {difficulty} is not a number"),
        ));
    }
    let rounded = round_half_to_even(difficulty);
    let label = lookup(&DIFFICULTY_LABELS, rounded).ok_or_else(|| {
        ContextError::with_context(
            ErrorKind::Lookup,
            format!("Difficulty {difficulty} is outside of the known levels"),
        )
    })?;

    Ok(format!("Difficulty: {label}"))
}

/// Looks the drop-height offset description up.
pub fn format_drop_height_offset(code: i64) -> Result<String, ContextError> {
    lookup(&DROP_HEIGHT_OFFSETS, code)
        .map(str::to_string)
        .ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Lookup,
                format!("Drop-height offset code {code} is not a known position"),
            )
        })
}

fn lookup(table: &[(i64, &'static str)], key: i64) -> Option<&'static str> {
    table
        .iter()
        .find(|(table_key, _)| *table_key == key)
        .map(|(_, label)| *label)
}

/// Rounds to the nearest integer, ties going to the even neighbour (so `2.5` becomes `2`).
fn round_half_to_even(value: f64) -> i64 {
    let floor = value.floor();
    let difference = value - floor;
    let rounded = if difference > 0.5 {
        floor + 1.0
    } else if difference < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };

    rounded as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_keeps_sign_and_spacing() {
        assert_eq!(format_size(0), "BASE");
        assert_eq!(format_size(3), "BASE + 3");
        assert_eq!(format_size(-2), "BASE -2");
    }

    #[test]
    fn position_is_upper_cased_with_suffix() {
        assert_eq!(format_position("back"), "BACK CARRY");
        assert_eq!(format_position("Front"), "FRONT CARRY");
    }

    #[test]
    fn every_difficulty_level_has_a_label() {
        let expected = [
            "Difficulty: Beginner",
            "Difficulty: Beginner+",
            "Difficulty: Intermediate",
            "Difficulty: Advanced",
            "Difficulty: Guru",
        ];
        for (level, label) in (1..=5).zip(expected) {
            assert_eq!(format_difficulty(level as f64).unwrap(), label);
        }
    }

    #[test]
    fn difficulty_is_rounded_before_lookup() {
        assert_eq!(format_difficulty(3.4).unwrap(), "Difficulty: Intermediate");
        assert_eq!(format_difficulty(3.6).unwrap(), "Difficulty: Advanced");
        assert_eq!(format_difficulty(2.5).unwrap(), "Difficulty: Beginner+");
        assert_eq!(format_difficulty(0.6).unwrap(), "Difficulty: Beginner");
    }

    #[test]
    fn difficulty_outside_the_table_fails() {
        for difficulty in [0.0, 6.0, 5.6, -1.0, f64::NAN] {
            let error = format_difficulty(difficulty).unwrap_err();
            assert!(error.is_lookup(), "{difficulty} should be a lookup error");
        }
    }

    #[test]
    fn drop_height_offsets_cover_the_sparse_keys() {
        assert_eq!(
            format_drop_height_offset(-1).unwrap(),
            "Follow tutorial for MM start position"
        );
        assert_eq!(format_drop_height_offset(6).unwrap(), "MM starts 0.5 DH off centre");
        assert_eq!(format_drop_height_offset(7).unwrap(), "MM starts 1.5 DH off centre");
        assert_eq!(format_drop_height_offset(5).unwrap(), "MM starts under your armpit");
    }

    #[test]
    fn unknown_drop_height_offset_fails() {
        assert!(format_drop_height_offset(8).unwrap_err().is_lookup());
        assert!(format_drop_height_offset(-2).unwrap_err().is_lookup());
    }
}
