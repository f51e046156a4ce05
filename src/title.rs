//! Splitting of the free-text long title into the base title and the finish phrase.

/// Known finish phrases. The first entry found anywhere in the title wins, regardless of where it
/// occurs, so the more specific phrases must stay ahead of the generic ones they contain.
/// Entries are matched case-insensitively and returned with the casing written here.
pub const FINISHES: [&str; 33] = [
    "tied tibetan",
    "knotless tibetan",
    "tied in front",
    "buleria",
    "CCCB",
    "tied under bum",
    "shoulder to shoulder with a ring",
    "shoulder to shoulder knotless",
    "shoulder to shoulder",
    "with a ring",
    "candy cane chest belt",
    "with a pond finish",
    "with a sweetheart chest pass",
    "tied at shoulder",
    "with a xena finish",
    "strangleproof",
    "with a lexi twist",
    "with spread passes",
    "knotless tibetan",
    "with a waist band and chest belt",
    "with a celtic knot",
    "with a lacuna finish",
    "with waist band and chest belt",
    "with 2 rings",
    "single pocket",
    "separate pockets",
    "with a Date night or Goddess Finish",
    "Armpit to Shoulder",
    "with a Rainer's Heart",
    "with a Bandeau Bikini Finish",
    "with a Ruckless Bikini Finish",
    "knotless",
    "sweetheart",
];

/// A long title split around its finish phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedTitle {
    /// The text preceding the finish phrase, casing untouched.
    pub title: String,
    /// The canonical finish phrase, or empty when none was recognised.
    pub finish: String,
}

/// Splits the raw title with the production finish list.
pub fn decompose(raw_title: &str) -> DecomposedTitle {
    decompose_with(raw_title, &FINISHES)
}

/// Splits the raw title on the first phrase of `finishes`, in list order, that it contains.
///
/// Text following the matched phrase is dropped.
pub fn decompose_with(raw_title: &str, finishes: &[&str]) -> DecomposedTitle {
    for finish in finishes {
        if let Some(index) = find_case_insensitive(raw_title, finish) {
            return DecomposedTitle {
                title: raw_title[..index].to_string(),
                finish: finish.to_string(),
            };
        }
    }

    DecomposedTitle {
        title: raw_title.to_string(),
        finish: String::new(),
    }
}

/// Returns the byte index in `haystack` where `needle` first occurs, ignoring case.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();

    haystack.char_indices().map(|(index, _)| index).find(|&index| {
        let mut candidate = haystack[index..].chars().flat_map(char::to_lowercase);
        needle
            .iter()
            .all(|expected| candidate.next() == Some(*expected))
    })
}
