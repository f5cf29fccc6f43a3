//! Fuzzy release-name comparison.
//!
//! Debrid services and library managers disagree on separators and case
//! (`The Album (2020) [FLAC]` vs `the_album_2020_flac`), so names are compared
//! after dropping everything that is not a letter or a digit.

/// Lowercase `name` and keep only alphanumeric characters.
pub fn normalize(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Whether two release names refer to the same thing.
///
/// Names without any alphanumeric characters never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    !a.is_empty() && a == normalize(b)
}
