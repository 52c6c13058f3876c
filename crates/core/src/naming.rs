//! Identity-key normalization for display names.
//!
//! Two spellings of the same person ("Ayşe Yılmaz", "AYSE  YILMAZ",
//! "ayse.yilmaz") must map to one key. The key is built by:
//!
//! 1. replacing diacritic letters via [`DIACRITIC_MAP`],
//! 2. lowercasing,
//! 3. dropping every character outside `[a-z0-9]`.

/// Fixed substitution table applied before case folding.
///
/// Both cases are listed so that `İ` never goes through Unicode lowercasing
/// (which would yield `i` plus a combining dot).
pub const DIACRITIC_MAP: &[(char, char)] = &[
    ('ç', 'c'),
    ('ğ', 'g'),
    ('ı', 'i'),
    ('ö', 'o'),
    ('ş', 's'),
    ('ü', 'u'),
    ('â', 'a'),
    ('î', 'i'),
    ('û', 'u'),
    ('Ç', 'c'),
    ('Ğ', 'g'),
    ('İ', 'i'),
    ('Ö', 'o'),
    ('Ş', 's'),
    ('Ü', 'u'),
    ('Â', 'a'),
    ('Î', 'i'),
    ('Û', 'u'),
];

fn substitute(c: char) -> Option<char> {
    DIACRITIC_MAP
        .iter()
        .find_map(|&(from, to)| (from == c).then_some(to))
}

/// Normalize a display name into its identity key.
///
/// Returns an empty string when nothing alphanumeric remains.
///
/// ```
/// use ares_core::naming::normalize_name;
///
/// assert_eq!(normalize_name("Ayşe Yılmaz"), "ayseyilmaz");
/// assert_eq!(normalize_name("  İSMAİL  ÖZ-Çelik "), "ismailozcelik");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut out = fold_case(name);
    out.retain(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    out
}

/// Steps 1 and 2 of the key: diacritics replaced and lowercased, every
/// other character kept. Used for case-insensitive label matching.
pub fn fold_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match substitute(c) {
            Some(mapped) => out.push(mapped),
            None => out.extend(c.to_lowercase()),
        }
    }
    out
}
