//! A1-notation helpers for Sheets ranges.

use ares_core::types::RowIndex;

/// Quote a sheet title for use in a range (`'It''s'`).
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Column letters for a 1-based column index (1 → `A`, 27 → `AA`).
pub fn column_letter(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Single-cell anchor, e.g. `'MesaiLog'!C7`.
pub fn cell(title: &str, row: RowIndex, col: u32) -> String {
    format!("{}!{}{}", quote_title(title), column_letter(col), row)
}

/// Whole-row range, e.g. `'MesaiLog'!302:501`.
pub fn rows(title: &str, first: RowIndex, last: RowIndex) -> String {
    format!("{}!{}:{}", quote_title(title), first, last)
}

/// First row number of a range such as `'PersonelListesi'!A12:H12`.
pub fn first_row(range: &str) -> Option<RowIndex> {
    let (_, cells) = range.rsplit_once('!').unwrap_or(("", range));
    let start = cells.split(':').next()?;
    let digits: String = start.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
