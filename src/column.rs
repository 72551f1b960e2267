//! Conversion between 1-based column indices and alphabetic column labels

/// Parse a column label (`A`, `Z`, `AA`, ...) into its 1-based index.
///
/// Letters are read case-insensitively until the first non-letter; whatever
/// was read up to that point is the result. An empty or non-alphabetic
/// prefix yields 0, which callers treat as an invalid column.
pub fn label_to_index(label: &str) -> u32 {
    let mut index: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        index = index.saturating_mul(26).saturating_add(digit);
    }
    index
}

/// Render a 1-based column index as its alphabetic label. Index 0 yields "".
pub fn index_to_label(index: u32) -> String {
    let mut n = index;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Largest column index a grid sheet can hold (`ZZZ`)
pub const MAX_COLUMN: u32 = 18_278;

/// Index of a label that can address a real column: `None` when the label
/// is empty, non-alphabetic, or lies past `MAX_COLUMN`
pub fn column_index(label: &str) -> Option<u32> {
    let index = label_to_index(label);
    (1..=MAX_COLUMN).contains(&index).then_some(index)
}

/// Uppercase and trim a label read from a metadata cell
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
