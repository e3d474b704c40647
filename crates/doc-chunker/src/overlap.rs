//! Overlap computation shared by the chunking strategies.
//!
//! Character-granularity strategies carry back a tail of the just-flushed
//! chunk; unit-granularity strategies apply the analogous rule at their
//! own boundaries via [`tail_units_within`].

/// Select the overlap tail carried from a flushed chunk into the next.
///
/// If the tail is shorter than `overlap` characters it is returned
/// unchanged. Otherwise the scan starts `overlap` characters from the end
/// and looks for the first sentence terminator (`.`, `!`, `?`) followed by
/// whitespace; everything after that boundary is returned. Without such a
/// boundary the last `overlap` characters are returned verbatim. Cuts
/// always land on char boundaries.
#[must_use]
pub fn overlap_tail(tail: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = tail.chars().count();
    if total <= overlap {
        return tail;
    }

    let start_byte = char_to_byte(tail, total - overlap);
    let window = &tail[start_byte..];

    let mut iter = window.char_indices().peekable();
    while let Some((_, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_idx, next_char)) = iter.peek() {
                if next_char.is_whitespace() {
                    return window[next_idx..].trim_start();
                }
            }
        }
    }

    window
}

/// Take trailing units whose cumulative character length stays within
/// `overlap`, preserving document order. Unit-granularity counterpart of
/// [`overlap_tail`].
#[must_use]
pub fn tail_units_within<'a>(units: &[&'a str], overlap: usize) -> Vec<&'a str> {
    if overlap == 0 {
        return Vec::new();
    }
    let mut budget = overlap;
    let mut selected: Vec<&str> = Vec::new();
    for unit in units.iter().rev() {
        let len = unit.chars().count();
        if len > budget {
            break;
        }
        budget -= len;
        selected.push(unit);
    }
    selected.reverse();
    selected
}

/// Byte offset of the char at position `pos` (or the text length when
/// `pos` is past the end)
fn char_to_byte(text: &str, pos: usize) -> usize {
    text.char_indices()
        .nth(pos)
        .map_or(text.len(), |(byte, _)| byte)
}
