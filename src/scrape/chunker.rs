//! Fixed-length chunking for model input windows.
//!
//! Boundaries are purely positional over characters, never word- or
//! tag-aware. Counting in `char`s instead of bytes keeps multi-byte text
//! from splitting inside a code point; concatenating the chunks still
//! reconstructs the input exactly.

/// Splits `text` into ordered chunks of at most `max_length` characters.
/// Every chunk except possibly the last has exactly `max_length` characters;
/// empty input yields no chunks.
pub fn split_content(text: &str, max_length: usize) -> Vec<String> {
    if max_length == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_length {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
