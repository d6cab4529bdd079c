//! Byte containers: the blob substrate and its text and name refinements.
//!
//! A [`Blob`] is a growable contiguous byte buffer. A [`Text`] is a blob
//! holding arbitrary bytes that render as text. A [`Name`] is a text whose
//! bytes obey the naming rule, compared through its normalized form:
//! lowercase, underscores stripped.
use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};

/// A growable byte sequence with append and narrowing operations.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    pub fn new() -> Self {
        Blob { bytes: Vec::new() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Blob {
            bytes: bytes.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Narrow the blob to the given byte sub-range in place.
    ///
    /// The range is clamped to the current length, so `range(0, len)` is a
    /// no-op.
    pub fn range(&mut self, start: usize, length: usize) {
        let start = start.min(self.bytes.len());
        let end = (start + length).min(self.bytes.len());

        self.bytes.truncate(end);
        self.bytes.drain(..start);
    }

    /// Lexicographic comparison over bytes.
    pub fn compare(&self, other: &Blob) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Ord for Blob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Blob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Blob {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "$")?;

        for byte in &self.bytes {
            write!(f, "{byte:02X}")?;
        }

        write!(f, "$")
    }
}

/// A blob of arbitrary bytes that renders as text.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Text {
    blob: Blob,
}

impl Text {
    pub fn new() -> Self {
        Text { blob: Blob::new() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Text {
            blob: Blob::from_bytes(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.blob.as_bytes()
    }

    pub fn clear(&mut self) {
        self.blob.clear();
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.blob.push(byte);
    }

    pub fn push_char(&mut self, character: char) {
        let mut buffer = [0u8; 4];

        self.blob
            .append(character.encode_utf8(&mut buffer).as_bytes());
    }

    pub fn append(&mut self, data: &[u8]) {
        self.blob.append(data);
    }

    /// Drop the last `count` bytes.
    pub fn truncate_bytes(&mut self, count: usize) {
        let length = self.blob.len().saturating_sub(count);

        self.blob.range(0, length);
    }

    /// The number of Unicode scalars, counting each invalid byte as one.
    pub fn char_count(&self) -> usize {
        String::from_utf8_lossy(self.as_bytes()).chars().count()
    }

    pub fn first_char(&self) -> Option<char> {
        String::from_utf8_lossy(self.as_bytes()).chars().next()
    }

    pub fn to_string_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text::from_bytes(text.as_bytes())
    }
}

impl From<&[u8]> for Text {
    fn from(bytes: &[u8]) -> Self {
        Text::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for Text {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

/// A text whose bytes satisfy the naming rule, compared and hashed through
/// its normalized form.
///
/// Valid spellings are non-empty and fall in one of three classes:
/// all-punctuation (operator names), alphabetic-starting with an
/// alphanumeric-or-underscore tail (no `__`, no trailing `_`), or a single
/// syntactic marker (`\n`, `\t` or backspace).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Name {
    text: Text,
}

impl Name {
    pub fn new<T: AsRef<str>>(spelling: T) -> Self {
        let spelling = spelling.as_ref();

        debug_assert!(
            Name::is_valid(spelling),
            "invalid name spelling {spelling:?}"
        );

        Name {
            text: Text::from(spelling),
        }
    }

    /// The `NEWLINE` syntactic marker.
    pub fn newline() -> Self {
        Name::new("\n")
    }

    /// The `INDENT` syntactic marker.
    pub fn indent() -> Self {
        Name::new("\t")
    }

    /// The `UNINDENT` syntactic marker.
    pub fn unindent() -> Self {
        Name::new("\u{8}")
    }

    /// Whether a spelling satisfies the name validity rule.
    pub fn is_valid(spelling: &str) -> bool {
        let mut characters = spelling.chars();
        let first = match characters.next() {
            Some(first) => first,
            None => return false,
        };

        if matches!(first, '\n' | '\t' | '\u{8}') {
            return characters.next().is_none();
        }

        if first.is_alphabetic() {
            let mut previous = first;

            for character in characters {
                if character == '_' {
                    if previous == '_' {
                        return false;
                    }
                } else if !character.is_alphanumeric() {
                    return false;
                }

                previous = character;
            }

            previous != '_'
        } else {
            spelling
                .chars()
                .all(|character| !character.is_alphanumeric() && !character.is_whitespace())
        }
    }

    /// The spelling as written in the source. A name's bytes are valid
    /// UTF-8 by the construction rule.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.text.as_bytes()).unwrap_or("")
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// The underlying text.
    pub fn as_text(&self) -> &Text {
        &self.text
    }

    /// The canonical form: every `_` stripped, ASCII letters lowercased.
    pub fn normalized(&self) -> SmartString<LazyCompact> {
        Name::normalize(self.as_str())
    }

    pub fn normalize(spelling: &str) -> SmartString<LazyCompact> {
        spelling
            .chars()
            .filter(|&character| character != '_')
            .map(|character| character.to_ascii_lowercase())
            .collect()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Name {}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl From<&str> for Name {
    fn from(spelling: &str) -> Self {
        Name::new(spelling)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_is_associative() {
        let mut once = Blob::new();
        let mut twice = Blob::new();

        once.append(b"alphabeta");
        twice.append(b"alpha");
        twice.append(b"beta");

        assert_eq!(once, twice);
    }

    #[test]
    fn full_range_is_a_no_op() {
        let mut blob = Blob::from_bytes(b"hello");

        blob.range(0, 5);

        assert_eq!(blob.as_bytes(), b"hello");
    }

    #[test]
    fn range_narrows_in_place() {
        let mut blob = Blob::from_bytes(b"hello world");

        blob.range(6, 5);

        assert_eq!(blob.as_bytes(), b"world");
        assert_eq!(blob.len(), 5);
    }

    #[test]
    fn compare_is_lexicographic() {
        let left = Blob::from_bytes(b"abc");
        let right = Blob::from_bytes(b"abd");

        assert_eq!(left.compare(&right), Ordering::Less);
        assert_eq!(left.compare(&left), Ordering::Equal);
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalized = Name::normalize("Hello_World");

        assert_eq!(normalized, "helloworld");
        assert_eq!(Name::normalize(&normalized), normalized);
    }

    #[test]
    fn names_compare_normalized() {
        assert_eq!(Name::new("Hello_World"), Name::new("HELLOWORLD"));
        assert_ne!(Name::new("hello"), Name::new("world"));
    }

    #[test]
    fn names_are_text_backed() {
        let name = Name::new("foo_bar");

        assert_eq!(name.as_text().as_bytes(), b"foo_bar");
        assert_eq!(name.as_str(), "foo_bar");
    }

    #[test]
    fn validity_classes() {
        assert!(Name::is_valid("foo"));
        assert!(Name::is_valid("foo_bar2"));
        assert!(Name::is_valid("+"));
        assert!(Name::is_valid("<="));
        assert!(Name::is_valid("\n"));
        assert!(!Name::is_valid(""));
        assert!(!Name::is_valid("foo__bar"));
        assert!(!Name::is_valid("foo_"));
        assert!(!Name::is_valid("+a"));
    }
}
