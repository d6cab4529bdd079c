//! Source position registry.
//!
//! Every byte the scanner consumes is recorded here, so that a token only
//! needs to carry a single [`SrcPos`] scalar. The registry maps a position
//! back to its file, line and column, and keeps the bytes of each line so
//! diagnostics can show the offending source with a caret.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// A monotonically increasing position, global across all opened inputs.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct SrcPos(pub u32);

impl SrcPos {
    /// Position used for messages that have no source location.
    pub const NONE: SrcPos = SrcPos(u32::MAX);

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl Display for SrcPos {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location information resolved from a [`SrcPos`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PositionInfo<'map> {
    pub file: &'map str,
    /// 1-based line number within the file.
    pub line: u32,
    /// 0-based byte offset from the start of the line.
    pub column: u32,
    /// Global offset of the first byte of the line.
    pub line_start: u32,
    /// Length of the line in bytes, excluding the terminating newline.
    pub line_length: u32,
}

#[derive(Clone, Debug)]
struct SourceFile {
    name: String,
    start: u32,
}

/// Registry of every byte consumed from every opened input.
///
/// Positions never shrink: opening a new file continues from the position
/// where the previous one ended.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    bytes: Vec<u8>,
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    /// Register a new input starting at the current position.
    pub fn open_file<T: Into<String>>(&mut self, name: T) -> SrcPos {
        let start = self.bytes.len() as u32;

        self.files.push(SourceFile {
            name: name.into(),
            start,
        });

        if self.line_starts.last() != Some(&start) {
            self.line_starts.push(start);
        }

        SrcPos(start)
    }

    /// Record one consumed byte and advance the current position.
    pub fn step(&mut self, byte: u8) {
        self.bytes.push(byte);

        if byte == b'\n' {
            self.line_starts.push(self.bytes.len() as u32);
        }
    }

    /// The position of the next byte to be recorded.
    pub fn current(&self) -> SrcPos {
        SrcPos(self.bytes.len() as u32)
    }

    /// Resolve a position to its file, line and column.
    ///
    /// Returns `None` for positions past the recorded input or when no file
    /// was opened, including [`SrcPos::NONE`].
    pub fn info(&self, position: SrcPos) -> Option<PositionInfo<'_>> {
        let offset = position.0;

        if offset as usize > self.bytes.len() || self.files.is_empty() {
            return None;
        }

        let file_index = self.files.partition_point(|file| file.start <= offset) - 1;
        let file = &self.files[file_index];
        let line_index = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line_index];
        let first_line_of_file = self
            .line_starts
            .partition_point(|&start| start < file.start);
        let line_end = self
            .line_starts
            .get(line_index + 1)
            .copied()
            .unwrap_or(self.bytes.len() as u32);
        let line_length = if line_end > line_start && self.bytes[line_end as usize - 1] == b'\n' {
            line_end - line_start - 1
        } else {
            line_end - line_start
        };

        Some(PositionInfo {
            file: &file.name,
            line: (line_index - first_line_of_file) as u32 + 1,
            column: offset - line_start,
            line_start,
            line_length,
        })
    }

    /// The recorded bytes of the line described by `info`.
    pub fn line_bytes(&self, info: &PositionInfo) -> &[u8] {
        let start = info.line_start as usize;
        let end = start + info.line_length as usize;

        &self.bytes[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(name: &str, source: &str) -> SourceMap {
        let mut map = SourceMap::new();

        map.open_file(name);

        for byte in source.bytes() {
            map.step(byte);
        }

        map
    }

    #[test]
    fn positions_are_monotonic() {
        let mut map = SourceMap::new();

        assert_eq!(map.open_file("a"), SrcPos(0));

        map.step(b'x');
        map.step(b'\n');

        assert_eq!(map.open_file("b"), SrcPos(2));
        assert_eq!(map.current(), SrcPos(2));
    }

    #[test]
    fn info_resolves_lines_and_columns() {
        let map = map_of("test.reed", "ab\ncde\n");

        let info = map.info(SrcPos(0)).unwrap();
        assert_eq!((info.file, info.line, info.column), ("test.reed", 1, 0));
        assert_eq!(info.line_length, 2);

        let info = map.info(SrcPos(4)).unwrap();
        assert_eq!((info.line, info.column), (2, 1));
        assert_eq!(map.line_bytes(&info), b"cde");
    }

    #[test]
    fn info_past_the_input_is_none() {
        let map = map_of("test.reed", "ab");

        assert!(map.info(SrcPos(3)).is_none());
        assert!(map.info(SrcPos::NONE).is_none());
    }

    #[test]
    fn line_numbers_restart_per_file() {
        let mut map = map_of("first.reed", "one\ntwo\n");

        map.open_file("second.reed");

        for byte in b"three\n" {
            map.step(*byte);
        }

        let info = map.info(SrcPos(8)).unwrap();
        assert_eq!((info.file, info.line, info.column), ("second.reed", 1, 0));
        assert_eq!(map.line_bytes(&info), b"three");
    }
}
