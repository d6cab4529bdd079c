//! The scanner state machine: bytes in, tokens out.
//!
//! [`Scanner::scan`] consumes a byte stream and returns one token per call.
//! The token's spelling and literal value travel on side channels, valid
//! until the next call. Block structure outside explicit parenthesis-like
//! blocks is encoded entirely by the `NEWLINE`/`INDENT`/`UNINDENT` stream:
//! every line break produces a `NEWLINE`, a deeper line adds an `INDENT`,
//! and each level closed by a shallower line produces one `UNINDENT` on a
//! subsequent call.
//!
//! The scanner never aborts. Problems go to the diagnostic sink and the
//! scan continues, so a single pass can report many errors.
use std::io::Read;

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use crate::{Blob, Errors, Name, Scanned, SourceMap, SrcPos, Syntax, Text, Token};

const READ_CHUNK: usize = 4096;

/// Indentation state saved by [`Scanner::open_group`] and restored by
/// [`Scanner::close_group`].
#[derive(Clone, Copy, Debug)]
#[must_use = "a saved indent must be passed back to close_group"]
pub struct SavedIndent {
    indent: u32,
    was_setting: bool,
}

pub struct Scanner<'a, R> {
    reader: R,
    buffer: Vec<u8>,
    buffer_index: usize,
    reader_done: bool,

    positions: &'a mut SourceMap,
    errors: &'a mut Errors,
    syntax: Option<&'a dyn Syntax>,

    spelling: Text,
    scanned: Scanned,
    position: SrcPos,

    indents: SmallVec<[u32; 8]>,
    indent: u32,
    column: u32,
    pending: SmallVec<[char; 2]>,
    indent_char: Option<char>,
    checking_indent: bool,
    setting_indent: bool,
    had_space_before: bool,
    had_space_after: bool,
    block_close: SmallVec<[Name; 4]>,
}

impl<'a, R: Read> Scanner<'a, R> {
    pub fn new(reader: R, positions: &'a mut SourceMap, errors: &'a mut Errors) -> Self {
        Scanner {
            reader,
            buffer: Vec::new(),
            buffer_index: 0,
            reader_done: false,
            positions,
            errors,
            syntax: None,
            spelling: Text::new(),
            scanned: Scanned::None,
            position: SrcPos(0),
            indents: smallvec![0],
            indent: 0,
            column: 0,
            pending: SmallVec::new(),
            indent_char: None,
            checking_indent: false,
            setting_indent: false,
            had_space_before: false,
            had_space_after: false,
            block_close: SmallVec::new(),
        }
    }

    /// Attach an operator/block table. Without one the scanner runs in
    /// discovery mode: any punctuation run is a single symbol.
    pub fn with_syntax(mut self, syntax: &'a dyn Syntax) -> Self {
        self.syntax = Some(syntax);
        self
    }

    /// The spelling of the last token, as written in the source.
    pub fn spelling(&self) -> &Text {
        &self.spelling
    }

    /// The literal value of the last token, if it was a literal.
    pub fn scanned(&self) -> &Scanned {
        &self.scanned
    }

    /// The start position of the last token.
    pub fn position(&self) -> SrcPos {
        self.position
    }

    pub fn had_space_before(&self) -> bool {
        self.had_space_before
    }

    pub fn had_space_after(&self) -> bool {
        self.had_space_after
    }

    /// Produce the next token.
    pub fn scan(&mut self) -> Token {
        let token = self.scan_token();

        self.had_space_after = matches!(self.peek(), Some(c) if c.is_whitespace());

        trace!(%token, spelling = %self.spelling, position = %self.position, "scanned");

        token
    }

    /// Read ahead until the literal byte sequence `closing` is matched,
    /// returning the intervening bytes without it. Used for block comments
    /// and long-text forms.
    ///
    /// Indentation bookkeeping continues during the skip: margin bytes on
    /// continuation lines below the current indent are dropped from the
    /// returned text.
    pub fn skip_to(&mut self, closing: &[u8]) -> Text {
        let mut text = Text::new();
        let mut column = 0;
        let mut in_margin = false;

        loop {
            let character = match self.getchar() {
                Some(character) => character,
                None => {
                    let message = format!(
                        "End of input while looking for '{}'",
                        String::from_utf8_lossy(closing)
                    );

                    self.error(SrcPos(self.offset()), message);
                    break;
                }
            };

            if in_margin && (character == ' ' || character == '\t') && column < self.indent {
                column += 1;
                continue;
            }

            in_margin = false;
            text.push_char(character);

            if character == '\n' {
                in_margin = true;
                column = 0;
            }

            if text.as_bytes().ends_with(closing) {
                text.truncate_bytes(closing.len());
                break;
            }
        }

        text
    }

    /// Save the indentation state when a parenthesis-like block opens; the
    /// next `NEWLINE` then establishes a fresh indent level for the block.
    pub fn open_group(&mut self) -> SavedIndent {
        let saved = SavedIndent {
            indent: self.indent,
            was_setting: self.setting_indent,
        };

        self.setting_indent = true;

        saved
    }

    /// Restore the indentation state saved when the block opened.
    pub fn close_group(&mut self, saved: SavedIndent) {
        let newline_set_indent = !self.setting_indent;

        self.checking_indent = false;
        self.setting_indent = saved.was_setting;
        self.indent = saved.indent;

        if newline_set_indent && self.indents.len() > 1 && self.indents.last() == Some(&self.indent)
        {
            self.indents.pop();
        }
    }

    fn scan_token(&mut self) -> Token {
        self.spelling.clear();
        self.scanned = Scanned::None;
        self.had_space_before = false;
        self.position = SrcPos(self.offset());

        // Drain unindents left over from an earlier dedent
        if let Some(&top) = self.indents.last() {
            if top > self.indent {
                self.indents.pop();
                debug!(level = top, "unindent");

                return Token::Unindent;
            }
        }

        // Skip whitespace, measuring indentation after a newline
        let mut next = self.getchar();

        loop {
            match next {
                Some('\n') => {
                    self.position = SrcPos(self.offset() - 1);
                    self.spelling.push_char('\n');
                    self.checking_indent = true;
                    self.column = 0;

                    return Token::Newline;
                }
                Some(character) if character.is_whitespace() => {
                    self.had_space_before = true;

                    if self.checking_indent && (character == ' ' || character == '\t') {
                        self.column += 1;

                        match self.indent_char {
                            None => self.indent_char = Some(character),
                            Some(chosen) if chosen != character => {
                                self.indent_char = Some(character);

                                let position = SrcPos(self.offset() - 1);

                                self.error(position, "Mixing tabs and spaces in indentation");
                            }
                            Some(_) => {}
                        }
                    }

                    next = self.getchar();
                }
                _ => break,
            }
        }

        let character = match next {
            Some(character) => character,
            None => {
                // Close the remaining indent levels, then report EOF
                self.checking_indent = false;
                self.indent = 0;

                if let Some(&top) = self.indents.last() {
                    if top > 0 {
                        self.indents.pop();

                        return Token::Unindent;
                    }
                }

                return Token::Eof;
            }
        };

        // Decide what the measured column means for block structure
        if self.checking_indent {
            self.checking_indent = false;
            self.position = SrcPos(self.offset() - character.len_utf8() as u32);

            if self.setting_indent {
                // The line after a block opener sets the block's indent
                self.ungetchar(character);
                self.setting_indent = false;
                self.indents.push(self.indent);
                self.indent = self.column;
                debug!(column = self.column, "block reference indent");

                return Token::Newline;
            } else if self.column > self.indent {
                self.ungetchar(character);
                self.indent = self.column;
                self.indents.push(self.indent);
                debug!(column = self.column, "indent");

                return Token::Indent;
            } else if self.indents.last().is_some_and(|&top| self.column < top) {
                self.ungetchar(character);
                self.indents.pop();
                self.indent = self.column;

                if self.indents.last().is_some_and(|&top| top < self.column) {
                    self.error(
                        self.position,
                        "Unindenting to the right of previous indentation",
                    );

                    return Token::Error;
                }

                debug!(column = self.column, "unindent");

                return Token::Unindent;
            }
            // Same level: scan the token that follows
        }

        self.position = SrcPos(self.offset() - character.len_utf8() as u32);

        if character == '$' || character.is_ascii_digit() {
            self.scan_number(character)
        } else if character.is_alphabetic() {
            self.scan_name(character)
        } else if character == '"' || character == '\'' {
            self.scan_text(character)
        } else {
            self.scan_operator(character)
        }
    }

    /// Scan a number, blob, or real literal, `character` being its first
    /// character.
    ///
    /// Numbers accept any base from 2 to 36 plus 64, selected by a `#`
    /// after the (decimal) base digits. A `$` prefix makes the literal a
    /// blob; digits are then packed MSB-first at the base's natural width,
    /// 3- and 6-bit digits into 24-bit groups.
    fn scan_number(&mut self, character: char) -> Token {
        let mut base: u64 = 10;
        let mut blob = false;
        let mut blob_bytes = Blob::new();
        let mut blob_chunk: u32 = 0;
        let mut blob_bits: u32 = 0;
        let mut blob_digit_bits: u32 = 4;
        let mut blob_chunk_bits: u32 = 8;

        let mut natural: u64 = 0;
        let mut decimal: u64 = 0;
        let mut decimal_valid = true;
        let mut based = false;

        let mut is_real = false;
        let mut real: f64 = 0.0;
        let mut fraction_scale: f64 = 1.0;

        let mut last_was_underscore = false;
        let mut ended_at_dot = false;

        let mut next = Some(character);

        if character == '$' {
            blob = true;
            base = 16;
            self.spelling.push_char('$');
            next = self.getchar();
        }

        loop {
            match next {
                Some(digit) if digit_value(digit, base).is_some() => {
                    let value = digit_value(digit, base).unwrap() as u64;

                    if is_real {
                        fraction_scale /= base as f64;
                        real += value as f64 * fraction_scale;
                    } else {
                        natural = natural.wrapping_mul(base).wrapping_add(value);

                        if blob {
                            blob_chunk = (blob_chunk << blob_digit_bits) | value as u32;
                            blob_bits += blob_digit_bits;

                            if blob_bits >= blob_chunk_bits {
                                emit_chunk(&mut blob_bytes, blob_chunk, blob_chunk_bits);
                                blob_chunk = 0;
                                blob_bits = 0;
                            }
                        }
                    }

                    match digit.to_digit(10) {
                        Some(ten) => decimal = decimal.wrapping_mul(10).wrapping_add(ten as u64),
                        None => decimal_valid = false,
                    }

                    self.spelling.push_char(digit);
                    last_was_underscore = false;
                    next = self.getchar();
                }
                Some('_') => {
                    if last_was_underscore {
                        let position = SrcPos(self.offset() - 1);

                        self.error(position, "Two consecutive underscores look really ugly");
                    }

                    last_was_underscore = true;
                    self.spelling.push_char('_');
                    next = self.getchar();
                }
                Some('#') if !based && !is_real => {
                    // The digits so far were the base, read in decimal
                    self.spelling.push_char('#');

                    let candidate = if decimal_valid { decimal } else { 0 };

                    if candidate == 64 || (2..=36).contains(&candidate) {
                        base = candidate;
                    } else {
                        let message = format!("The base {candidate} is not valid, using 36");

                        self.error(self.position, message);

                        base = 36;
                    }

                    if blob {
                        (blob_digit_bits, blob_chunk_bits) = match base {
                            2 => (1, 8),
                            4 => (2, 8),
                            8 => (3, 24),
                            16 => (4, 8),
                            64 => (6, 24),
                            _ => {
                                let message = format!(
                                    "Blobs cannot use base {base}, packing 8 bits per digit"
                                );

                                self.error(self.position, message);

                                (8, 8)
                            }
                        };
                        blob_bytes.clear();
                        blob_chunk = 0;
                        blob_bits = 0;
                    }

                    based = true;
                    natural = 0;
                    decimal = 0;
                    decimal_valid = true;
                    last_was_underscore = false;
                    next = self.getchar();
                }
                Some('#') => {
                    // A second # closes a based literal before the exponent
                    self.spelling.push_char('#');
                    next = self.getchar();
                    break;
                }
                Some('.') if !is_real => {
                    let after = self.getchar();

                    match after {
                        Some(digit) if digit_value(digit, base).is_some() => {
                            is_real = true;
                            real = natural as f64;
                            fraction_scale = 1.0;
                            self.spelling.push_char('.');
                            next = after;
                        }
                        _ => {
                            // Not a fraction: push both characters back
                            if let Some(after) = after {
                                self.ungetchar(after);
                            }

                            self.ungetchar('.');
                            ended_at_dot = true;
                            break;
                        }
                    }
                }
                Some(space) if blob && space.is_whitespace() => {
                    // Whitespace between blob digits is skipped
                    next = self.getchar();
                }
                _ => break,
            }
        }

        if !ended_at_dot {
            // Optional exponent, in decimal digits over the current base
            if !blob && matches!(next, Some('e') | Some('E')) {
                let exponent_char = next.unwrap();
                let mut after = self.getchar();
                let mut negative = false;
                let mut committed = false;

                if matches!(after, Some('+') | Some('-')) {
                    self.spelling.push_char(exponent_char);
                    self.spelling.push_char(after.unwrap());
                    negative = after == Some('-');
                    committed = true;
                    after = self.getchar();

                    if !matches!(after, Some(digit) if digit.is_ascii_digit()) {
                        self.error(self.position, "Malformed exponent");
                    }
                } else if matches!(after, Some(digit) if digit.is_ascii_digit()) {
                    self.spelling.push_char(exponent_char);
                    committed = true;
                }

                if committed {
                    let mut exponent: u64 = 0;

                    while let Some(digit) = after {
                        match digit.to_digit(10) {
                            Some(value) => {
                                exponent = exponent.wrapping_mul(10).wrapping_add(value as u64);
                                self.spelling.push_char(digit);
                                after = self.getchar();
                            }
                            None => break,
                        }
                    }

                    next = after;

                    if negative && !is_real {
                        is_real = true;
                        real = natural as f64;
                    }

                    if is_real {
                        let factor = real_power(base as f64, exponent);

                        if negative {
                            real /= factor;
                        } else {
                            real *= factor;
                        }
                    } else {
                        natural = natural.wrapping_mul(natural_power(base, exponent));
                    }
                } else {
                    if let Some(after) = after {
                        self.ungetchar(after);
                    }

                    self.ungetchar(exponent_char);
                    next = None;
                }
            } else if blob {
                // Optional padding and closing marker
                while next == Some('=') {
                    self.spelling.push_char('=');
                    next = self.getchar();
                }

                if next == Some('$') {
                    self.spelling.push_char('$');
                    next = self.getchar();
                }
            }

            if let Some(terminator) = next {
                self.ungetchar(terminator);
            }
        }

        if blob {
            if blob_bits > 0 {
                // Left-shift the partial chunk to its full width
                blob_chunk <<= blob_chunk_bits - blob_bits;
                emit_chunk(&mut blob_bytes, blob_chunk, blob_chunk_bits);
            }

            self.scanned = Scanned::Blob(blob_bytes);

            Token::Blob
        } else if is_real {
            self.scanned = Scanned::Real(real);

            Token::Real
        } else {
            self.scanned = Scanned::Natural(natural);

            Token::Integer
        }
    }

    fn scan_name(&mut self, first: char) -> Token {
        self.spelling.push_char(first);

        let mut previous = first;

        loop {
            match self.getchar() {
                Some(character) if character.is_alphanumeric() || character == '_' => {
                    if character == '_' && previous == '_' {
                        let position = SrcPos(self.offset() - 1);

                        self.error(position, "Two consecutive underscores look really ugly");
                    }

                    self.spelling.push_char(character);
                    previous = character;
                }
                Some(character) => {
                    self.ungetchar(character);
                    break;
                }
                None => break,
            }
        }

        let normalized = Name::normalize(&self.spelling.to_string_lossy());
        let name = Name::new(&normalized);

        self.scanned = Scanned::Name(name.clone());
        self.classify(name, Token::Name)
    }

    fn scan_text(&mut self, delimiter: char) -> Token {
        self.spelling.push_char(delimiter);

        let mut value = Text::new();

        loop {
            match self.getchar() {
                None => {
                    self.error(
                        SrcPos(self.offset()),
                        "End of input in the middle of a text",
                    );
                    break;
                }
                Some(character) if character == delimiter => {
                    self.spelling.push_char(character);

                    // A doubled delimiter encodes a literal delimiter
                    match self.getchar() {
                        Some(doubled) if doubled == delimiter => {
                            self.spelling.push_char(doubled);
                            value.push_char(doubled);
                        }
                        Some(other) => {
                            self.ungetchar(other);
                            break;
                        }
                        None => break,
                    }
                }
                Some(character) => {
                    self.spelling.push_char(character);
                    value.push_char(character);
                }
            }
        }

        if delimiter == '\'' {
            if value.char_count() != 1 {
                self.error(
                    self.position,
                    "A character constant should contain one character",
                );
            }

            self.scanned = Scanned::Character(value.first_char().unwrap_or('\0'));

            Token::Character
        } else {
            self.scanned = Scanned::Text(value);

            Token::Text
        }
    }

    fn scan_operator(&mut self, first: char) -> Token {
        self.spelling.push_char(first);

        let mut spelling = String::from(first);

        match self.syntax {
            Some(syntax) => {
                // Maximal munch: extend while the table knows the spelling
                loop {
                    match self.getchar() {
                        Some(character) if is_operator_character(character) => {
                            spelling.push(character);

                            if syntax.is_operator(&spelling) {
                                self.spelling.push_char(character);
                            } else {
                                spelling.pop();
                                self.ungetchar(character);
                                break;
                            }
                        }
                        Some(character) => {
                            self.ungetchar(character);
                            break;
                        }
                        None => break,
                    }
                }
            }
            None => {
                // Discovery mode: any punctuation run is one symbol
                loop {
                    match self.getchar() {
                        Some(character) if is_operator_character(character) => {
                            spelling.push(character);
                            self.spelling.push_char(character);
                        }
                        Some(character) => {
                            self.ungetchar(character);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        let name = Name::new(&spelling);

        self.scanned = Scanned::Name(name.clone());
        self.classify(name, Token::Symbol)
    }

    /// Turn a scanned name into `OPEN`, `CLOSE`, or its default token.
    ///
    /// Expected closers form a stack so that nested blocks of the same
    /// delimiter each match their own closing name.
    fn classify(&mut self, name: Name, default: Token) -> Token {
        if let Some(syntax) = self.syntax {
            if let Some(closing) = syntax.block_closing(&name) {
                self.block_close.push(closing);

                return Token::Open;
            }
        }

        if self.block_close.last() == Some(&name) {
            self.block_close.pop();

            return Token::Close;
        }

        default
    }

    fn error(&mut self, position: SrcPos, message: impl AsRef<str>) {
        self.errors.report(self.positions, position, message);
    }

    /// The position of the next character to be delivered.
    fn offset(&self) -> u32 {
        let pending: u32 = self
            .pending
            .iter()
            .map(|character| character.len_utf8() as u32)
            .sum();

        self.positions.current().0.saturating_sub(pending)
    }

    fn peek(&mut self) -> Option<char> {
        if let Some(&character) = self.pending.last() {
            return Some(character);
        }

        let character = self.getchar()?;

        self.ungetchar(character);

        Some(character)
    }

    fn getchar(&mut self) -> Option<char> {
        if let Some(character) = self.pending.pop() {
            return Some(character);
        }

        let first = self.next_byte()?;

        if first < 0x80 {
            return Some(first as char);
        }

        let width = utf8_sequence_length(first);

        if width < 2 {
            // Invalid lead byte: deliver it as its own character
            return Some(first as char);
        }

        let mut encoded: SmallVec<[u8; 4]> = smallvec![first];

        while encoded.len() < width {
            match self.peek_byte() {
                Some(byte) if utf8_is_continuation(byte) => {
                    self.next_byte();
                    encoded.push(byte);
                }
                _ => break,
            }
        }

        match std::str::from_utf8(&encoded) {
            Ok(sequence) => sequence.chars().next(),
            Err(_) => Some(char::REPLACEMENT_CHARACTER),
        }
    }

    fn ungetchar(&mut self, character: char) {
        debug_assert!(self.pending.len() < 2, "more than two characters pushed back");

        self.pending.push(character);
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.buffer_index >= self.buffer.len() {
            self.fill_buffer();
        }

        let byte = self.buffer.get(self.buffer_index).copied()?;

        self.buffer_index += 1;
        self.positions.step(byte);

        Some(byte)
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.buffer_index >= self.buffer.len() {
            self.fill_buffer();
        }

        self.buffer.get(self.buffer_index).copied()
    }

    fn fill_buffer(&mut self) {
        if self.reader_done {
            return;
        }

        self.buffer.resize(READ_CHUNK, 0);
        self.buffer_index = 0;

        match self.reader.read(&mut self.buffer) {
            Ok(0) => {
                self.reader_done = true;
                self.buffer.clear();
            }
            Ok(filled) => self.buffer.truncate(filled),
            Err(error) => {
                self.reader_done = true;
                self.buffer.clear();

                let position = self.positions.current();
                let message = format!("Cannot read input: {error}");

                self.errors.report(self.positions, position, message);
            }
        }
    }
}

fn emit_chunk(bytes: &mut Blob, chunk: u32, chunk_bits: u32) {
    if chunk_bits == 24 {
        bytes.push((chunk >> 16) as u8);
        bytes.push((chunk >> 8) as u8);
        bytes.push(chunk as u8);
    } else {
        bytes.push(chunk as u8);
    }
}

fn digit_value(character: char, base: u64) -> Option<u32> {
    if base == 64 {
        return match character {
            'A'..='Z' => Some(character as u32 - 'A' as u32),
            'a'..='z' => Some(character as u32 - 'a' as u32 + 26),
            '0'..='9' => Some(character as u32 - '0' as u32 + 52),
            '+' => Some(62),
            '/' => Some(63),
            _ => None,
        };
    }

    let value = match character {
        '0'..='9' => character as u32 - '0' as u32,
        'A'..='Z' => character as u32 - 'A' as u32 + 10,
        'a'..='z' => character as u32 - 'a' as u32 + 10,
        _ => return None,
    };

    (value < base as u32).then_some(value)
}

fn is_operator_character(character: char) -> bool {
    !character.is_alphanumeric()
        && !character.is_whitespace()
        && character != '"'
        && character != '\''
}

/// Exponentiation by squaring over naturals, wrapping on overflow.
fn natural_power(mut base: u64, mut exponent: u64) -> u64 {
    let mut result: u64 = 1;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.wrapping_mul(base);
        }

        base = base.wrapping_mul(base);
        exponent >>= 1;
    }

    result
}

/// Exponentiation by squaring over reals.
fn real_power(mut base: f64, mut exponent: u64) -> f64 {
    let mut result = 1.0;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result *= base;
        }

        base *= base;
        exponent >>= 1;
    }

    result
}

/// Length of the UTF-8 sequence introduced by `first`, or 0 when `first`
/// cannot start one.
fn utf8_sequence_length(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn utf8_is_continuation(byte: u8) -> bool {
    (byte as i8) < -64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntaxTable;

    fn scan_all(
        source: &str,
        syntax: Option<&SyntaxTable>,
    ) -> (Vec<(Token, Scanned)>, Vec<String>) {
        let mut map = SourceMap::new();
        let mut errors = Errors::new();

        map.open_file("test.reed");

        let buffered = errors.save();
        let mut tokens = Vec::new();

        {
            let mut scanner = Scanner::new(source.as_bytes(), &mut map, &mut errors);

            if let Some(table) = syntax {
                scanner = scanner.with_syntax(table);
            }

            let mut previous = SrcPos(0);

            loop {
                let token = scanner.scan();

                assert!(scanner.position() >= previous, "positions went backwards");
                previous = scanner.position();
                tokens.push((token, scanner.scanned().clone()));

                if token == Token::Eof {
                    break;
                }
            }
        }

        assert_eq!(
            map.current().as_usize(),
            source.len(),
            "not every input byte was consumed"
        );

        let messages = errors
            .reports()
            .iter()
            .map(|report| report.message_text())
            .collect();

        errors.clear(buffered);

        (tokens, messages)
    }

    fn kinds(source: &str) -> Vec<Token> {
        scan_all(source, None)
            .0
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    fn single_value(source: &str) -> Scanned {
        let (tokens, messages) = scan_all(source, None);

        assert!(messages.is_empty(), "unexpected diagnostics: {messages:?}");

        tokens[0].1.clone()
    }

    #[test]
    fn indentation_encodes_block_structure() {
        assert_eq!(
            kinds("  \n  foo\n"),
            vec![
                Token::Newline,
                Token::Indent,
                Token::Name,
                Token::Newline,
                Token::Unindent,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn nested_indents_unwind_one_level_per_scan() {
        let tokens = kinds("a\n  b\n    c\nd\n");

        assert_eq!(
            tokens,
            vec![
                Token::Name,
                Token::Newline,
                Token::Indent,
                Token::Name,
                Token::Newline,
                Token::Indent,
                Token::Name,
                Token::Newline,
                Token::Unindent,
                Token::Unindent,
                Token::Name,
                Token::Newline,
                Token::Eof,
            ]
        );

        let indents = tokens.iter().filter(|&&t| t == Token::Indent).count();
        let unindents = tokens.iter().filter(|&&t| t == Token::Unindent).count();

        assert_eq!(indents, unindents);
    }

    #[test]
    fn unindent_levels_drain_at_end_of_input() {
        assert_eq!(
            kinds("a\n  b"),
            vec![
                Token::Name,
                Token::Newline,
                Token::Indent,
                Token::Name,
                Token::Unindent,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn misaligned_unindent_is_an_error() {
        let (tokens, messages) = scan_all("a\n    b\n  c\n", None);
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![
                Token::Name,
                Token::Newline,
                Token::Indent,
                Token::Name,
                Token::Newline,
                Token::Error,
                Token::Name,
                Token::Newline,
                Token::Eof,
            ]
        );
        assert_eq!(
            messages,
            vec!["Unindenting to the right of previous indentation"]
        );
    }

    #[test]
    fn mixing_tabs_and_spaces_is_reported() {
        let (tokens, messages) = scan_all("a\n  b\n\t\tc\n", None);

        assert!(tokens.iter().any(|(token, _)| *token == Token::Name));
        assert_eq!(messages, vec!["Mixing tabs and spaces in indentation"]);
    }

    #[test]
    fn based_integers() {
        assert_eq!(single_value("16#FF"), Scanned::Natural(255));
        assert_eq!(single_value("2#1_0000_0000"), Scanned::Natural(256));
        assert_eq!(single_value("36#zz"), Scanned::Natural(1295));
        assert_eq!(single_value("8#777"), Scanned::Natural(511));
    }

    #[test]
    fn rebased_rendition_round_trips() {
        for value in [0u64, 1, 9, 255, 4096, 123_456_789] {
            let source = format!("16#{value:X}");
            let (tokens, messages) = scan_all(&source, None);

            assert!(messages.is_empty());
            assert_eq!(tokens[0], (Token::Integer, Scanned::Natural(value)));
        }
    }

    #[test]
    fn invalid_base_is_clamped_with_an_error() {
        let (tokens, messages) = scan_all("1#23", None);

        assert_eq!(tokens[0], (Token::Integer, Scanned::Natural(2 * 36 + 3)));
        assert_eq!(messages, vec!["The base 1 is not valid, using 36"]);
    }

    #[test]
    fn doubled_underscores_are_ugly_but_tolerated() {
        let (tokens, messages) = scan_all("1__0", None);

        assert_eq!(tokens[0], (Token::Integer, Scanned::Natural(10)));
        assert_eq!(
            messages,
            vec!["Two consecutive underscores look really ugly"]
        );
    }

    #[test]
    fn reals_with_exponents() {
        assert_eq!(single_value("1.5"), Scanned::Real(1.5));
        assert_eq!(single_value("1.5e-2"), Scanned::Real(0.015));
        assert_eq!(single_value("1.5e+2"), Scanned::Real(150.0));
        assert_eq!(single_value("16#F.8"), Scanned::Real(15.5));
    }

    #[test]
    fn positive_exponents_stay_natural() {
        assert_eq!(single_value("1e3"), Scanned::Natural(1000));
        assert_eq!(single_value("2e10"), Scanned::Natural(20_000_000_000));
    }

    #[test]
    fn negative_exponents_force_reals() {
        let (tokens, _) = scan_all("1e-3", None);

        assert_eq!(tokens[0], (Token::Real, Scanned::Real(0.001)));
    }

    #[test]
    fn blob_packs_hex_pairs() {
        let (tokens, messages) = scan_all("$16#DEAD_BEEF$", None);

        assert!(messages.is_empty());
        assert_eq!(
            tokens[0],
            (
                Token::Blob,
                Scanned::Blob(Blob::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]))
            )
        );
    }

    #[test]
    fn blob_defaults_to_hexadecimal() {
        let (tokens, _) = scan_all("$C0FFEE$", None);

        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(&[0xC0, 0xFF, 0xEE])))
        );
    }

    #[test]
    fn blob_skips_whitespace_between_digits() {
        let (tokens, _) = scan_all("$16#DE AD$", None);

        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(&[0xDE, 0xAD])))
        );
    }

    #[test]
    fn blob_base64_packs_24_bit_groups() {
        let (tokens, _) = scan_all("$64#QUJD$", None);

        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(b"ABC")))
        );
    }

    #[test]
    fn blob_partial_chunks_are_left_shifted() {
        // Three octal digits fill 9 of 24 bits; the rest pads with zeros
        let (tokens, _) = scan_all("$8#777$", None);

        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(&[0xFF, 0x80, 0x00])))
        );
    }

    #[test]
    fn blob_base64_padding_is_consumed() {
        let (tokens, messages) = scan_all("$64#QQ==$", None);

        assert!(messages.is_empty());
        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(&[0x41, 0x00, 0x00])))
        );
    }

    #[test]
    fn unsupported_blob_base_packs_full_bytes() {
        let (tokens, messages) = scan_all("$10#255$", None);

        assert_eq!(
            tokens[0],
            (Token::Blob, Scanned::Blob(Blob::from_bytes(&[2, 5, 5])))
        );
        assert_eq!(
            messages,
            vec!["Blobs cannot use base 10, packing 8 bits per digit"]
        );
    }

    #[test]
    fn character_literal() {
        let (tokens, messages) = scan_all("'a'", None);

        assert!(messages.is_empty());
        assert_eq!(tokens[0], (Token::Character, Scanned::Character('a')));
    }

    #[test]
    fn oversized_character_literal_still_scans() {
        let (tokens, messages) = scan_all("'ab'", None);

        assert_eq!(tokens[0], (Token::Character, Scanned::Character('a')));
        assert_eq!(
            messages,
            vec!["A character constant should contain one character"]
        );
    }

    #[test]
    fn doubled_delimiters_escape_in_texts() {
        let (tokens, messages) = scan_all("\"he said \"\"hi\"\"\"", None);

        assert!(messages.is_empty());
        assert_eq!(
            tokens[0],
            (Token::Text, Scanned::Text(Text::from("he said \"hi\"")))
        );
    }

    #[test]
    fn end_of_input_terminates_a_text() {
        let (tokens, messages) = scan_all("\"abc", None);

        assert_eq!(tokens[0], (Token::Text, Scanned::Text(Text::from("abc"))));
        assert_eq!(messages, vec!["End of input in the middle of a text"]);
    }

    #[test]
    fn dot_dot_needs_two_characters_of_pushback() {
        let (tokens, messages) = scan_all("1..3", None);
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert!(messages.is_empty());
        assert_eq!(
            kinds,
            vec![Token::Integer, Token::Symbol, Token::Integer, Token::Eof]
        );
        assert_eq!(tokens[0].1, Scanned::Natural(1));
        assert_eq!(tokens[1].1, Scanned::Name(Name::new("..")));
        assert_eq!(tokens[2].1, Scanned::Natural(3));
    }

    #[test]
    fn operators_use_maximal_munch_against_the_table() {
        let mut table = SyntaxTable::new();

        table.add_operator("<=");
        table.add_operator("<");

        let (tokens, _) = scan_all("a<=b", Some(&table));

        assert_eq!(tokens[1].0, Token::Symbol);
        assert_eq!(tokens[1].1, Scanned::Name(Name::new("<=")));
    }

    #[test]
    fn unknown_punctuation_stays_single_with_a_table() {
        let table = SyntaxTable::new();
        let (tokens, _) = scan_all("a@@b", Some(&table));
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![
                Token::Name,
                Token::Symbol,
                Token::Symbol,
                Token::Name,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn discovery_mode_swallows_punctuation_runs() {
        let (tokens, _) = scan_all("a<=>b", None);

        assert_eq!(tokens[1].0, Token::Symbol);
        assert_eq!(tokens[1].1, Scanned::Name(Name::new("<=>")));
    }

    #[test]
    fn parentheses_open_and_close_blocks() {
        let mut table = SyntaxTable::new();

        table.add_block(Name::new("("), Name::new(")"));

        let (tokens, _) = scan_all("(x)", Some(&table));
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![Token::Open, Token::Name, Token::Close, Token::Eof]
        );
    }

    #[test]
    fn nested_blocks_of_the_same_delimiter_each_close() {
        let mut table = SyntaxTable::new();

        table.add_block(Name::new("("), Name::new(")"));

        let (tokens, _) = scan_all("(a(b)c)", Some(&table));
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![
                Token::Open,
                Token::Name,
                Token::Open,
                Token::Name,
                Token::Close,
                Token::Name,
                Token::Close,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn nested_blocks_of_different_delimiters_each_close() {
        let mut table = SyntaxTable::new();

        table.add_block(Name::new("("), Name::new(")"));
        table.add_block(Name::new("["), Name::new("]"));
        table.add_block(Name::new("loop"), Name::new("end_loop"));

        let (tokens, _) = scan_all("loop [x] (y) end_loop", Some(&table));
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![
                Token::Open,
                Token::Open,
                Token::Name,
                Token::Close,
                Token::Open,
                Token::Name,
                Token::Close,
                Token::Close,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn word_blocks_match_their_closing_names() {
        let mut table = SyntaxTable::new();

        table.add_block(Name::new("loop"), Name::new("end_loop"));

        let (tokens, _) = scan_all("loop x endloop", Some(&table));
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        // endloop normalizes like end_loop and therefore closes the block
        assert_eq!(
            kinds,
            vec![Token::Open, Token::Name, Token::Close, Token::Eof]
        );
    }

    #[test]
    fn names_are_normalized_but_keep_their_spelling() {
        let mut map = SourceMap::new();
        let mut errors = Errors::new();

        map.open_file("test.reed");

        let mut scanner = Scanner::new("Hello_World".as_bytes(), &mut map, &mut errors);

        assert_eq!(scanner.scan(), Token::Name);
        assert_eq!(
            scanner.scanned(),
            &Scanned::Name(Name::new("helloworld"))
        );
        assert_eq!(scanner.spelling().as_bytes(), b"Hello_World");
    }

    #[test]
    fn space_adjacency_flags() {
        let mut map = SourceMap::new();
        let mut errors = Errors::new();

        map.open_file("test.reed");

        let mut scanner = Scanner::new("a b".as_bytes(), &mut map, &mut errors);

        scanner.scan();
        assert!(!scanner.had_space_before());
        assert!(scanner.had_space_after());

        scanner.scan();
        assert!(scanner.had_space_before());
        assert!(!scanner.had_space_after());
    }

    #[test]
    fn skip_to_drops_the_margin_of_continuation_lines() {
        let mut map = SourceMap::new();
        let mut errors = Errors::new();

        map.open_file("test.reed");

        let source = "\n  a one\n     two*/x";
        let mut scanner = Scanner::new(source.as_bytes(), &mut map, &mut errors);

        assert_eq!(scanner.scan(), Token::Newline);
        assert_eq!(scanner.scan(), Token::Indent);
        assert_eq!(scanner.scan(), Token::Name);

        let skipped = scanner.skip_to(b"*/");

        // Two margin columns are dropped from the continuation line
        assert_eq!(skipped.as_bytes(), b" one\n   two");
        assert_eq!(scanner.scan(), Token::Name);
    }

    #[test]
    fn groups_set_and_restore_the_reference_indent() {
        let mut table = SyntaxTable::new();

        table.add_block(Name::new("("), Name::new(")"));

        let mut map = SourceMap::new();
        let mut errors = Errors::new();

        map.open_file("test.reed");

        let source = "(\n  a)";
        let mut scanner =
            Scanner::new(source.as_bytes(), &mut map, &mut errors).with_syntax(&table);

        assert_eq!(scanner.scan(), Token::Open);

        let saved = scanner.open_group();

        assert_eq!(scanner.scan(), Token::Newline);
        assert_eq!(scanner.scan(), Token::Newline);
        assert_eq!(scanner.scan(), Token::Name);
        assert_eq!(scanner.scan(), Token::Close);

        scanner.close_group(saved);

        // The group's reference indent leaves no level behind
        assert_eq!(scanner.scan(), Token::Eof);
    }

    #[test]
    fn unicode_letters_start_names() {
        let (tokens, _) = scan_all("début + fin", None);
        let kinds: Vec<Token> = tokens.iter().map(|(token, _)| *token).collect();

        assert_eq!(
            kinds,
            vec![Token::Name, Token::Symbol, Token::Name, Token::Eof]
        );
        assert_eq!(tokens[0].1, Scanned::Name(Name::new("début")));
    }

    #[test]
    fn blank_lines_produce_newlines() {
        assert_eq!(
            kinds("a\n\n\nb"),
            vec![
                Token::Name,
                Token::Newline,
                Token::Newline,
                Token::Newline,
                Token::Name,
                Token::Eof,
            ]
        );
    }
}
