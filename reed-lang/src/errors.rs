//! Diagnostic collection and display.
//!
//! Diagnostics are values, not exceptions: the scanner reports them here
//! and keeps going. When a buffer is active reports accumulate; otherwise
//! they are displayed immediately. Buffers nest through save/commit/clear,
//! which lets a speculative parse discard its diagnostics on backtrack and
//! keep them on success.
use std::fmt::Write as _;

use colored::Colorize;
use tracing::debug;

use crate::{SourceMap, SrcPos, Text, Tree, TreeRef};

/// One diagnostic: a text node tagged with the offending position.
#[derive(Clone, Debug)]
pub struct Report {
    pub position: SrcPos,
    pub message: TreeRef,
}

impl Report {
    pub fn new(position: SrcPos, message: impl AsRef<str>) -> Self {
        Report {
            position,
            message: Tree::text(position, Text::from(message.as_ref())),
        }
    }

    pub fn message_text(&self) -> String {
        match self.message.as_text() {
            Some(text) => text.to_string_lossy().into_owned(),
            None => self.message.to_string(),
        }
    }
}

/// A buffer handle returned by [`Errors::save`], to be passed back to
/// either [`Errors::commit`] or [`Errors::clear`].
#[derive(Debug)]
#[must_use = "a saved error context must be committed or cleared"]
pub struct Saved {
    previous: Option<Vec<Report>>,
}

/// The diagnostic sink.
#[derive(Debug, Default)]
pub struct Errors {
    buffer: Option<Vec<Report>>,
}

impl Errors {
    pub fn new() -> Self {
        Errors::default()
    }

    pub fn is_buffering(&self) -> bool {
        self.buffer.is_some()
    }

    /// The reports accumulated in the current buffer.
    pub fn reports(&self) -> &[Report] {
        self.buffer.as_deref().unwrap_or(&[])
    }

    /// Record one diagnostic, displaying it immediately when no buffer is
    /// active.
    pub fn report(&mut self, map: &SourceMap, position: SrcPos, message: impl AsRef<str>) {
        let report = Report::new(position, message.as_ref());

        debug!(position = %position, text = message.as_ref(), "diagnostic");

        match &mut self.buffer {
            Some(buffer) => buffer.push(report),
            None => Errors::display(map, &report),
        }
    }

    /// Install a fresh empty buffer, returning the previous context.
    pub fn save(&mut self) -> Saved {
        Saved {
            previous: self.buffer.replace(Vec::new()),
        }
    }

    /// Keep the current buffer's reports: append them to the saved context,
    /// or display them when the saved context had no buffer.
    pub fn commit(&mut self, map: &SourceMap, saved: Saved) {
        let reports = self.buffer.take().unwrap_or_default();

        self.buffer = saved.previous;

        match &mut self.buffer {
            Some(buffer) => buffer.extend(reports),
            None => {
                for report in &reports {
                    Errors::display(map, report);
                }
            }
        }
    }

    /// Discard the current buffer's reports and restore the saved context.
    pub fn clear(&mut self, saved: Saved) {
        self.buffer = saved.previous;
    }

    /// The plain display form: `file:line: message`, the source line, and
    /// a caret under the offending column. Without position information,
    /// just the message.
    pub fn render(map: &SourceMap, report: &Report) -> String {
        let message = report.message_text();

        match map.info(report.position) {
            Some(info) => {
                let mut rendered = String::new();
                let line = String::from_utf8_lossy(map.line_bytes(&info)).into_owned();

                let _ = writeln!(rendered, "{}:{}: {}", info.file, info.line, message);
                let _ = writeln!(rendered, "{line}");
                let _ = write!(rendered, "{}^", " ".repeat(info.column as usize));

                rendered
            }
            None => message,
        }
    }

    /// Write one report to stderr, styled for terminals.
    pub fn display(map: &SourceMap, report: &Report) {
        let message = report.message_text();

        match map.info(report.position) {
            Some(info) => {
                let line = String::from_utf8_lossy(map.line_bytes(&info)).into_owned();

                eprintln!("{}:{}: {}", info.file, info.line, message.bold());
                eprintln!("{line}");
                eprintln!("{}{}", " ".repeat(info.column as usize), "^".red().bold());
            }
            None => eprintln!("{}", message.bold()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(source: &str) -> SourceMap {
        let mut map = SourceMap::new();

        map.open_file("test.reed");

        for byte in source.bytes() {
            map.step(byte);
        }

        map
    }

    #[test]
    fn render_shows_line_and_caret() {
        let map = map_of("one\nbad line\n");
        let report = Report::new(SrcPos(8), "something is off");

        assert_eq!(
            Errors::render(&map, &report),
            "test.reed:2: something is off\nbad line\n    ^"
        );
    }

    #[test]
    fn render_without_position_is_just_the_message() {
        let map = SourceMap::new();
        let report = Report::new(SrcPos::NONE, "lonely message");

        assert_eq!(Errors::render(&map, &report), "lonely message");
    }

    #[test]
    fn save_commit_keeps_reports() {
        let map = map_of("x\n");
        let mut errors = Errors::new();

        let outer = errors.save();
        errors.report(&map, SrcPos(0), "outer");

        let inner = errors.save();
        errors.report(&map, SrcPos(0), "inner");
        assert_eq!(errors.reports().len(), 1);

        errors.commit(&map, inner);
        assert_eq!(errors.reports().len(), 2);
        assert_eq!(errors.reports()[1].message_text(), "inner");

        errors.clear(outer);
        assert!(!errors.is_buffering());
    }

    #[test]
    fn save_clear_discards_reports() {
        let map = map_of("x\n");
        let mut errors = Errors::new();

        let outer = errors.save();
        errors.report(&map, SrcPos(0), "kept");

        let inner = errors.save();
        errors.report(&map, SrcPos(0), "dropped");
        errors.clear(inner);

        assert_eq!(errors.reports().len(), 1);
        assert_eq!(errors.reports()[0].message_text(), "kept");

        errors.clear(outer);
    }
}
