//! Plain-text host surface.
//!
//! Highlights are drawn as a marker line under each line of text, one marker
//! character per error category:
//!
//! ```text
//! i think he is gud
//! ^             ~~~
//! ```

use std::io::Write;

use redline_core::{
    CorrectionStore, ErrorKind, HighlightOverlay, HighlightRange, HighlightTarget, HostSurface,
    Notice, PlatformError, Popover, Span,
};

/// Marker drawn under text highlighted for `kind`.
pub fn marker(kind: ErrorKind) -> char {
    match kind {
        ErrorKind::Spelling => '~',
        ErrorKind::Punctuation => '.',
        ErrorKind::Capitalization => '^',
        ErrorKind::Preposition => '>',
        ErrorKind::MissingWords => '+',
        ErrorKind::Grammar => '=',
    }
}

/// Lines of `text`, each highlighted line followed by its marker line.
///
/// Assumes one column per char.
pub fn annotate(text: &str, ranges: &[(ErrorKind, Span)]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line_start = 0;

    for line in text.split('\n') {
        let len = line.chars().count();
        let line_end = line_start + len;
        let mut marks = vec![' '; len];
        let mut marked = false;

        for (kind, span) in ranges {
            for offset in span.start.max(line_start)..span.end.min(line_end) {
                marks[offset - line_start] = marker(*kind);
                marked = true;
            }
        }

        lines.push(line.to_string());
        if marked {
            lines.push(marks.into_iter().collect::<String>().trim_end().to_string());
        }
        line_start = line_end + 1;
    }

    lines
}

fn io_error(err: std::io::Error) -> PlatformError {
    PlatformError(err.to_string())
}

/// Writes engine output to a terminal (or any writer).
pub struct TerminalHost<W: Write> {
    out: W,
    text: String,
    legend: String,
    labels: Vec<(ErrorKind, Span)>,
    editor: Vec<(ErrorKind, Span)>,
    popover_open: bool,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W, text: &str, legend: &str) -> Self {
        Self {
            out,
            text: text.to_string(),
            legend: legend.to_string(),
            labels: Vec::new(),
            editor: Vec::new(),
            popover_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Draw the legend and the annotated text.
    pub fn render(&mut self) -> std::io::Result<()> {
        if !self.labels.is_empty() {
            for line in annotate(&self.legend, &self.labels) {
                writeln!(self.out, "{line}")?;
            }
            writeln!(self.out)?;
        }
        for line in annotate(&self.text, &self.editor) {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    /// Print the model's own rewrite of the whole text.
    pub fn corrected_input(&mut self, corrected: &str) -> std::io::Result<()> {
        writeln!(self.out, "Corrected text:")?;
        for line in corrected.split('\n') {
            writeln!(self.out, "  {line}")?;
        }
        writeln!(self.out)
    }

    /// List the live corrections, one per line.
    pub fn list(&mut self, corrections: &CorrectionStore) -> std::io::Result<()> {
        for (i, c) in corrections.iter().enumerate() {
            writeln!(
                self.out,
                "{:>3}. [{}..{}] {}: \"{}\" -> \"{}\"  {}",
                i + 1,
                c.span.start,
                c.span.end,
                c.kind,
                c.original_text,
                c.corrected_text,
                c.explanation
            )?;
        }
        Ok(())
    }
}

impl<W: Write> HostSurface for TerminalHost<W> {
    fn set_text(&mut self, text: &str) -> Result<(), PlatformError> {
        self.text = text.to_string();
        Ok(())
    }

    fn set_highlights(
        &mut self,
        kind: ErrorKind,
        ranges: &[HighlightRange],
    ) -> Result<(), PlatformError> {
        self.labels.retain(|(k, _)| *k != kind);
        self.editor.retain(|(k, _)| *k != kind);
        for range in ranges {
            match range.target {
                HighlightTarget::Legend => self.labels.push((kind, range.span)),
                HighlightTarget::Editor => self.editor.push((kind, range.span)),
                // The popover heading is printed with its category already.
                HighlightTarget::PopoverHeading => {}
            }
        }
        Ok(())
    }

    fn show_popover(&mut self, popover: &Popover) -> Result<(), PlatformError> {
        self.popover_open = true;
        writeln!(
            self.out,
            "{} {} at {}..{}: replace with \"{}\"",
            marker(popover.kind),
            popover.heading,
            popover.span.start,
            popover.span.end,
            popover.corrected_text
        )
        .map_err(io_error)?;
        if !popover.explanation.is_empty() {
            writeln!(self.out, "    {}", popover.explanation).map_err(io_error)?;
        }
        Ok(())
    }

    fn hide_popover(&mut self) -> Result<(), PlatformError> {
        self.popover_open = false;
        Ok(())
    }

    fn notify(&mut self, notice: &Notice) {
        let message = match notice {
            Notice::EmptyInput => "Nothing to proofread.".to_string(),
            Notice::NoCorrections { unlocated: 0 } => "No corrections found.".to_string(),
            Notice::NoCorrections { unlocated } => {
                format!("No corrections could be placed ({unlocated} not found in the text).")
            }
            Notice::Located { found, unlocated: 0 } => format!("{found} correction(s) found."),
            Notice::Located { found, unlocated } => {
                format!("{found} correction(s) found, {unlocated} could not be placed.")
            }
            Notice::FeatureUnavailable(reason) => format!("Proofreading is unavailable: {reason}"),
            Notice::ModelFailed(reason) => format!("Proofreading failed: {reason}"),
        };
        if let Err(err) = writeln!(self.out, "{message}") {
            tracing::warn!(error = %err, "could not write notice");
        }
    }
}

impl<W: Write> TerminalHost<W> {
    pub fn popover_open(&self) -> bool {
        self.popover_open
    }

    /// Paint every channel of `overlay`, changed or not.
    pub fn paint_all(&mut self, overlay: &HighlightOverlay) -> Result<(), PlatformError> {
        for channel in overlay.channels() {
            self.set_highlights(channel.kind(), &channel.ranges())?;
        }
        Ok(())
    }
}
