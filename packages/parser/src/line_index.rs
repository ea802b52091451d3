//! Offset to line/column conversion.

use trellis_common::SourceRange;

/// Line start table for one version of a buffer
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, line_starts }
    }

    /// 1-based line and column (in chars) of a byte offset.
    ///
    /// Offsets past the end clamp to the end of the buffer.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let col = self
            .source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line + 1, col + 1)
    }

    pub fn range(&self, start: usize, end: usize) -> SourceRange {
        let (start_line, start_col) = self.position(start);
        let (end_line, end_col) = self.position(end);
        SourceRange {
            start_offset: start,
            end_offset: end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    pub fn point(&self, offset: usize) -> SourceRange {
        self.range(offset, offset)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
