//! # Range Editor
//!
//! Turns a set of `(range, replacement)` edits computed against one buffer
//! snapshot into a single compound edit.
//!
//! ## Ordering
//!
//! Edits are applied from the end of the buffer towards the start, so an
//! edit never invalidates the offsets of the edits still waiting:
//!
//! ```text
//! start descending → wider range first → later input first
//! ```
//!
//! The last rule keeps same-offset insertions in input order.
//!
//! ## Offset mapping
//!
//! After application, [`CompoundEdit::map_range`] carries a range from the
//! old buffer into the new one. Text inserted exactly at a range's start
//! pushes the range right; text inserted exactly at its end stays outside.

use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use trellis_common::SourceRange;
use trellis_parser::LineIndex;

/// One replacement. `new_text: None` deletes the range; a zero-width range
/// inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeEdit {
    pub range: SourceRange,
    pub new_text: Option<String>,
}

impl RangeEdit {
    pub fn delete(range: SourceRange) -> Self {
        Self { range, new_text: None }
    }

    pub fn insert(at: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range: SourceRange {
                end_offset: at.start_offset,
                end_line: at.start_line,
                end_col: at.start_col,
                ..at
            },
            new_text: Some(text.into()),
        }
    }

    pub fn replace(range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: Some(text.into()),
        }
    }

    pub fn start(&self) -> usize {
        self.range.start_offset
    }

    pub fn end(&self) -> usize {
        self.range.end_offset
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    fn text_len(&self) -> usize {
        self.new_text.as_ref().map(String::len).unwrap_or(0)
    }

    fn delta(&self) -> isize {
        self.text_len() as isize - self.range.len() as isize
    }
}

/// Validated, non-overlapping edits against one buffer snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundEdit {
    edits: Vec<RangeEdit>,
    /// Indices into `edits`, in application order
    order: Vec<usize>,
}

impl CompoundEdit {
    /// Validate `edits` against `source`.
    ///
    /// Every range must lie inside the buffer on character boundaries with
    /// line/column fields agreeing with its offsets, and no two ranges may
    /// overlap. Nothing is applied if any check fails.
    pub fn new(edits: Vec<RangeEdit>, source: &str) -> Result<Self, EditorError> {
        let lines = LineIndex::new(source);

        for edit in &edits {
            let (start, end) = edit.range.span();
            if start > end || end > source.len() {
                return Err(EditorError::invalid_target(format!(
                    "range {}..{} outside buffer of {} bytes",
                    start,
                    end,
                    source.len()
                )));
            }
            if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
                return Err(EditorError::invalid_target(format!(
                    "range {}..{} splits a character",
                    start, end
                )));
            }
            if lines.range(start, end) != edit.range {
                return Err(EditorError::invalid_target(format!(
                    "line/column of range {}..{} do not match the buffer",
                    start, end
                )));
            }
        }

        for (i, a) in edits.iter().enumerate() {
            for b in &edits[i + 1..] {
                if a.range.overlaps(&b.range) {
                    return Err(EditorError::OverlappingEdit(format!(
                        "{}..{} overlaps {}..{}",
                        a.start(),
                        a.end(),
                        b.start(),
                        b.end()
                    )));
                }
            }
        }

        let mut order: Vec<usize> = (0..edits.len()).collect();
        order.sort_by(|&i, &j| {
            let (a, b) = (&edits[i], &edits[j]);
            b.start()
                .cmp(&a.start())
                .then(b.end().cmp(&a.end()))
                .then(j.cmp(&i))
        });

        Ok(Self { edits, order })
    }

    pub fn edits(&self) -> &[RangeEdit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Net change in buffer length
    pub fn delta(&self) -> isize {
        self.edits.iter().map(RangeEdit::delta).sum()
    }

    /// Edits in the order they are applied
    pub fn application_order(&self) -> impl Iterator<Item = &RangeEdit> {
        self.order.iter().map(|&i| &self.edits[i])
    }

    /// Produce the edited text
    pub fn apply_to(&self, source: &str) -> String {
        let mut output = source.to_string();
        for edit in self.application_order() {
            let replacement = edit.new_text.as_deref().unwrap_or("");
            output.replace_range(edit.start()..edit.end(), replacement);
        }
        output
    }

    /// Where a range of the old buffer ends up in the new one.
    ///
    /// Returns `None` when an edit deletes or replaces text across the
    /// range's start or end, i.e. the range did not survive intact.
    pub fn map_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let mut start_shift: isize = 0;
        let mut end_shift: isize = 0;

        for edit in &self.edits {
            let (a, b) = (edit.start(), edit.end());
            if b <= start {
                start_shift += edit.delta();
                end_shift += edit.delta();
            } else if a >= end {
                continue;
            } else if a > start && b <= end {
                end_shift += edit.delta();
            } else {
                return None;
            }
        }

        Some((shift(start, start_shift)?, shift(end, end_shift)?))
    }

    /// Where an old-buffer offset ends up, treating it as the start of a node
    pub fn map_offset(&self, offset: usize) -> Option<usize> {
        self.map_range(offset, offset).map(|(start, _)| start)
    }

    /// Offset in the new buffer where the text of `edits()[index]` begins
    pub fn new_offset_of(&self, index: usize) -> Option<usize> {
        let target = self.edits.get(index)?;
        let at = target.start();
        let mut delta: isize = 0;

        for (j, edit) in self.edits.iter().enumerate() {
            if j == index || edit.end() > at {
                continue;
            }
            let counted = if edit.is_insertion() && edit.start() == at {
                !target.is_insertion() || j < index
            } else {
                true
            };
            if counted {
                delta += edit.delta();
            }
        }

        shift(at, delta)
    }
}

fn shift(offset: usize, delta: isize) -> Option<usize> {
    let shifted = offset as isize + delta;
    (shifted >= 0).then_some(shifted as usize)
}
