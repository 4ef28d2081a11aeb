use std::borrow::Cow;
use std::ops::Range;

use xi_rope::Rope;

use crate::editing::EngineError;

/// Core document state: a rope buffer, the selection, and a version counter.
///
/// The buffer is the single source of truth. All positions handed to or
/// returned from the editing core are byte offsets into it. The version
/// counter increments on every applied transaction and is what ties a
/// `Transaction` to the state it was built against.
#[derive(Clone)]
pub struct Document {
    /// Entire document as UTF-8 text
    pub(crate) buffer: Rope,
    /// Current selection as byte offsets; empty range means a caret
    pub(crate) selection: Range<usize>,
    /// Incremented on each applied transaction
    pub(crate) version: u64,
}

impl Document {
    /// Create an empty document with the caret at offset 0.
    pub fn new() -> Self {
        Self {
            buffer: Rope::from(""),
            selection: 0..0,
            version: 0,
        }
    }

    /// Create a document from raw bytes. The caret starts at the end.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);
        let len = buffer.len();

        Ok(Self {
            buffer,
            selection: len..len,
            version: 0,
        })
    }

    /// Get the current text content.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Get the document's content as raw bytes (exact round-trip).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Get the current selection range.
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Set the selection. Both endpoints must lie on character boundaries
    /// within the document.
    pub fn set_selection(&mut self, selection: Range<usize>) -> Result<(), EngineError> {
        let len = self.len();
        if selection.start > selection.end || selection.end > len {
            return Err(EngineError::SelectionOutOfBounds {
                start: selection.start,
                end: selection.end,
                len,
            });
        }
        let text = self.slice_to_cow(0..len);
        for pos in [selection.start, selection.end] {
            if !text.is_char_boundary(pos) {
                return Err(EngineError::NotCharBoundary { pos });
            }
        }
        self.selection = selection;
        Ok(())
    }

    /// Get the current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether inline content can be placed at `pos`: the offset is inside
    /// the document, on a character boundary, and not inside a fenced code
    /// block (fences hold literal text, not inline atoms). Hosts check this
    /// before starting an upload at the caret.
    pub fn accepts_inline_at(&self, pos: usize) -> bool {
        if pos > self.len() {
            return false;
        }
        let text = self.slice_to_cow(0..self.len());
        if !text.is_char_boundary(pos) {
            return false;
        }
        let mut in_fence = false;
        for line in text[..pos].lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }
        }
        !in_fence
    }

    /// Slice the buffer to a cow string, clamped to document bounds.
    pub(crate) fn slice_to_cow(&self, range: Range<usize>) -> Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Rope nodes don't implement PartialEq; compare content as strings
        self.buffer.to_string() == other.buffer.to_string()
            && self.selection == other.selection
            && self.version == other.version
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.len())
            .field("selection", &self.selection)
            .field("version", &self.version)
            .finish()
    }
}
