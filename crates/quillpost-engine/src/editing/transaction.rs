use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::Range;

use xi_rope::delta::{Builder, Transformer};
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::document::Document;
use crate::editing::node::ImageNode;
use crate::editing::plugin::Plugin;
use crate::editing::EngineError;

/// An atomic, appliable description of a document edit.
///
/// A transaction records replace operations against the document state it
/// was built from, plus an optional metadata payload per plugin. Dispatching
/// it compiles the operations to a single delta, applies that delta to the
/// buffer, and hands the transaction (with its derived [`Mapping`]) to every
/// plugin reducer.
///
/// Operations must be recorded front-to-back: each one has to start at or
/// after the end of the previous one. The builder methods below keep that
/// contract for the common flows (delete the selection, then place content
/// at the collapsed caret).
pub struct Transaction {
    pub(crate) base_len: usize,
    pub(crate) base_version: u64,
    /// Selection as this transaction sees it; collapses on `delete_selection`
    selection: Range<usize>,
    ops: Vec<ReplaceOp>,
    /// Explicit selection for after the edit; remapped old selection otherwise
    selection_after: Option<Range<usize>>,
    meta: HashMap<TypeId, Box<dyn Any + Send>>,
}

#[derive(Debug, Clone)]
struct ReplaceOp {
    range: Range<usize>,
    text: String,
}

impl Transaction {
    pub(crate) fn new(doc: &Document) -> Self {
        Self {
            base_len: doc.len(),
            base_version: doc.version(),
            selection: doc.selection(),
            ops: Vec::new(),
            selection_after: None,
            meta: HashMap::new(),
        }
    }

    /// Start of the selection as seen by this transaction. After
    /// [`delete_selection`](Self::delete_selection) this is the single point
    /// the deleted range collapsed to.
    pub fn selection_from(&self) -> usize {
        self.selection.start
    }

    /// Delete the selected range, collapsing the selection to its start.
    /// A caret (empty selection) makes this a no-op.
    pub fn delete_selection(&mut self) -> &mut Self {
        if !self.selection.is_empty() {
            self.ops.push(ReplaceOp {
                range: self.selection.clone(),
                text: String::new(),
            });
            self.selection = self.selection.start..self.selection.start;
        }
        self
    }

    /// Insert text at a byte offset.
    pub fn insert_text(&mut self, at: usize, text: impl Into<String>) -> &mut Self {
        self.ops.push(ReplaceOp {
            range: at..at,
            text: text.into(),
        });
        self
    }

    /// Replace the range `from..to` with an inline image node.
    pub fn replace_with(&mut self, from: usize, to: usize, node: ImageNode) -> &mut Self {
        self.ops.push(ReplaceOp {
            range: from..to,
            text: node.to_markdown(),
        });
        self
    }

    /// Delete the range `from..to`.
    pub fn delete_range(&mut self, from: usize, to: usize) -> &mut Self {
        self.ops.push(ReplaceOp {
            range: from..to,
            text: String::new(),
        });
        self
    }

    /// Set the selection the document should have after this transaction,
    /// instead of remapping the old one through the edit.
    pub fn set_selection_after(&mut self, selection: Range<usize>) -> &mut Self {
        self.selection_after = Some(selection);
        self
    }

    pub(crate) fn selection_after(&self) -> Option<Range<usize>> {
        self.selection_after.clone()
    }

    /// Attach plugin metadata to this transaction. The payload is the intent
    /// channel between a call site and plugin `P`'s reducer; it does not edit
    /// the document by itself.
    pub fn set_meta<P: Plugin>(&mut self, meta: P::Meta) -> &mut Self {
        self.meta.insert(TypeId::of::<P>(), Box::new(meta));
        self
    }

    /// Read back the metadata attached for plugin `P`, if any.
    pub fn meta<P: Plugin>(&self) -> Option<&P::Meta> {
        self.meta
            .get(&TypeId::of::<P>())
            .and_then(|payload| payload.downcast_ref::<P::Meta>())
    }

    /// True when the transaction carries no edit operations (it may still
    /// carry metadata).
    pub fn is_empty_change(&self) -> bool {
        self.ops.is_empty()
    }

    /// Compile the recorded operations into a delta against `doc`'s buffer.
    /// Validates bounds, character boundaries, and operation order before
    /// anything is applied.
    pub(crate) fn compile(&self, doc: &Document) -> Result<Delta<RopeInfo>, EngineError> {
        // The version check in dispatch guarantees doc is the state this
        // transaction was built against
        let len = self.base_len;
        let text = doc.slice_to_cow(0..len);
        let mut builder = Builder::new(len);
        let mut last_end = 0usize;

        for op in &self.ops {
            if op.range.start > op.range.end || op.range.end > len {
                return Err(EngineError::RangeOutOfBounds {
                    start: op.range.start,
                    end: op.range.end,
                    len,
                });
            }
            if op.range.start < last_end {
                return Err(EngineError::UnorderedEdit {
                    pos: op.range.start,
                });
            }
            for pos in [op.range.start, op.range.end] {
                if !text.is_char_boundary(pos) {
                    return Err(EngineError::NotCharBoundary { pos });
                }
            }
            builder.replace(op.range.clone(), Rope::from(op.text.as_str()));
            last_end = op.range.end;
        }

        Ok(builder.build())
    }
}

/// The position-remapping function derived from one transaction's edits.
///
/// Translates any byte offset valid before the transaction into its
/// equivalent offset afterwards. `after` picks the side for positions that
/// land exactly on an insertion point: `true` places them after the inserted
/// text, `false` before it. Positions inside a deleted range collapse to the
/// deletion start.
pub struct Mapping {
    delta: Delta<RopeInfo>,
}

impl Mapping {
    pub(crate) fn new(delta: Delta<RopeInfo>) -> Self {
        Self { delta }
    }

    pub fn map(&self, pos: usize, after: bool) -> usize {
        let mut transformer = Transformer::new(&self.delta);
        transformer.transform(pos, after)
    }
}
