/*!
 * # Editing Core Module
 *
 * The editing system is a small rope-based editor core with a plugin slot
 * for derived state. It exists to host transient per-document state (the
 * placeholder tracker) that must survive concurrent edits while an upload
 * is in flight.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - The entire document is stored in a single `xi_rope::Rope` buffer
 * - All positions are byte offsets into that buffer
 * - Content nodes (images) materialize as inline Markdown text, so saving
 *   writes rope bytes verbatim with no separate model to re-serialize
 *
 * ### 2. Transaction-Based Editing
 * - All edits are **Transactions**: ordered replace operations compiled to
 *   a single xi-rope **Delta** and applied atomically
 * - A transaction is bound to the document version it was built against;
 *   dispatching it after an intervening edit is rejected as stale
 * - Each transaction exposes a **Mapping** that translates any pre-edit
 *   byte offset to its post-edit equivalent
 *
 * ### 3. Plugin Slots with Reducer Hooks
 * - Plugins contribute `init`/`apply` reducers; the editor folds every
 *   registered plugin's state through each dispatched transaction
 * - Transactions carry a typed per-plugin metadata payload, the channel a
 *   call site uses to hand intent to the reducer
 *
 * ### 4. Placeholder Tracking
 * - The placeholder plugin keeps one marker per in-flight upload, remapped
 *   through every transaction so the marker tracks edits made while the
 *   upload is pending
 * - A read-only decoration projection tells hosts where to draw pending
 *   upload widgets
 *
 * ## Usage Pattern
 *
 * ```rust
 * use quillpost_engine::{Document, Editor, PlaceholderPlugin};
 *
 * let mut editor = Editor::new(Document::from_bytes(b"hello").unwrap());
 * editor.register(PlaceholderPlugin);
 *
 * let mut tx = editor.transaction();
 * tx.insert_text(5, " world");
 * let patch = editor.dispatch(tx).unwrap();
 * assert_eq!(patch.version, 1);
 * ```
 */

pub mod document;
pub mod editor;
pub mod node;
pub mod placeholder;
pub mod plugin;
pub mod transaction;

// Public API re-exports
pub use document::Document;
pub use editor::{Editor, Patch};
pub use node::ImageNode;
pub use placeholder::{
    Decoration, PlaceholderAction, PlaceholderMarker, PlaceholderPlugin, PlaceholderState, UploadId,
};
pub use plugin::Plugin;
pub use transaction::{Mapping, Transaction};

/// Errors surfaced by the editing core.
///
/// Transactions are validated before any state changes: a failed dispatch
/// leaves the document, selection, and every plugin state untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("transaction built against version {built_against}, document is at {current}")]
    StaleTransaction { built_against: u64, current: u64 },

    #[error("edit range {start}..{end} is outside the document (len {len})")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("position {pos} is not a character boundary")]
    NotCharBoundary { pos: usize },

    #[error("edit at {pos} starts before the end of an earlier edit in the same transaction")]
    UnorderedEdit { pos: usize },

    #[error("selection {start}..{end} is outside the document (len {len})")]
    SelectionOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },
}
