use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::editor::Editor;
use crate::editing::plugin::Plugin;
use crate::editing::transaction::{Mapping, Transaction};

/// Opaque identity token correlating an upload's start, its placeholder
/// marker, and its eventual resolution. Compared by value; never derived
/// from a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// A token distinguishable from every other token in the session.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Intent handed from an upload call site to the placeholder reducer via
/// transaction metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderAction {
    /// Register a marker for `id`. The position is a byte offset in the
    /// post-transaction document and is taken as-is, not remapped.
    Add { id: UploadId, pos: usize },
    /// Drop the marker for `id`. Removing an absent id is a no-op.
    Remove { id: UploadId },
}

/// One pending upload: where its placeholder currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderMarker {
    pub id: UploadId,
    pub pos: usize,
}

/// Tracker state: every in-flight upload's marker, in insertion order.
///
/// Positions are live: the reducer remaps them through each transaction, so
/// a lookup never returns an offset the document has since edited away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderState {
    markers: Vec<PlaceholderMarker>,
}

impl PlaceholderState {
    /// Current position of `id`'s marker. `None` means the counterpart
    /// removal already ran; callers must treat that as "do not insert".
    pub fn find(&self, id: UploadId) -> Option<usize> {
        self.markers.iter().find(|m| m.id == id).map(|m| m.pos)
    }

    pub fn markers(&self) -> &[PlaceholderMarker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Read-only projection of one marker for host rendering: draw a pending
/// upload widget at `pos`. A pure function of tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub pos: usize,
    pub id: UploadId,
}

/// Tracks zero or more pending-upload placeholders across edits.
///
/// The reducer first remaps every marker through the transaction's mapping,
/// then folds in the transaction's [`PlaceholderAction`], if any. Positions
/// map with `after = true`: an insertion at a marker's exact offset pushes
/// the marker past the inserted text.
pub struct PlaceholderPlugin;

impl PlaceholderPlugin {
    /// Convenience lookup against a live editor.
    pub fn find(editor: &Editor, id: UploadId) -> Option<usize> {
        editor
            .plugin_state::<PlaceholderPlugin>()
            .and_then(|state| state.find(id))
    }

    /// Decorations for every pending upload, ordered by position.
    pub fn decorations(editor: &Editor) -> Vec<Decoration> {
        let mut decorations: Vec<Decoration> = editor
            .plugin_state::<PlaceholderPlugin>()
            .map(|state| {
                state
                    .markers()
                    .iter()
                    .map(|m| Decoration { pos: m.pos, id: m.id })
                    .collect()
            })
            .unwrap_or_default();
        decorations.sort_by_key(|d| d.pos);
        decorations
    }
}

impl Plugin for PlaceholderPlugin {
    type State = PlaceholderState;
    type Meta = PlaceholderAction;

    fn init(&self) -> PlaceholderState {
        PlaceholderState::default()
    }

    fn apply(
        &self,
        tx: &Transaction,
        mapping: &Mapping,
        mut state: PlaceholderState,
    ) -> PlaceholderState {
        for marker in &mut state.markers {
            marker.pos = mapping.map(marker.pos, true);
        }

        match tx.meta::<PlaceholderPlugin>() {
            Some(&PlaceholderAction::Add { id, pos }) => {
                log::debug!("placeholder {id}: added at {pos}");
                state.markers.push(PlaceholderMarker { id, pos });
            }
            Some(&PlaceholderAction::Remove { id }) => {
                log::debug!("placeholder {id}: removed");
                state.markers.retain(|m| m.id != id);
            }
            None => {}
        }

        state
    }
}
