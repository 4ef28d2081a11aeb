use std::any::TypeId;
use std::ops::Range;

use xi_rope::delta::DeltaElement;

use crate::editing::document::Document;
use crate::editing::plugin::{Plugin, PluginSlot};
use crate::editing::transaction::{Mapping, Transaction};
use crate::editing::EngineError;

/// Result of dispatching a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Byte ranges (in post-edit coordinates) filled with new content
    pub changed: Vec<Range<usize>>,
    /// Selection after the edit
    pub new_selection: Range<usize>,
    /// Document version after the edit
    pub version: u64,
}

/// The editor: a document plus the registered plugin slots.
///
/// All edits flow through [`dispatch`](Self::dispatch), which serializes
/// transaction application: validate, apply the delta, remap the selection,
/// fold every plugin reducer, bump the version. A rejected transaction
/// changes nothing.
pub struct Editor {
    doc: Document,
    plugins: Vec<PluginSlot>,
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            plugins: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Set the selection directly (host-side caret movement, no transaction).
    pub fn set_selection(&mut self, selection: Range<usize>) -> Result<(), EngineError> {
        self.doc.set_selection(selection)
    }

    /// Register a plugin and initialize its state slot. Registering the same
    /// plugin type twice keeps the first slot.
    pub fn register<P: Plugin>(&mut self, plugin: P) {
        if self.plugins.iter().any(|s| s.key == TypeId::of::<P>()) {
            log::warn!("plugin {} already registered", std::any::type_name::<P>());
            return;
        }
        let slot = PluginSlot::new(plugin);
        log::debug!("registered plugin {}", slot.name);
        self.plugins.push(slot);
    }

    /// Current state of plugin `P`, if registered.
    pub fn plugin_state<P: Plugin>(&self) -> Option<&P::State> {
        self.plugins
            .iter()
            .find(|s| s.key == TypeId::of::<P>())?
            .state
            .downcast_ref::<P::State>()
    }

    /// Start a transaction against the current document state.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(&self.doc)
    }

    /// Apply a transaction.
    ///
    /// Pipeline: reject stale transactions, compile the operations to a
    /// delta (validating bounds and boundaries), apply the delta to the
    /// buffer, remap or replace the selection, run every plugin reducer with
    /// the transaction and its mapping, bump the version.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<Patch, EngineError> {
        if tx.base_version != self.doc.version() {
            return Err(EngineError::StaleTransaction {
                built_against: tx.base_version,
                current: self.doc.version(),
            });
        }

        let delta = tx.compile(&self.doc)?;

        // Inserted ranges in post-edit coordinates
        let mut changed = Vec::new();
        let mut new_pos = 0;
        for el in delta.els.iter() {
            match el {
                DeltaElement::Copy(from, to) => {
                    new_pos += to - from;
                }
                DeltaElement::Insert(inserted) => {
                    changed.push(new_pos..new_pos + inserted.len());
                    new_pos += inserted.len();
                }
            }
        }

        // new_pos is now the post-edit document length; validate the explicit
        // selection against it before any state changes
        if let Some(sel) = tx.selection_after()
            && (sel.start > sel.end || sel.end > new_pos)
        {
            return Err(EngineError::SelectionOutOfBounds {
                start: sel.start,
                end: sel.end,
                len: new_pos,
            });
        }

        self.doc.buffer = delta.apply(&self.doc.buffer);
        let mapping = Mapping::new(delta);

        let new_selection = match tx.selection_after() {
            Some(sel) => sel,
            None => {
                let old = self.doc.selection();
                mapping.map(old.start, false)..mapping.map(old.end, false)
            }
        };
        self.doc.selection = new_selection.clone();

        for slot in &mut self.plugins {
            slot.run(&tx, &mapping);
        }

        self.doc.version += 1;
        log::debug!(
            "dispatched transaction: {} change(s), version {}",
            changed.len(),
            self.doc.version
        );

        Ok(Patch {
            changed,
            new_selection,
            version: self.doc.version,
        })
    }
}
