use std::sync::{Arc, Mutex, MutexGuard};

use quillpost_engine::Editor;

/// Editor handle shared between the host and in-flight upload tasks.
///
/// The lock serializes transaction application; upload tasks take it only
/// for their synchronous sections and never hold it across the transfer
/// await, so concurrent uploads interleave at the suspension point.
#[derive(Clone)]
pub struct SharedEditor(Arc<Mutex<Editor>>);

impl SharedEditor {
    pub fn new(editor: Editor) -> Self {
        Self(Arc::new(Mutex::new(editor)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Editor> {
        // A panicked holder cannot leave a half-applied transaction behind
        // (dispatch validates before mutating), so recover from poisoning
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with the editor locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        f(&mut self.lock())
    }
}
