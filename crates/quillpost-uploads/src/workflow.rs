use std::path::{Path, PathBuf};
use std::sync::Arc;

use quillpost_engine::{
    EngineError, ImageNode, PlaceholderAction, PlaceholderPlugin, UploadId,
};
use tokio::task::JoinHandle;

use crate::shared::SharedEditor;
use crate::transfer::{Transfer, TransferError};

/// How one upload workflow resolved. Exactly one outcome per workflow.
#[derive(Debug)]
pub enum UploadOutcome {
    /// Transfer succeeded; an image node was inserted at the marker's
    /// resolved position and the marker removed.
    Inserted { pos: usize, url: String },
    /// The marker was independently removed before the transfer settled;
    /// nothing was inserted.
    Cancelled,
    /// Transfer failed; the marker was removed and nothing inserted.
    TransferFailed(TransferError),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("caret at {pos} does not accept inline content")]
    CaretRejectsInline { pos: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Run one upload workflow to completion.
///
/// Places a placeholder at the caret (deleting any selection first), awaits
/// the transfer, then resolves against the *latest* editor state: the marker
/// may have shifted under intervening edits, or be gone entirely. The editor
/// lock is never held across the transfer await.
///
/// The failure path also re-derives its cleanup transaction from the latest
/// state rather than reusing the pre-transfer one; a stale transaction would
/// be rejected once intervening edits land, and a metadata-only removal is
/// position-free either way.
pub async fn start_upload(
    editor: &SharedEditor,
    transfer: &dyn Transfer,
    file: &Path,
) -> Result<UploadOutcome, UploadError> {
    let id = UploadId::fresh();

    {
        let mut ed = editor.lock();
        let caret = ed.document().selection().start;
        if !ed.document().accepts_inline_at(caret) {
            return Err(UploadError::CaretRejectsInline { pos: caret });
        }

        let mut tx = ed.transaction();
        tx.delete_selection();
        let pos = tx.selection_from();
        tx.set_meta::<PlaceholderPlugin>(PlaceholderAction::Add { id, pos });
        ed.dispatch(tx)?;
        log::info!("upload {id}: placeholder at {pos} for {}", file.display());
    }

    match transfer.upload(file).await {
        Ok(url) => {
            let mut ed = editor.lock();
            let Some(pos) = PlaceholderPlugin::find(&ed, id) else {
                log::info!("upload {id}: placeholder gone, dropping result");
                return Ok(UploadOutcome::Cancelled);
            };

            let mut tx = ed.transaction();
            tx.replace_with(pos, pos, ImageNode::new(url.clone()));
            tx.set_meta::<PlaceholderPlugin>(PlaceholderAction::Remove { id });
            ed.dispatch(tx)?;
            log::info!("upload {id}: image inserted at {pos}");
            Ok(UploadOutcome::Inserted { pos, url })
        }
        Err(err) => {
            let mut ed = editor.lock();
            let mut tx = ed.transaction();
            tx.set_meta::<PlaceholderPlugin>(PlaceholderAction::Remove { id });
            ed.dispatch(tx)?;
            log::warn!("upload {id}: transfer failed: {err}");
            Ok(UploadOutcome::TransferFailed(err))
        }
    }
}

/// Start one workflow per selected file, each as its own task with its own
/// identity.
pub fn spawn_uploads(
    editor: &SharedEditor,
    transfer: Arc<dyn Transfer>,
    files: Vec<PathBuf>,
) -> Vec<JoinHandle<Result<UploadOutcome, UploadError>>> {
    files
        .into_iter()
        .map(|file| {
            let editor = editor.clone();
            let transfer = Arc::clone(&transfer);
            tokio::spawn(async move { start_upload(&editor, transfer.as_ref(), &file).await })
        })
        .collect()
}
