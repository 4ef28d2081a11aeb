/*!
 * Asynchronous upload workflow over the quillpost editing core.
 *
 * The workflow places a placeholder marker at the caret, performs a
 * single-shot byte transfer, and on completion either materializes an image
 * node at the marker's (possibly shifted) position or cleans the marker up.
 * Multiple workflows may be in flight concurrently; each one is correlated
 * by its own [`UploadId`](quillpost_engine::UploadId).
 */

pub mod shared;
pub mod transfer;
pub mod workflow;

pub use shared::SharedEditor;
pub use transfer::{DataUrlTransfer, Transfer, TransferError};
pub use workflow::{spawn_uploads, start_upload, UploadError, UploadOutcome};
