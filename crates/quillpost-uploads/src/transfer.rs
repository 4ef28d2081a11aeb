use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Why a byte transfer could not complete.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is {size} bytes, over the {max} byte upload limit")]
    TooLarge { path: PathBuf, size: u64, max: u64 },
}

/// Single-shot asynchronous byte transfer: read the selected file and yield
/// an opaque resource locator, or fail. No progress events, no cancellation.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn upload(&self, file: &Path) -> Result<String, TransferError>;
}

/// Transfer that encodes the file into a `data:` URL.
///
/// Stands in for a real upload service: the file is read locally and the
/// locator embeds its bytes. Optionally enforces a size ceiling and delays
/// before reading (a demo knob, off by default).
pub struct DataUrlTransfer {
    max_bytes: Option<u64>,
    startup_delay: Duration,
}

impl DataUrlTransfer {
    pub fn new() -> Self {
        Self {
            max_bytes: None,
            startup_delay: Duration::ZERO,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }
}

impl Default for DataUrlTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transfer for DataUrlTransfer {
    async fn upload(&self, file: &Path) -> Result<String, TransferError> {
        if !self.startup_delay.is_zero() {
            tokio::time::sleep(self.startup_delay).await;
        }

        let unreadable = |source| TransferError::Unreadable {
            path: file.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(file).await.map_err(unreadable)?;
        if let Some(max) = self.max_bytes
            && metadata.len() > max
        {
            return Err(TransferError::TooLarge {
                path: file.to_path_buf(),
                size: metadata.len(),
                max,
            });
        }

        let bytes = tokio::fs::read(file).await.map_err(unreadable)?;
        log::debug!("encoded {} bytes from {}", bytes.len(), file.display());
        Ok(format!(
            "data:{};base64,{}",
            mime_for(file),
            STANDARD.encode(&bytes)
        ))
    }
}

fn mime_for(file: &Path) -> &'static str {
    match file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
