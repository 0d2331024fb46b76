//! Attachment bridge: turns a message's attachment ids into one block of
//! document text for the responder prompt.

use std::sync::Arc;

use sb_store::{BlobStore, TextExtractor};

pub struct AttachmentBridge {
    extractor: Arc<dyn TextExtractor>,
    blobs: Arc<dyn BlobStore>,
    cleanup: bool,
}

impl AttachmentBridge {
    pub fn new(extractor: Arc<dyn TextExtractor>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            extractor,
            blobs,
            cleanup: true,
        }
    }

    /// Whether blobs are deleted once their exchange is over.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Resolve `ids` in order. `None` when there are no attachments.
    ///
    /// An attachment that cannot be extracted is replaced by an inline
    /// marker naming it, so the rest of the documents still reach the
    /// responder.
    pub async fn resolve(&self, ids: &[String]) -> Option<String> {
        if ids.is_empty() {
            return None;
        }

        let mut text = String::new();
        for id in ids {
            match self.extractor.extract_text(id).await {
                Ok(content) => {
                    text.push_str(&format!(
                        "\n\n--- Document Content ({id}) ---\n{content}\n--- End of Document ---\n"
                    ));
                }
                Err(e) => {
                    tracing::warn!(file_id = %id, error = %e, "attachment extraction failed");
                    text.push_str(&format!("\n\n[attachment {id} unavailable: {e}]\n"));
                }
            }
        }
        Some(text)
    }

    /// Delete the blobs behind `ids`. Failures are logged, never raised.
    pub async fn cleanup(&self, ids: &[String]) {
        if !self.cleanup {
            return;
        }
        for id in ids {
            if let Err(e) = self.blobs.delete(id).await {
                tracing::warn!(file_id = %id, error = %e, "failed to delete attachment");
            }
        }
    }
}
