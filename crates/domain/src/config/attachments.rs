use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Attachments (temp-directory blob store)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Directory holding uploaded files, one file per attachment id.
    #[serde(default = "d_dir")]
    pub dir: PathBuf,
    /// Upload size limit in bytes.
    #[serde(default = "d_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Delete an exchange's attachments once its answer has been persisted.
    #[serde(default = "d_true")]
    pub cleanup_after_exchange: bool,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            dir: d_dir(),
            max_upload_bytes: d_max_upload_bytes(),
            cleanup_after_exchange: true,
        }
    }
}

fn d_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}
fn d_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn d_true() -> bool {
    true
}
