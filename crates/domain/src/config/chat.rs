use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat exchange settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum wait for the next streamed fragment. `None` (the default)
    /// means no bound: an upstream that neither completes nor errors keeps
    /// its exchange open until the client disconnects.
    #[serde(default)]
    pub stream_idle_timeout_secs: Option<u64>,
    /// Capacity of each session's outbound frame channel.
    #[serde(default = "d_channel_capacity")]
    pub channel_capacity: usize,
    /// Inbound WebSocket text frames larger than this are rejected with an
    /// error frame.
    #[serde(default = "d_max_inbound_bytes")]
    pub max_inbound_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stream_idle_timeout_secs: None,
            channel_capacity: d_channel_capacity(),
            max_inbound_bytes: d_max_inbound_bytes(),
        }
    }
}

fn d_channel_capacity() -> usize {
    64
}
fn d_max_inbound_bytes() -> usize {
    256 * 1024
}
