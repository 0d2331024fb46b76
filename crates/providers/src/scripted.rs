//! Deterministic in-process provider for tests and offline runs.
//!
//! Replies are queued per call kind: [`ScriptedProvider::with_reply`] feeds
//! `complete_once`, [`ScriptedProvider::with_stream`] feeds
//! `complete_streaming`. An exhausted queue fails the call with `Upstream`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use sb_domain::error::{Error, Result};
use sb_domain::stream::FragmentStream;

/// One scripted backend behaviour.
#[derive(Debug, Clone)]
pub enum Script {
    /// The whole answer; streamed as one fragment.
    Text(String),
    /// Streamed fragment by fragment; concatenated for one-shot calls.
    Fragments(Vec<String>),
    /// Streams the fragments, then fails mid-stream with the message.
    FailAfter(Vec<String>, String),
    /// Fails before any output.
    Fail(String),
    /// Streams the fragments, then never produces another item.
    Stall(Vec<String>),
}

pub struct ScriptedProvider {
    id: String,
    replies: Mutex<VecDeque<Script>>,
    streams: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
    fragment_delay: Option<Duration>,
    once_calls: AtomicUsize,
    live_streams: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            replies: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fragment_delay: None,
            once_calls: AtomicUsize::new(0),
            live_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_reply(self, script: Script) -> Self {
        self.push_reply(script);
        self
    }

    pub fn with_stream(self, script: Script) -> Self {
        self.push_stream(script);
        self
    }

    /// Sleep before each streamed fragment.
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    pub fn push_reply(&self, script: Script) {
        self.replies.lock().push_back(script);
    }

    pub fn push_stream(&self, script: Script) {
        self.streams.lock().push_back(script);
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn once_calls(&self) -> usize {
        self.once_calls.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet dropped.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    fn exhausted(&self) -> Error {
        Error::Upstream {
            provider: self.id.clone(),
            message: "no scripted reply left".into(),
        }
    }

    fn failure(&self, message: String) -> Error {
        Error::Upstream {
            provider: self.id.clone(),
            message,
        }
    }
}

/// Decrements the live-stream counter when the stream is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete_once(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.once_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(req);
        let script = self.replies.lock().pop_front();
        let content = match script {
            None => return Err(self.exhausted()),
            Some(Script::Text(text)) => text,
            Some(Script::Fragments(parts)) => parts.concat(),
            Some(Script::FailAfter(_, message)) | Some(Script::Fail(message)) => {
                return Err(self.failure(message))
            }
            Some(Script::Stall(_)) => std::future::pending().await,
        };
        Ok(ChatResponse {
            content,
            model: "scripted".into(),
            finish_reason: Some("stop".into()),
        })
    }

    async fn complete_streaming(&self, req: ChatRequest) -> Result<FragmentStream> {
        self.requests.lock().push(req);
        let script = self.streams.lock().pop_front();
        let (fragments, tail) = match script {
            None => return Err(self.exhausted()),
            Some(Script::Fail(message)) => return Err(self.failure(message)),
            Some(Script::Text(text)) => (vec![text], None),
            Some(Script::Fragments(parts)) => (parts, None),
            Some(Script::FailAfter(parts, message)) => (parts, Some(Some(message))),
            Some(Script::Stall(parts)) => (parts, Some(None)),
        };

        self.live_streams.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(self.live_streams.clone());
        let delay = self.fragment_delay;
        let provider = self.id.clone();

        let stream = async_stream::stream! {
            let _guard = guard;
            for fragment in fragments {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if !fragment.is_empty() {
                    yield Ok(fragment);
                }
            }
            match tail {
                None => {}
                Some(Some(message)) => yield Err(Error::Upstream { provider, message }),
                Some(None) => std::future::pending::<()>().await,
            }
        };
        Ok(Box::pin(stream))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
