//! Presents a non-streaming backend through the streaming contract.

use std::sync::Arc;

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use sb_domain::error::Result;
use sb_domain::stream::FragmentStream;

/// Wraps a provider whose backend cannot stream.
///
/// `complete_streaming` returns immediately; the wrapped `complete_once`
/// call starts on the first poll and its answer is yielded as one fragment
/// (none when the answer is empty).
pub struct BufferedProvider {
    inner: Arc<dyn LlmProvider>,
}

impl BufferedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl LlmProvider for BufferedProvider {
    async fn complete_once(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.inner.complete_once(req).await
    }

    async fn complete_streaming(&self, req: ChatRequest) -> Result<FragmentStream> {
        let inner = self.inner.clone();
        let stream = async_stream::try_stream! {
            let resp = inner.complete_once(req).await?;
            if !resp.content.is_empty() {
                yield resp.content;
            }
        };
        Ok(Box::pin(stream))
    }

    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    fn supports_streaming(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Script, ScriptedProvider};
    use futures_util::StreamExt;
    use sb_domain::message::Message;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn full_answer_is_one_fragment() {
        let inner = Arc::new(
            ScriptedProvider::new("legacy").with_reply(Script::Text("whole answer".into())),
        );
        let buffered = BufferedProvider::new(inner);
        let out: Vec<_> = buffered
            .complete_streaming(request())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "whole answer");
        assert!(!buffered.supports_streaming());
    }

    #[tokio::test]
    async fn empty_answer_is_zero_fragments() {
        let inner = Arc::new(ScriptedProvider::new("legacy").with_reply(Script::Text(String::new())));
        let buffered = BufferedProvider::new(inner);
        let stream = buffered.complete_streaming(request()).await.unwrap();
        assert_eq!(stream.count().await, 0);
    }

    #[tokio::test]
    async fn backend_call_waits_for_first_poll() {
        let inner = Arc::new(ScriptedProvider::new("legacy").with_reply(Script::Text("x".into())));
        let buffered = BufferedProvider::new(inner.clone());
        let mut stream = buffered.complete_streaming(request()).await.unwrap();
        assert_eq!(inner.once_calls(), 0);
        stream.next().await;
        assert_eq!(inner.once_calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_a_single_err_item() {
        let inner = Arc::new(ScriptedProvider::new("legacy").with_reply(Script::Fail("503".into())));
        let buffered = BufferedProvider::new(inner);
        let out: Vec<_> = buffered
            .complete_streaming(request())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }
}
