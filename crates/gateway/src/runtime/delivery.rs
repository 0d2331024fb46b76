//! Drives one responder stream onto a session's outbound channel.
//!
//! Each fragment becomes one non-terminal frame; the exchange is closed by
//! exactly one terminal frame (plain on completion, carrying the error on
//! failure). A cancelled exchange sends nothing further: whoever cancelled
//! it owns the channel's last frame. Only fragments the channel accepted
//! count as sent.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use sb_domain::error::{Error, Result};
use sb_domain::stream::FragmentStream;
use sb_protocol::FrameSequencer;

use super::outbound::Outbound;

/// How an exchange's delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEnd {
    Completed,
    Failed(String),
    Cancelled,
}

/// Result of one delivery: the text that was actually queued for the
/// client, in order.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub message_id: String,
    pub text: String,
    pub fragments: usize,
    pub end: DeliveryEnd,
}

impl Delivered {
    pub fn is_completed(&self) -> bool {
        self.end == DeliveryEnd::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.end == DeliveryEnd::Cancelled
    }

    /// An exchange cancelled before its stream was opened.
    pub fn cancelled(seq: FrameSequencer) -> Self {
        Self::from_sequencer(seq, DeliveryEnd::Cancelled)
    }

    fn from_sequencer(seq: FrameSequencer, end: DeliveryEnd) -> Self {
        let message_id = seq.message_id().to_string();
        let fragments = seq.fragments_sent();
        Self {
            message_id,
            fragments,
            text: seq.into_text(),
            end,
        }
    }
}

/// A stream that fails immediately, for errors raised before any responder
/// stream exists.
pub fn failed_stream(err: Error) -> FragmentStream {
    Box::pin(futures_util::stream::once(async move { Err::<String, _>(err) }))
}

/// Run `fut`, failing with `Timeout` when it takes longer than `idle`.
pub async fn within<T>(
    idle: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(format!("no response within {}s", limit.as_secs())))?,
        None => fut.await,
    }
}

/// Wait for the next stream item, giving up after `idle` when set.
async fn next_item(
    stream: &mut FragmentStream,
    idle: Option<Duration>,
) -> Result<Option<Result<String>>> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| Error::Timeout(format!("no fragment within {}s", limit.as_secs()))),
        None => Ok(stream.next().await),
    }
}

/// Pump `stream` into `outbound` until it ends, fails, times out or
/// `cancel` fires. The stream is dropped on return, which closes the
/// upstream call.
pub async fn deliver(
    mut stream: FragmentStream,
    mut seq: FrameSequencer,
    outbound: &Outbound,
    cancel: &CancellationToken,
    idle_timeout: Option<Duration>,
) -> Delivered {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Delivered::from_sequencer(seq, DeliveryEnd::Cancelled);
            }
            next = next_item(&mut stream, idle_timeout) => next,
        };

        match next {
            Ok(Some(Ok(text))) => {
                let Some(frame) = seq.frame(&text) else {
                    continue;
                };
                // A frame the channel refused never reaches the client.
                if !outbound.send(frame).await {
                    return Delivered::from_sequencer(seq, DeliveryEnd::Cancelled);
                }
                seq.confirm(&text);
            }
            Ok(None) => {
                if let Some(frame) = seq.finish() {
                    outbound.send(frame).await;
                }
                return Delivered::from_sequencer(seq, DeliveryEnd::Completed);
            }
            Ok(Some(Err(e))) | Err(e) => {
                let message = e.to_string();
                if let Some(frame) = seq.fail(message.clone()) {
                    outbound.send(frame).await;
                }
                return Delivered::from_sequencer(seq, DeliveryEnd::Failed(message));
            }
        }
    }
}

/// Drain `stream` into one string for the request-response path. Any
/// failure discards the partial text.
pub async fn collect(mut stream: FragmentStream, idle_timeout: Option<Duration>) -> Result<String> {
    let mut text = String::new();
    while let Some(item) = next_item(&mut stream, idle_timeout).await? {
        text.push_str(&item?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::outbound;
    use sb_protocol::StreamFragment;

    fn fragments(items: Vec<Result<String>>) -> FragmentStream {
        Box::pin(futures_util::stream::iter(items))
    }

    async fn drain(rx: &mut outbound::OutboundReceiver) -> Vec<StreamFragment> {
        let mut frames = Vec::new();
        while let Ok(Some(f)) =
            tokio::time::timeout(Duration::from_millis(50), rx.recv()).await
        {
            frames.push(f);
        }
        frames
    }

    #[tokio::test]
    async fn completed_stream_ends_with_one_plain_terminal() {
        let (tx, mut rx) = outbound::channel(16);
        let cancel = CancellationToken::new();
        let out = deliver(
            fragments(vec![Ok("Hel".into()), Ok("lo".into())]),
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            None,
        )
        .await;

        assert!(out.is_completed());
        assert_eq!(out.text, "Hello");
        assert_eq!(out.fragments, 2);

        let frames = drain(&mut rx).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.iter().filter(|f| f.done).count(), 1);
        assert!(frames[2].done && frames[2].error.is_none());
        assert_eq!(frames[0].metadata.message_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_sent_text_and_reports_error() {
        let (tx, mut rx) = outbound::channel(16);
        let cancel = CancellationToken::new();
        let out = deliver(
            fragments(vec![
                Ok("par".into()),
                Ok("tial".into()),
                Err(Error::Upstream {
                    provider: "p".into(),
                    message: "connection reset".into(),
                }),
                Ok("never".into()),
            ]),
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            None,
        )
        .await;

        assert_eq!(out.text, "partial");
        assert!(matches!(out.end, DeliveryEnd::Failed(ref m) if m.contains("connection reset")));

        let frames = drain(&mut rx).await;
        assert_eq!(frames.len(), 3);
        let last = frames.last().unwrap();
        assert!(last.done);
        assert!(last.content.is_empty());
        assert!(last.error.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn failure_before_first_fragment_sends_only_terminal() {
        let (tx, mut rx) = outbound::channel(4);
        let cancel = CancellationToken::new();
        let out = deliver(
            failed_stream(Error::MalformedResponse("bad".into())),
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            None,
        )
        .await;

        assert_eq!(out.fragments, 0);
        assert!(out.text.is_empty());
        let frames = drain(&mut rx).await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].done && frames[0].error.is_some());
    }

    #[tokio::test]
    async fn cancellation_sends_no_terminal() {
        let (tx, mut rx) = outbound::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = deliver(
            fragments(vec![Ok("x".into())]),
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            None,
        )
        .await;

        assert!(out.is_cancelled());
        assert!(drain(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn fragments_refused_by_a_closed_channel_are_not_kept() {
        let (tx, mut rx) = outbound::channel(4);
        let cancel = CancellationToken::new();
        assert!(tx.send(StreamFragment::partial("m0", "earlier")).await);
        tx.close_with(StreamFragment::rejected("replaced"));

        let out = deliver(
            fragments(vec![Ok("never".into()), Ok("seen".into())]),
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            None,
        )
        .await;

        assert!(out.is_cancelled());
        assert!(out.text.is_empty());
        assert_eq!(out.fragments, 0);

        let frames = drain(&mut rx).await;
        let contents: Vec<_> = frames.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, ["earlier", ""]);
        assert_eq!(frames[1].error.as_deref(), Some("replaced"));
    }

    #[tokio::test]
    async fn within_times_out_slow_futures() {
        let slow = within(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(slow, Err(Error::Timeout(_))));

        let fast = within(None, async { Ok(7) }).await;
        assert_eq!(fast.unwrap(), 7);
    }

    #[tokio::test]
    async fn idle_timeout_fails_the_exchange() {
        let (tx, mut rx) = outbound::channel(4);
        let cancel = CancellationToken::new();
        let stalled: FragmentStream = Box::pin(
            futures_util::stream::iter(vec![Ok::<_, Error>("a".to_string())])
                .chain(futures_util::stream::pending()),
        );
        let out = deliver(
            stalled,
            FrameSequencer::new("m1"),
            &tx,
            &cancel,
            Some(Duration::from_millis(20)),
        )
        .await;

        assert_eq!(out.text, "a");
        assert!(matches!(out.end, DeliveryEnd::Failed(ref m) if m.starts_with("timeout:")));
        let frames = drain(&mut rx).await;
        assert_eq!(frames.len(), 2);
        assert!(frames[1].done);
    }

    #[tokio::test]
    async fn collect_concatenates_or_fails() {
        let ok = collect(fragments(vec![Ok("a".into()), Ok("b".into())]), None).await;
        assert_eq!(ok.unwrap(), "ab");

        let err = collect(
            fragments(vec![Ok("a".into()), Err(Error::Timeout("slow".into()))]),
            None,
        )
        .await;
        assert!(err.is_err());
    }
}
