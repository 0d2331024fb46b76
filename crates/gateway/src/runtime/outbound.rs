//! Per-session outbound frame channel.
//!
//! Frames flow through a bounded `mpsc` queue to the connection's writer
//! task. A session that gets displaced is closed with one final frame.
//! Frames accepted before the close are flushed ahead of it, nothing is
//! accepted after it, and after it the receiver yields nothing, so no frame
//! of the old session can trail its terminal frame.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use sb_protocol::StreamFragment;

/// Create a connected sender/receiver pair with room for `capacity`
/// queued frames.
pub fn channel(capacity: usize) -> (Outbound, OutboundReceiver) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
    let (close_tx, close_rx) = oneshot::channel();
    (
        Outbound {
            frames: frames_tx,
            close: Arc::new(Mutex::new(Some(close_tx))),
        },
        OutboundReceiver {
            frames: frames_rx,
            close: Some(close_rx),
            last: None,
            closed: false,
        },
    )
}

#[derive(Clone)]
pub struct Outbound {
    frames: mpsc::Sender<StreamFragment>,
    close: Arc<Mutex<Option<oneshot::Sender<StreamFragment>>>>,
}

impl Outbound {
    /// Queue a frame, waiting for room. Returns `false` once the channel
    /// was closed or the receiving side is gone; an accepted frame is
    /// always yielded before the close frame.
    pub async fn send(&self, frame: StreamFragment) -> bool {
        if self.close.lock().is_none() {
            return false;
        }
        self.frames.send(frame).await.is_ok()
    }

    /// Close the channel with `frame` as the last thing the receiver sees,
    /// after the frames already queued. Only the first call has effect.
    pub fn close_with(&self, frame: StreamFragment) -> bool {
        match self.close.lock().take() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close.lock().is_none() || self.frames.is_closed()
    }
}

pub struct OutboundReceiver {
    frames: mpsc::Receiver<StreamFragment>,
    close: Option<oneshot::Receiver<StreamFragment>>,
    last: Option<StreamFragment>,
    closed: bool,
}

enum Next {
    Close(Result<StreamFragment, oneshot::error::RecvError>),
    Frame(Option<StreamFragment>),
}

impl OutboundReceiver {
    /// Next frame to write, or `None` when the channel is finished.
    pub async fn recv(&mut self) -> Option<StreamFragment> {
        loop {
            if self.closed {
                return None;
            }

            if self.last.is_some() {
                // Closed: flush what was accepted before, then the last frame.
                if let Some(frame) = self.frames.recv().await {
                    return Some(frame);
                }
                self.closed = true;
                return self.last.take();
            }

            let next = match self.close.as_mut() {
                Some(close) => tokio::select! {
                    biased;
                    r = close => Next::Close(r),
                    f = self.frames.recv() => Next::Frame(f),
                },
                None => Next::Frame(self.frames.recv().await),
            };

            match next {
                Next::Close(Ok(frame)) => {
                    self.close = None;
                    self.frames.close();
                    self.last = Some(frame);
                }
                // Every sender is gone without closing; drain what is left.
                Next::Close(Err(_)) => self.close = None,
                Next::Frame(frame) => return frame,
            }
        }
    }
}
