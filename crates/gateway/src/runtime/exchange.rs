//! One chat exchange, end to end: load history, persist the user message,
//! resolve attachments, route, deliver, persist the reply.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sb_agents::{Exchange, IntentRouter};
use sb_domain::error::Result;
use sb_domain::message::Message;
use sb_domain::principal::ConversationHandle;
use sb_domain::stream::FragmentStream;
use sb_protocol::{ChatReply, ClientMessage, FrameSequencer};
use sb_store::ConversationStore;

use super::attachments::AttachmentBridge;
use super::delivery::{self, Delivered, DeliveryEnd};
use super::outbound::Outbound;
use super::turns::TurnLocks;

pub struct ChatPipeline {
    conversations: Arc<dyn ConversationStore>,
    router: Arc<IntentRouter>,
    attachments: AttachmentBridge,
    turns: TurnLocks,
    idle_timeout: Option<Duration>,
}

impl ChatPipeline {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        router: Arc<IntentRouter>,
        attachments: AttachmentBridge,
    ) -> Self {
        Self {
            conversations,
            router,
            attachments,
            turns: TurnLocks::new(),
            idle_timeout: None,
        }
    }

    /// Fail an exchange when the responder goes quiet for this long.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn router(&self) -> &Arc<IntentRouter> {
        &self.router
    }

    /// Conversations with an exchange running or queued.
    pub fn active_conversations(&self) -> usize {
        self.turns.active()
    }

    /// Read the stored history and record the user message. Returns the
    /// history as it was before this message.
    async fn record_user(
        &self,
        handle: &ConversationHandle,
        request: &ClientMessage,
    ) -> Result<Vec<Message>> {
        let conversation = self
            .conversations
            .get_for_owner(&handle.conversation_id, &handle.owner_principal_id)
            .await?;

        let user = Message::user(request.content.clone())
            .with_attachments(request.attachment_ids.clone());
        self.conversations.append_message(handle, user).await?;
        Ok(conversation.messages)
    }

    /// Resolve attachments, classify and open the responder stream.
    async fn open(
        &self,
        handle: &ConversationHandle,
        request: &ClientMessage,
        history: Vec<Message>,
    ) -> Result<FragmentStream> {
        let attachment_text = self.attachments.resolve(&request.attachment_ids).await;
        let exchange = Exchange::new(handle.conversation_id.clone(), request.content.clone())
            .with_history(history)
            .with_attachment_text(attachment_text);
        let routed = self.router.route(&exchange).await?;
        Ok(routed.stream)
    }

    /// Run one exchange and stream it onto `outbound`.
    ///
    /// Whatever text was queued for the client is persisted as the assistant
    /// message, under the id announced in the frames, whether the exchange
    /// completed, failed or was cancelled. `cancel` is honoured at every
    /// wait, including the classifier call and opening the responder
    /// stream.
    pub async fn run_streamed(
        &self,
        handle: &ConversationHandle,
        request: ClientMessage,
        outbound: &Outbound,
        cancel: &CancellationToken,
    ) -> Delivered {
        let seq = FrameSequencer::new(uuid::Uuid::new_v4().to_string());

        let _turn = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Delivered::cancelled(seq),
            turn = self.turns.acquire(&handle.conversation_id) => turn,
        };
        if cancel.is_cancelled() {
            return Delivered::cancelled(seq);
        }

        let history = match self.record_user(handle, &request).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(
                    conversation_id = %handle.conversation_id,
                    error = %e,
                    "failed to prepare exchange"
                );
                return delivery::deliver(delivery::failed_stream(e), seq, outbound, cancel, None)
                    .await;
            }
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = delivery::within(self.idle_timeout, self.open(handle, &request, history)) => {
                Some(opened.unwrap_or_else(delivery::failed_stream))
            }
        };

        let delivered = match opened {
            Some(stream) => {
                delivery::deliver(stream, seq, outbound, cancel, self.idle_timeout).await
            }
            None => Delivered::cancelled(seq),
        };

        match &delivered.end {
            DeliveryEnd::Completed => tracing::info!(
                conversation_id = %handle.conversation_id,
                message_id = %delivered.message_id,
                fragments = delivered.fragments,
                "exchange completed"
            ),
            DeliveryEnd::Failed(error) => tracing::warn!(
                conversation_id = %handle.conversation_id,
                message_id = %delivered.message_id,
                fragments = delivered.fragments,
                error = %error,
                "exchange failed"
            ),
            DeliveryEnd::Cancelled => tracing::info!(
                conversation_id = %handle.conversation_id,
                message_id = %delivered.message_id,
                fragments = delivered.fragments,
                "exchange cancelled"
            ),
        }

        self.persist_reply(handle, &delivered.message_id, delivered.text.clone())
            .await;
        self.attachments.cleanup(&request.attachment_ids).await;
        delivered
    }

    /// Run one exchange to completion and return the whole answer.
    ///
    /// On failure nothing is persisted for the assistant side and the error
    /// is returned to the caller.
    pub async fn run_once(
        &self,
        handle: &ConversationHandle,
        request: ClientMessage,
    ) -> Result<ChatReply> {
        let _turn = self.turns.acquire(&handle.conversation_id).await;
        let history = self.record_user(handle, &request).await?;
        let message_id = uuid::Uuid::new_v4().to_string();

        let answer = async {
            let stream =
                delivery::within(self.idle_timeout, self.open(handle, &request, history)).await?;
            delivery::collect(stream, self.idle_timeout).await
        }
        .await;
        self.attachments.cleanup(&request.attachment_ids).await;
        let content = answer?;

        self.conversations
            .append_message(
                handle,
                Message::assistant(content.clone()).with_id(message_id.clone()),
            )
            .await?;

        tracing::info!(
            conversation_id = %handle.conversation_id,
            message_id = %message_id,
            "exchange completed"
        );

        Ok(ChatReply {
            message_id,
            content,
            done: true,
        })
    }

    async fn persist_reply(&self, handle: &ConversationHandle, message_id: &str, text: String) {
        let reply = Message::assistant(text).with_id(message_id);
        if let Err(e) = self.conversations.append_message(handle, reply).await {
            tracing::error!(
                conversation_id = %handle.conversation_id,
                message_id = %message_id,
                error = %e,
                "failed to persist assistant message"
            );
        }
    }
}
