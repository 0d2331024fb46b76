//! Session manager: binds a live connection to one conversation and one
//! authenticated principal.
//!
//! At most one session is live per conversation id. Binding a second
//! connection displaces the first: its channel is closed with a terminal
//! error frame and its cancellation token fires, then the newcomer is
//! installed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use sb_domain::error::Result;
use sb_domain::principal::{ConversationHandle, Principal};
use sb_protocol::{ClientMessage, StreamFragment};
use sb_store::{Authenticator, ConversationStore};

use super::delivery::Delivered;
use super::exchange::ChatPipeline;
use super::outbound::Outbound;

/// Error text sent to a session that was replaced by a newer connection.
pub const DISPLACED: &str = "session replaced by a newer connection";

pub struct Session {
    pub session_id: String,
    pub principal: Principal,
    pub handle: ConversationHandle,
    outbound: Outbound,
    cancel: CancellationToken,
}

impl Session {
    pub fn conversation_id(&self) -> &str {
        &self.handle.conversation_id
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn displace(&self) {
        if !self.outbound.close_with(StreamFragment::rejected(DISPLACED)) {
            tracing::debug!(session_id = %self.session_id, "displaced session channel already closed");
        }
        self.cancel.cancel();
    }
}

pub struct SessionManager {
    auth: Arc<dyn Authenticator>,
    conversations: Arc<dyn ConversationStore>,
    pipeline: Arc<ChatPipeline>,
    live: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        conversations: Arc<dyn ConversationStore>,
        pipeline: Arc<ChatPipeline>,
    ) -> Self {
        Self {
            auth,
            conversations,
            pipeline,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Authenticate `token`, check that its principal owns
    /// `conversation_id`, and install a session writing to `outbound`.
    ///
    /// Fails with `AuthFailure` or `OwnershipFailure`; callers must report
    /// both the same way.
    pub async fn bind(
        &self,
        outbound: Outbound,
        conversation_id: &str,
        token: &str,
    ) -> Result<Arc<Session>> {
        let principal = self.auth.verify(token).await?;
        let handle = self
            .conversations
            .resolve(conversation_id, &principal.id)
            .await?;

        let session = Arc::new(Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            principal,
            handle,
            outbound,
            cancel: CancellationToken::new(),
        });

        let mut live = self.live.lock();
        if let Some(previous) = live.remove(conversation_id) {
            tracing::info!(
                conversation_id = %conversation_id,
                displaced = %previous.session_id,
                session_id = %session.session_id,
                "displacing live session"
            );
            previous.displace();
        }
        live.insert(conversation_id.to_string(), session.clone());
        drop(live);

        tracing::info!(
            conversation_id = %conversation_id,
            principal_id = %session.principal.id,
            session_id = %session.session_id,
            "session bound"
        );
        Ok(session)
    }

    /// Remove `session` from the live map if it is still the one bound to
    /// its conversation. Returns whether an entry was removed.
    pub fn unbind(&self, session: &Session) -> bool {
        let mut live = self.live.lock();
        let owned = live
            .get(session.conversation_id())
            .is_some_and(|current| current.session_id == session.session_id);
        if owned {
            live.remove(session.conversation_id());
            tracing::info!(
                conversation_id = %session.conversation_id(),
                session_id = %session.session_id,
                "session unbound"
            );
        }
        owned
    }

    /// Run one exchange on `session`'s channel. Exchanges on one
    /// conversation run one at a time, in call order, even across a
    /// displacement.
    pub async fn dispatch(&self, session: &Session, request: ClientMessage) -> Delivered {
        tracing::debug!(
            conversation_id = %session.conversation_id(),
            principal_id = %session.principal.id,
            attachments = request.attachment_ids.len(),
            "dispatching exchange"
        );
        self.pipeline
            .run_streamed(&session.handle, request, &session.outbound, &session.cancel)
            .await
    }

    /// Session id currently bound to `conversation_id`.
    pub fn current(&self, conversation_id: &str) -> Option<String> {
        self.live
            .lock()
            .get(conversation_id)
            .map(|s| s.session_id.clone())
    }

    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.lock().is_empty()
    }

    pub fn pipeline(&self) -> &Arc<ChatPipeline> {
        &self.pipeline
    }
}
