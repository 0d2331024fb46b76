//! Conversation persistence scoped by owner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use sb_domain::error::{Error, Result};
use sb_domain::message::{History, Message};
use sb_domain::principal::ConversationHandle;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub owner_principal_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: History,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl Conversation {
    pub fn handle(&self) -> ConversationHandle {
        ConversationHandle {
            conversation_id: self.id.clone(),
            owner_principal_id: self.owner_principal_id.clone(),
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store interface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Owner-scoped conversation store.
///
/// Every lookup takes the calling principal's id. A conversation that does
/// not exist and one owned by someone else both fail with
/// `OwnershipFailure`, so callers cannot probe for foreign ids.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, owner_principal_id: &str, title: Option<String>)
        -> Result<Conversation>;

    async fn get_for_owner(
        &self,
        conversation_id: &str,
        principal_id: &str,
    ) -> Result<Conversation>;

    /// Append one message. Messages keep their id and arrival order.
    async fn append_message(&self, handle: &ConversationHandle, message: Message) -> Result<()>;

    async fn delete(&self, conversation_id: &str, principal_id: &str) -> Result<()>;

    /// Resolve the ownership handle for one request.
    async fn resolve(&self, conversation_id: &str, principal_id: &str) -> Result<ConversationHandle> {
        Ok(self.get_for_owner(conversation_id, principal_id).await?.handle())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(
        &self,
        owner_principal_id: &str,
        title: Option<String>,
    ) -> Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            owner_principal_id: owner_principal_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };
        self.conversations
            .write()
            .insert(conversation.id.clone(), conversation.clone());
        tracing::debug!(
            conversation_id = %conversation.id,
            principal_id = %owner_principal_id,
            "conversation created"
        );
        Ok(conversation)
    }

    async fn get_for_owner(
        &self,
        conversation_id: &str,
        principal_id: &str,
    ) -> Result<Conversation> {
        self.conversations
            .read()
            .get(conversation_id)
            .filter(|c| c.owner_principal_id == principal_id)
            .cloned()
            .ok_or(Error::OwnershipFailure)
    }

    async fn append_message(&self, handle: &ConversationHandle, message: Message) -> Result<()> {
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .get_mut(&handle.conversation_id)
            .filter(|c| c.owner_principal_id == handle.owner_principal_id)
            .ok_or_else(|| {
                Error::Persistence(format!(
                    "conversation {} no longer exists",
                    handle.conversation_id
                ))
            })?;
        conversation.updated_at = Utc::now();
        conversation.messages.push(message);
        Ok(())
    }

    async fn delete(&self, conversation_id: &str, principal_id: &str) -> Result<()> {
        let mut conversations = self.conversations.write();
        match conversations.get(conversation_id) {
            Some(c) if c.owner_principal_id == principal_id => {
                conversations.remove(conversation_id);
                Ok(())
            }
            _ => Err(Error::OwnershipFailure),
        }
    }
}
