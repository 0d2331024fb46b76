use serde::Serialize;

use sb_domain::error::Result;
use sb_domain::message::{History, Message};
use sb_domain::stream::FragmentStream;

/// Introspection record for one responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponderInfo {
    pub name: String,
    pub description: String,
    pub category: String,
}

impl ResponderInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
        }
    }
}

/// One inbound message with everything a responder may use to answer it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub conversation_id: String,
    /// The user's text as sent.
    pub input: String,
    /// Conversation history before this message, oldest first.
    pub history: History,
    /// Resolved attachment text, present when the message carried
    /// attachments.
    pub attachment_text: Option<String>,
}

impl Exchange {
    pub fn new(conversation_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            input: input.into(),
            history: Vec::new(),
            attachment_text: None,
        }
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    pub fn with_attachment_text(mut self, text: Option<String>) -> Self {
        self.attachment_text = text;
        self
    }

    /// The user turn as sent to a model: the input, followed by the
    /// attachment text when there is any.
    pub fn prompt(&self) -> String {
        match &self.attachment_text {
            Some(docs) => format!("User Query: {}\n\nDocument Content:\n{}", self.input, docs),
            None => self.input.clone(),
        }
    }

    /// Prior history plus the current user turn.
    pub fn full_history(&self) -> Vec<Message> {
        let mut messages = self.history.clone();
        messages.push(Message::user(self.prompt()));
        messages
    }
}

/// A component that answers an exchange as a stream of fragments.
#[async_trait::async_trait]
pub trait TaskResponder: Send + Sync {
    fn info(&self) -> &ResponderInfo;

    fn name(&self) -> &str {
        &self.info().name
    }

    async fn respond(&self, exchange: &Exchange) -> Result<FragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_domain::message::Role;

    #[test]
    fn prompt_without_attachments_is_the_input() {
        let ex = Exchange::new("c", "hello");
        assert_eq!(ex.prompt(), "hello");
    }

    #[test]
    fn prompt_embeds_attachment_text() {
        let ex = Exchange::new("c", "summarize").with_attachment_text(Some("DOC".into()));
        assert_eq!(ex.prompt(), "User Query: summarize\n\nDocument Content:\nDOC");
    }

    #[test]
    fn full_history_appends_user_turn() {
        let ex = Exchange::new("c", "second")
            .with_history(vec![Message::user("first"), Message::assistant("reply")]);
        let all = ex.full_history();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].role, Role::User);
        assert_eq!(all[2].content, "second");
    }
}
