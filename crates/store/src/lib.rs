//! Collaborator interfaces used by the chat pipeline, with the in-process
//! implementations the gateway ships: a static-token authenticator, an
//! in-memory conversation store and a temp-directory blob store with
//! plain-text extraction.

pub mod auth;
pub mod blobs;
pub mod conversations;

pub use auth::{Authenticator, TokenAuthenticator};
pub use blobs::{BlobStore, StoredBlob, TempDirBlobStore, TextExtractor};
pub use conversations::{
    Conversation, ConversationStore, ConversationSummary, InMemoryConversationStore,
};
