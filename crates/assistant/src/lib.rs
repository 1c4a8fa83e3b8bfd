//! Virtual CFO assistant: per-turn context assembly, completion calls,
//! conversation persistence and inter-agent consultation.

pub mod chat;
pub mod completion;
pub mod consult;
pub mod context;
pub mod prompt;
pub mod store;

pub use chat::ChatService;
pub use completion::{CompletionClient, CompletionMessage, CompletionRole, OpenAiClient};
pub use consult::ConsultService;
pub use context::ContextAssembler;
pub use store::{ConversationStore, InMemoryConversationStore};
