//! Client side of the chat relay: a live relay connection, the REST
//! directory client, and the conversation state both of them feed.

pub mod error;
pub mod relay;
pub mod rest;
pub mod session;
pub mod state;

pub use error::ClientError;
pub use session::{ChatSession, Endpoints};
pub use state::ConversationState;
