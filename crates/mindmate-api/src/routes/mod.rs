pub mod caretaker_chat;
pub mod chat;
