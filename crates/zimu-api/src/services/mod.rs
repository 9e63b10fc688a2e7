//! Business logic services.

pub mod chat;

pub use chat::ChatService;
