//! Request handlers.

pub mod chat;
pub mod classify;
pub mod favicon;
pub mod health;
pub mod images;
pub mod process;
pub mod projects;
pub mod status;
pub mod tags;

pub use chat::*;
pub use classify::*;
pub use favicon::*;
pub use health::*;
pub use images::*;
pub use process::*;
pub use projects::*;
pub use status::*;
pub use tags::*;
