//! LLM backend abstractions.
//!
//! - [`backend::ChatBackend`]: RPITIT trait concrete backends implement
//! - [`box_backend::BoxChatBackend`]: object-safe wrapper for runtime
//!   backend selection

pub mod backend;
pub mod box_backend;

pub use backend::ChatBackend;
pub use box_backend::BoxChatBackend;
