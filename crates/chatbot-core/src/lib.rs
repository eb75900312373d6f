pub mod client;
pub mod config;
pub mod state;
pub mod widget;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use client::{ChatClient, ChatError, DEFAULT_BACKEND_URL};
pub use config::Config;
pub use state::{ChatMessage, ChatRequest, ChatRole};
pub use widget::{ChatWidget, SubmitOutcome, GREETING, NO_REPLY};
