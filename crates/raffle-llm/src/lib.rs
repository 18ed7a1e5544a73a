// Claude API client and the winner-count suggestion built on it.

pub mod client;
pub mod suggest;

pub use client::{ClaudeClient, LlmClient, LlmEvent};
pub use suggest::{RaffleSuggestion, SuggestionError, SuggestionRequest};
