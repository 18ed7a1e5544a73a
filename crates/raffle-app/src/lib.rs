// Application service: list management, draws, history and AI suggestions
// over the local database.

pub mod app;
pub mod suggestions;

pub use app::{reveal_delay, AppError, RaffleApp};
pub use suggestions::{LlmSuggestions, SuggestionSource};
