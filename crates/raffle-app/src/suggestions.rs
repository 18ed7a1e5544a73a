// Where winner-count suggestions come from.

use async_trait::async_trait;

use raffle_core::config::Config;
use raffle_llm::suggest::{self, RaffleSuggestion, SuggestionError, SuggestionRequest};
use raffle_llm::LlmClient;

/// Anything that can propose raffle settings for a roster.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<RaffleSuggestion, SuggestionError>;
}

/// Suggestions from Claude, bounded by the configured token budget.
pub struct LlmSuggestions {
    client: LlmClient,
    max_tokens: u32,
}

impl LlmSuggestions {
    pub fn new(client: LlmClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            LlmClient::from_config(config),
            config.llm.suggestion_max_tokens,
        )
    }

    pub fn is_active(&self) -> bool {
        self.client.is_active()
    }
}

#[async_trait]
impl SuggestionSource for LlmSuggestions {
    async fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<RaffleSuggestion, SuggestionError> {
        suggest::suggest_settings(&self.client, request, self.max_tokens).await
    }
}
