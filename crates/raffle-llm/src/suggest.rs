// AI-suggested raffle settings.
//
// Asks Claude for a sensible winner count given the size of the roster and
// parses the JSON object out of its reply. Purely advisory: nothing here
// touches the draw itself.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::LlmClient;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the model is told about the raffle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub participant_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<String>,
}

impl SuggestionRequest {
    pub fn for_count(participant_count: usize) -> Self {
        Self {
            participant_count,
            demographics: None,
        }
    }
}

/// The model's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleSuggestion {
    pub suggested_winner_count: usize,
    #[serde(default)]
    pub allow_repeats_suggestion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("participant count must be greater than zero")]
    NoParticipants,

    #[error("failed to get suggestions from AI")]
    Unavailable(#[source] anyhow::Error),

    #[error("AI reply was not a usable suggestion: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

pub fn system_prompt() -> &'static str {
    "You are an assistant helping an event organizer configure a raffle. \
     Reply with a single JSON object and nothing else. The object has the keys \
     \"suggestedWinnerCount\" (integer, at least 1), \"allowRepeatsSuggestion\" \
     (boolean) and \"additionalNotes\" (short string, optional)."
}

pub fn build_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = format!(
        "Based on the number of participants ({}), suggest an optimal number of winners. \
         Also suggest whether repeat winners should be allowed.",
        request.participant_count
    );
    if let Some(demographics) = request
        .demographics
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        prompt.push_str(&format!(
            "\n\nConsider this information about the participants: {demographics}"
        ));
    }
    prompt.push_str("\n\nReturn the suggestion in JSON format.");
    prompt
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Pull the first `{ ... }` span out of `text` and decode it. Models like to
/// wrap JSON in prose or code fences.
pub fn parse_suggestion(text: &str) -> Result<RaffleSuggestion, SuggestionError> {
    let start = text
        .find('{')
        .ok_or_else(|| SuggestionError::Malformed("no JSON object in reply".into()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| SuggestionError::Malformed("unterminated JSON object".into()))?;

    let suggestion: RaffleSuggestion = serde_json::from_str(&text[start..=end])
        .map_err(|e| SuggestionError::Malformed(e.to_string()))?;
    if suggestion.suggested_winner_count < 1 {
        return Err(SuggestionError::Malformed(
            "suggested winner count must be at least 1".into(),
        ));
    }
    Ok(suggestion)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn suggest_settings(
    client: &LlmClient,
    request: &SuggestionRequest,
    max_tokens: u32,
) -> Result<RaffleSuggestion, SuggestionError> {
    if request.participant_count == 0 {
        return Err(SuggestionError::NoParticipants);
    }

    let reply = client
        .complete(system_prompt(), &build_prompt(request), max_tokens)
        .await
        .map_err(|e| {
            warn!("error getting AI suggestions: {e:#}");
            SuggestionError::Unavailable(e)
        })?;
    debug!(reply_len = reply.len(), "received suggestion reply");

    parse_suggestion(&reply)
}
