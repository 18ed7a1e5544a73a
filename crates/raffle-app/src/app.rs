// Raffle orchestration.
//
// `RaffleApp` owns the database, the draw engine and a suggestion source, and
// exposes the operations a front end needs: list and participant management,
// CSV import/export, running a draw (which records history) and asking for an
// AI-suggested winner count.

use std::io::{Read, Write};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use raffle_core::config::Config;
use raffle_core::db::Database;
use raffle_core::draw::{DrawEngine, DrawError, RandomSource, ThreadRandom};
use raffle_core::model::{
    DrawSettings, NewParticipant, Participant, RaffleList, RaffleResult, DEFAULT_LIST_NAME,
};
use raffle_core::roster_csv::{self, RosterCsvError};
use raffle_llm::suggest::{RaffleSuggestion, SuggestionError, SuggestionRequest};

use crate::suggestions::SuggestionSource;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Base pause before winners are revealed.
const REVEAL_BASE: Duration = Duration::from_millis(2000);
/// Extra pause per winner, capped at `REVEAL_PER_WINNER_CAP`.
const REVEAL_PER_WINNER: Duration = Duration::from_millis(300);
const REVEAL_PER_WINNER_CAP: Duration = Duration::from_millis(3000);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AppError {
    #[error("list not found: {0}")]
    ListNotFound(String),

    #[error("participant {participant_id} not found in list {list_id}")]
    ParticipantNotFound {
        list_id: String,
        participant_id: String,
    },

    #[error("name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error(transparent)]
    Csv(#[from] RosterCsvError),

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// RaffleApp
// ---------------------------------------------------------------------------

pub struct RaffleApp<S, E = ThreadRandom> {
    config: Config,
    db: Database,
    engine: DrawEngine<E>,
    suggestions: S,
}

impl<S: SuggestionSource> RaffleApp<S, ThreadRandom> {
    pub fn new(config: Config, db: Database, suggestions: S) -> Self {
        Self::with_engine(config, db, DrawEngine::new(), suggestions)
    }
}

impl<S: SuggestionSource, E: RandomSource> RaffleApp<S, E> {
    pub fn with_engine(
        config: Config,
        db: Database,
        engine: DrawEngine<E>,
        suggestions: S,
    ) -> Self {
        Self {
            config,
            db,
            engine,
            suggestions,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Create an empty list. A missing or blank name becomes
    /// `DEFAULT_LIST_NAME`.
    pub fn create_list(&self, name: Option<&str>) -> Result<RaffleList, AppError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_LIST_NAME);
        let list = self.db.create_list(name)?;
        info!(list_id = %list.id, name = %list.name, "created list");
        Ok(list)
    }

    pub fn rename_list(&self, list_id: &str, name: &str) -> Result<(), AppError> {
        let name = non_empty_name(name)?;
        if !self.db.rename_list(list_id, name)? {
            return Err(AppError::ListNotFound(list_id.to_string()));
        }
        info!(list_id, name, "renamed list");
        Ok(())
    }

    /// Delete a list and its participants. Its draw history is kept.
    pub fn delete_list(&self, list_id: &str) -> Result<(), AppError> {
        if !self.db.delete_list(list_id)? {
            return Err(AppError::ListNotFound(list_id.to_string()));
        }
        info!(list_id, "deleted list");
        Ok(())
    }

    pub fn lists(&self) -> Result<Vec<RaffleList>, AppError> {
        Ok(self.db.list_lists()?)
    }

    pub fn list(&self, list_id: &str) -> Result<RaffleList, AppError> {
        self.db
            .get_list(list_id)?
            .ok_or_else(|| AppError::ListNotFound(list_id.to_string()))
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Append one participant. The name is required; blank contact fields
    /// are dropped.
    pub fn add_participant(
        &self,
        list_id: &str,
        participant: NewParticipant,
    ) -> Result<Participant, AppError> {
        let entry = NewParticipant {
            name: non_empty_name(&participant.name)?.to_string(),
            email: clean_optional(participant.email),
            phone: clean_optional(participant.phone),
        };
        self.ensure_list(list_id)?;

        let added = self
            .db
            .add_participants(list_id, vec![entry])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("participant insert returned nothing"))?;
        info!(list_id, participant_id = %added.id, "added participant");
        Ok(added)
    }

    pub fn rename_participant(
        &self,
        list_id: &str,
        participant_id: &str,
        name: &str,
    ) -> Result<(), AppError> {
        let name = non_empty_name(name)?;
        if !self.db.update_participant(list_id, participant_id, name)? {
            return Err(participant_not_found(list_id, participant_id));
        }
        debug!(list_id, participant_id, "renamed participant");
        Ok(())
    }

    pub fn remove_participant(
        &self,
        list_id: &str,
        participant_id: &str,
    ) -> Result<(), AppError> {
        if !self.db.remove_participant(list_id, participant_id)? {
            return Err(participant_not_found(list_id, participant_id));
        }
        info!(list_id, participant_id, "removed participant");
        Ok(())
    }

    /// Append every named row of a CSV roster to the list. Returns how many
    /// participants were added.
    pub fn import_csv<R: Read>(&self, list_id: &str, reader: R) -> Result<usize, AppError> {
        self.ensure_list(list_id)?;
        let parsed = roster_csv::import_participants(reader)?;
        let added = self.db.add_participants(list_id, parsed)?;
        info!(list_id, count = added.len(), "imported participants from CSV");
        Ok(added.len())
    }

    pub fn export_csv<W: Write>(&self, list_id: &str, writer: W) -> Result<(), AppError> {
        let list = self.list(list_id)?;
        roster_csv::export_participants(writer, &list.participants)?;
        debug!(list_id, count = list.participants.len(), "exported participants");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Draws
    // ------------------------------------------------------------------

    /// Draw winners from a list and record the result in history.
    ///
    /// The seed is stored only when it has a non-whitespace character, since
    /// only those seeds reproduce the draw.
    pub fn run_raffle(
        &mut self,
        list_id: &str,
        number_of_winners: usize,
        seed: Option<&str>,
    ) -> Result<RaffleResult, AppError> {
        let list = self.list(list_id)?;
        let winners: Vec<Participant> = self
            .engine
            .draw(&list.participants, number_of_winners, seed)?
            .into_iter()
            .cloned()
            .collect();

        let settings = DrawSettings {
            number_of_winners,
            seed: seed
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        };
        let result = RaffleResult::new(&list, winners, settings);
        self.db.record_result(&result)?;

        info!(
            list_id,
            result_id = %result.id,
            winners = result.winners.len(),
            seeded = result.settings.seed.is_some(),
            "raffle drawn"
        );
        Ok(result)
    }

    /// Ask the suggestion source for a winner count suited to the list.
    pub async fn suggest_winner_count(
        &self,
        list_id: &str,
    ) -> Result<RaffleSuggestion, AppError> {
        let list = self.list(list_id)?;
        let request = SuggestionRequest::for_count(list.participants.len());
        let suggestion = self.suggestions.suggest(&request).await?;
        debug!(
            list_id,
            suggested = suggestion.suggested_winner_count,
            "received winner-count suggestion"
        );
        Ok(suggestion)
    }

    /// Pause before showing `winner_count` winners, or zero when the reveal
    /// delay is turned off.
    pub fn reveal_delay(&self, winner_count: usize) -> Duration {
        if self.config.draw.reveal_delay {
            reveal_delay(winner_count)
        } else {
            Duration::ZERO
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Every recorded draw, newest first.
    pub fn history(&self) -> Result<Vec<RaffleResult>, AppError> {
        Ok(self.db.load_history()?)
    }

    pub fn clear_history(&self) -> Result<usize, AppError> {
        let removed = self.db.clear_history()?;
        info!(removed, "cleared draw history");
        Ok(removed)
    }

    fn ensure_list(&self, list_id: &str) -> Result<(), AppError> {
        self.list(list_id).map(|_| ())
    }
}

/// `2s + min(winners * 300ms, 3s)`.
pub fn reveal_delay(winner_count: usize) -> Duration {
    let per_winner = u32::try_from(winner_count)
        .ok()
        .and_then(|n| REVEAL_PER_WINNER.checked_mul(n))
        .unwrap_or(REVEAL_PER_WINNER_CAP);
    REVEAL_BASE + per_winner.min(REVEAL_PER_WINNER_CAP)
}

fn non_empty_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        Err(AppError::EmptyName)
    } else {
        Ok(name)
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn participant_not_found(list_id: &str, participant_id: &str) -> AppError {
    AppError::ParticipantNotFound {
        list_id: list_id.to_string(),
        participant_id: participant_id.to_string(),
    }
}
