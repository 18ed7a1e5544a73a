// SQLite persistence layer for participant lists and draw history.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::model::{DrawSettings, NewParticipant, Participant, RaffleList, RaffleResult};

/// SQLite-backed storage for raffle lists, their participants, and the
/// history of completed draws.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS raffle_lists (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS participants (
                id       TEXT PRIMARY KEY,
                list_id  TEXT NOT NULL REFERENCES raffle_lists(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                name     TEXT NOT NULL,
                email    TEXT,
                phone    TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_participants_list
                ON participants(list_id, position);

            CREATE TABLE IF NOT EXISTS raffle_history (
                id        TEXT PRIMARY KEY,
                list_id   TEXT NOT NULL,
                list_name TEXT NOT NULL,
                drawn_at  TEXT NOT NULL,
                winners   TEXT NOT NULL,
                settings  TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Create an empty list and return it.
    pub fn create_list(&self, name: &str) -> Result<RaffleList> {
        let list = RaffleList::new(name);
        let conn = self.conn();
        conn.execute(
            "INSERT INTO raffle_lists (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![list.id, list.name, format_timestamp(&list.created_at)],
        )
        .context("failed to create list")?;
        Ok(list)
    }

    /// Load one list with its participants in roster order.
    pub fn get_list(&self, list_id: &str) -> Result<Option<RaffleList>> {
        let conn = self.conn();
        let header = conn
            .query_row(
                "SELECT id, name, created_at FROM raffle_lists WHERE id = ?1",
                params![list_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .context("failed to query list")?;

        let Some((id, name, created_at)) = header else {
            return Ok(None);
        };
        let participants = load_participants(&conn, &id)?;
        Ok(Some(RaffleList {
            id,
            name,
            participants,
            created_at: parse_timestamp(&created_at)?,
        }))
    }

    /// All lists in creation order, with participants.
    pub fn list_lists(&self) -> Result<Vec<RaffleList>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM raffle_lists ORDER BY created_at, rowid")
            .context("failed to prepare list_lists query")?;

        let headers = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query lists")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map list rows")?;

        headers
            .into_iter()
            .map(|(id, name, created_at)| {
                let participants = load_participants(&conn, &id)?;
                Ok(RaffleList {
                    id,
                    name,
                    participants,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    /// Rename a list. Returns `false` if no such list exists.
    pub fn rename_list(&self, list_id: &str, name: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE raffle_lists SET name = ?2 WHERE id = ?1",
                params![list_id, name],
            )
            .context("failed to rename list")?;
        Ok(changed > 0)
    }

    /// Delete a list and its participants. History entries are kept.
    /// Returns `false` if no such list exists.
    pub fn delete_list(&self, list_id: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM raffle_lists WHERE id = ?1", params![list_id])
            .context("failed to delete list")?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Append participants to the end of a list in a single transaction,
    /// returning them with their new ids.
    pub fn add_participants(
        &self,
        list_id: &str,
        new: Vec<NewParticipant>,
    ) -> Result<Vec<Participant>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        let mut position = next_position(&tx, list_id)?;
        let mut added = Vec::with_capacity(new.len());
        for entry in new {
            let participant = entry.into_participant();
            tx.execute(
                "INSERT INTO participants (id, list_id, position, name, email, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    participant.id,
                    list_id,
                    position,
                    participant.name,
                    participant.email,
                    participant.phone,
                ],
            )
            .context("failed to insert participant")?;
            position += 1;
            added.push(participant);
        }

        tx.commit().context("failed to commit participants")?;
        Ok(added)
    }

    /// Rename a participant within a list. Returns `false` if not found.
    pub fn update_participant(
        &self,
        list_id: &str,
        participant_id: &str,
        name: &str,
    ) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE participants SET name = ?3 WHERE list_id = ?1 AND id = ?2",
                params![list_id, participant_id, name],
            )
            .context("failed to update participant")?;
        Ok(changed > 0)
    }

    /// Remove a participant from a list. Returns `false` if not found.
    pub fn remove_participant(&self, list_id: &str, participant_id: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "DELETE FROM participants WHERE list_id = ?1 AND id = ?2",
                params![list_id, participant_id],
            )
            .context("failed to remove participant")?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Persist a completed draw. Winners and settings are stored as JSON so
    /// the entry outlives edits to the list.
    pub fn record_result(&self, result: &RaffleResult) -> Result<()> {
        let winners_json =
            serde_json::to_string(&result.winners).context("failed to serialize winners")?;
        let settings_json =
            serde_json::to_string(&result.settings).context("failed to serialize settings")?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO raffle_history (id, list_id, list_name, drawn_at, winners, settings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.id,
                result.list_id,
                result.list_name,
                format_timestamp(&result.drawn_at),
                winners_json,
                settings_json,
            ],
        )
        .context("failed to record draw result")?;
        Ok(())
    }

    /// Draw history, newest first.
    pub fn load_history(&self) -> Result<Vec<RaffleResult>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, list_id, list_name, drawn_at, winners, settings
                 FROM raffle_history ORDER BY drawn_at DESC, rowid DESC",
            )
            .context("failed to prepare load_history query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("failed to query draw history")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map history rows")?;

        rows.into_iter()
            .map(|(id, list_id, list_name, drawn_at, winners, settings)| {
                let winners: Vec<Participant> =
                    serde_json::from_str(&winners).context("failed to deserialize winners")?;
                let settings: DrawSettings =
                    serde_json::from_str(&settings).context("failed to deserialize settings")?;
                Ok(RaffleResult {
                    id,
                    list_id,
                    list_name,
                    drawn_at: parse_timestamp(&drawn_at)?,
                    winners,
                    settings,
                })
            })
            .collect()
    }

    /// Delete every history entry. Lists are untouched.
    pub fn clear_history(&self) -> Result<usize> {
        let conn = self.conn();
        let removed = conn
            .execute("DELETE FROM raffle_history", [])
            .context("failed to clear history")?;
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_participants(conn: &Connection, list_id: &str) -> Result<Vec<Participant>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, email, phone FROM participants
             WHERE list_id = ?1 ORDER BY position",
        )
        .context("failed to prepare participants query")?;

    let participants = stmt
        .query_map(params![list_id], |row| {
            Ok(Participant {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
            })
        })
        .context("failed to query participants")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map participant rows")?;

    Ok(participants)
}

fn next_position(tx: &Transaction<'_>, list_id: &str) -> Result<i64> {
    let max: Option<i64> = tx
        .query_row(
            "SELECT MAX(position) FROM participants WHERE list_id = ?1",
            params![list_id],
            |row| row.get(0),
        )
        .context("failed to read participant positions")?;
    Ok(max.map_or(0, |m| m + 1))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in database: {raw}"))
}
