// CSV import/export of participant rosters (`name,email,phone`).

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::model::{NewParticipant, Participant};

const HEADER: [&str; 3] = ["name", "email", "phone"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RosterCsvError {
    #[error("CSV must have a \"name\" column")]
    MissingNameColumn,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write `participants` as CSV with a `name,email,phone` header. Missing
/// contact fields are written as empty cells.
pub fn export_participants<W: Write>(
    writer: W,
    participants: &[Participant],
) -> Result<(), RosterCsvError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for p in participants {
        wtr.write_record([
            p.name.as_str(),
            p.email.as_deref().unwrap_or(""),
            p.phone.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Download name for a list export, e.g. `Spring_Gala_participants.csv`.
pub fn export_file_name(list_name: &str) -> String {
    let stem = list_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{stem}_participants.csv")
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Parse participants from CSV. The header is matched case-insensitively;
/// only `name` is required. Rows without a name are skipped.
pub fn import_participants<R: Read>(reader: R) -> Result<Vec<NewParticipant>, RosterCsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let column = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    };
    let name_idx = column("name").ok_or(RosterCsvError::MissingNameColumn)?;
    let email_idx = column("email");
    let phone_idx = column("phone");

    let mut participants = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed CSV row {}: {}", line + 2, e);
                continue;
            }
        };
        let name = field(&record, Some(name_idx));
        let Some(name) = name else {
            continue;
        };
        participants.push(NewParticipant {
            name,
            email: field(&record, email_idx),
            phone: field(&record, phone_idx),
        });
    }

    debug!(count = participants.len(), "parsed participants from CSV");
    Ok(participants)
}

/// Non-empty trimmed cell at `idx`, if any. Quotes the CSV parser left in
/// place (a quoted value preceded by spaces) are stripped.
fn field(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value).trim();
    (!value.is_empty()).then(|| value.to_string())
}
