// Command dispatch and terminal output.
//
// Each subcommand maps onto one `RaffleApp` call; results are printed as
// plain text to the writer handed in by `main` (stdout in practice).

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use raffle_app::{RaffleApp, SuggestionSource};
use raffle_core::draw::RandomSource;
use raffle_core::model::{NewParticipant, Participant, RaffleList, RaffleResult};
use raffle_core::roster_csv;

use crate::cli::{Commands, DrawArgs, ListCommand, ParticipantCommand};

pub async fn run<S, E, W>(
    app: &mut RaffleApp<S, E>,
    command: Commands,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: SuggestionSource,
    E: RandomSource,
    W: Write,
{
    match command {
        Commands::Lists => {
            let lists = app.lists()?;
            if lists.is_empty() {
                writeln!(out, "No lists yet. Create one with `raffle list create <name>`.")?;
            }
            for list in &lists {
                writeln!(out, "{}", list_summary(list))?;
            }
        }
        Commands::List(cmd) => run_list(app, cmd, out)?,
        Commands::Participant(cmd) => run_participant(app, cmd, out)?,
        Commands::Import { list_id, file } => {
            let reader = File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            let count = app.import_csv(&list_id, reader)?;
            writeln!(out, "Imported {count} participant(s).")?;
        }
        Commands::Export { list_id, output } => {
            let list = app.list(&list_id)?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(roster_csv::export_file_name(&list.name)));
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            app.export_csv(&list_id, file)?;
            writeln!(
                out,
                "Exported {} participant(s) to {}",
                list.participants.len(),
                path.display()
            )?;
        }
        Commands::Draw(args) => run_draw(app, args, out).await?,
        Commands::Suggest { list_id } => {
            let suggestion = app.suggest_winner_count(&list_id).await?;
            writeln!(
                out,
                "Suggested {} winner(s). Repeats {}.",
                suggestion.suggested_winner_count,
                if suggestion.allow_repeats_suggestion {
                    "allowed"
                } else {
                    "not advised"
                }
            )?;
            if let Some(notes) = suggestion.additional_notes {
                writeln!(out, "{notes}")?;
            }
        }
        Commands::History { clear } => {
            if clear {
                let removed = app.clear_history()?;
                writeln!(out, "Cleared {removed} draw(s).")?;
            } else {
                let history = app.history()?;
                if history.is_empty() {
                    writeln!(out, "No draws recorded.")?;
                }
                for result in &history {
                    write!(out, "{}", format_result(result))?;
                }
            }
        }
    }
    Ok(())
}

fn run_list<S, E, W>(app: &RaffleApp<S, E>, cmd: ListCommand, out: &mut W) -> anyhow::Result<()>
where
    S: SuggestionSource,
    E: RandomSource,
    W: Write,
{
    match cmd {
        ListCommand::Create { name } => {
            let list = app.create_list(name.as_deref())?;
            writeln!(out, "Created \"{}\" ({})", list.name, list.id)?;
        }
        ListCommand::Show { list_id } => {
            let list = app.list(&list_id)?;
            writeln!(out, "{}", list_summary(&list))?;
            for p in &list.participants {
                writeln!(out, "  {}", participant_line(p))?;
            }
        }
        ListCommand::Rename { list_id, name } => {
            app.rename_list(&list_id, &name)?;
            writeln!(out, "Renamed {list_id}.")?;
        }
        ListCommand::Delete { list_id } => {
            app.delete_list(&list_id)?;
            writeln!(out, "Deleted {list_id}.")?;
        }
    }
    Ok(())
}

fn run_participant<S, E, W>(
    app: &RaffleApp<S, E>,
    cmd: ParticipantCommand,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: SuggestionSource,
    E: RandomSource,
    W: Write,
{
    match cmd {
        ParticipantCommand::Add {
            list_id,
            name,
            email,
            phone,
        } => {
            let added = app.add_participant(&list_id, NewParticipant { name, email, phone })?;
            writeln!(out, "Added {}", participant_line(&added))?;
        }
        ParticipantCommand::Rename {
            list_id,
            participant_id,
            name,
        } => {
            app.rename_participant(&list_id, &participant_id, &name)?;
            writeln!(out, "Renamed {participant_id}.")?;
        }
        ParticipantCommand::Remove {
            list_id,
            participant_id,
        } => {
            app.remove_participant(&list_id, &participant_id)?;
            writeln!(out, "Removed {participant_id}.")?;
        }
    }
    Ok(())
}

async fn run_draw<S, E, W>(
    app: &mut RaffleApp<S, E>,
    args: DrawArgs,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: SuggestionSource,
    E: RandomSource,
    W: Write,
{
    let winner_count = if args.suggest {
        let roster = app.list(&args.list_id)?.participants.len();
        let suggestion = app.suggest_winner_count(&args.list_id).await?;
        let count = suggestion.suggested_winner_count.min(roster);
        info!(
            suggested = suggestion.suggested_winner_count,
            count, "using suggested winner count"
        );
        writeln!(out, "Using suggested winner count: {count}")?;
        count
    } else {
        args.winners
            .unwrap_or(app.config().draw.default_winner_count)
    };

    let result = app.run_raffle(&args.list_id, winner_count, args.seed.as_deref())?;

    let delay = app.reveal_delay(result.winners.len());
    if !delay.is_zero() {
        writeln!(out, "Drawing {} winner(s)...", result.winners.len())?;
        out.flush()?;
        tokio::time::sleep(delay).await;
    }
    write!(out, "{}", format_result(&result))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn list_summary(list: &RaffleList) -> String {
    format!(
        "{}  {}  ({} participant{})",
        list.id,
        list.name,
        list.participants.len(),
        if list.participants.len() == 1 { "" } else { "s" }
    )
}

fn participant_line(p: &Participant) -> String {
    let mut line = format!("{}  {}", p.id, p.name);
    if let Some(email) = &p.email {
        line.push_str(&format!("  <{email}>"));
    }
    if let Some(phone) = &p.phone {
        line.push_str(&format!("  {phone}"));
    }
    line
}

/// Multi-line rendering of one draw: header, settings, numbered winners.
pub fn format_result(result: &RaffleResult) -> String {
    let mut text = format!(
        "{}  {}\n",
        result.drawn_at.format("%Y-%m-%d %H:%M:%S UTC"),
        result.list_name
    );
    text.push_str(&format!(
        "  winners: {}  seed: {}\n",
        result.settings.number_of_winners,
        result.settings.seed.as_deref().unwrap_or("(random)")
    ));
    for (rank, winner) in result.winners.iter().enumerate() {
        text.push_str(&format!("  {}. {}\n", rank + 1, winner.name));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clap::Parser;

    use raffle_core::config::{Config, CredentialsConfig, DrawConfig, LlmConfig};
    use raffle_core::db::Database;
    use raffle_llm::suggest::{RaffleSuggestion, SuggestionError, SuggestionRequest};

    use crate::cli::Cli;

    struct FixedSuggestion(usize);

    #[async_trait]
    impl SuggestionSource for FixedSuggestion {
        async fn suggest(
            &self,
            _request: &SuggestionRequest,
        ) -> Result<RaffleSuggestion, SuggestionError> {
            Ok(RaffleSuggestion {
                suggested_winner_count: self.0,
                allow_repeats_suggestion: false,
                additional_notes: Some("Keep it small.".into()),
            })
        }
    }

    fn test_app(suggested: usize) -> RaffleApp<FixedSuggestion> {
        let config = Config {
            db_path: ":memory:".into(),
            draw: DrawConfig {
                default_winner_count: 2,
                reveal_delay: false,
            },
            llm: LlmConfig {
                model: "claude-test".into(),
                suggestion_max_tokens: 100,
            },
            credentials: CredentialsConfig::default(),
        };
        RaffleApp::new(config, Database::open(":memory:").unwrap(), FixedSuggestion(suggested))
    }

    fn five_entrants(app: &RaffleApp<FixedSuggestion>) -> String {
        let list = app.create_list(Some("Gala")).unwrap();
        for name in ["A", "B", "C", "D", "E"] {
            app.add_participant(&list.id, NewParticipant::named(name)).unwrap();
        }
        list.id
    }

    async fn exec(app: &mut RaffleApp<FixedSuggestion>, args: &[&str]) -> String {
        let cli = Cli::try_parse_from(std::iter::once("raffle").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        run(app, cli.command, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn seeded_draw_prints_ranked_winners() {
        let mut app = test_app(1);
        let list_id = five_entrants(&app);

        let out = exec(&mut app, &["draw", &list_id, "-w", "3", "-s", "test"]).await;
        assert!(out.contains("Gala\n"));
        assert!(out.contains("winners: 3  seed: test\n"));
        assert!(out.ends_with("  1. A\n  2. C\n  3. B\n"), "got: {out}");
    }

    #[tokio::test]
    async fn draw_defaults_to_configured_winner_count() {
        let mut app = test_app(1);
        let list_id = five_entrants(&app);

        let out = exec(&mut app, &["draw", &list_id]).await;
        assert!(out.contains("seed: (random)"));
        assert_eq!(app.history().unwrap()[0].winners.len(), 2);
    }

    #[tokio::test]
    async fn suggested_count_is_capped_at_roster_size() {
        let mut app = test_app(9);
        let list_id = five_entrants(&app);

        let out = exec(&mut app, &["draw", &list_id, "--suggest", "--seed", "test"]).await;
        assert!(out.starts_with("Using suggested winner count: 5\n"));
        assert!(out.ends_with("  5. D\n"), "got: {out}");
    }

    #[tokio::test]
    async fn suggest_prints_notes() {
        let mut app = test_app(3);
        let list_id = five_entrants(&app);

        let out = exec(&mut app, &["suggest", &list_id]).await;
        assert_eq!(out, "Suggested 3 winner(s). Repeats not advised.\nKeep it small.\n");
    }

    #[tokio::test]
    async fn list_show_and_lists_output() {
        let mut app = test_app(1);
        let list_id = five_entrants(&app);
        exec(
            &mut app,
            &["participant", "add", &list_id, "Ada", "--email", "ada@x", "--phone", "555"],
        )
        .await;

        let lists = exec(&mut app, &["lists"]).await;
        assert_eq!(lists, format!("{list_id}  Gala  (6 participants)\n"));

        let show = exec(&mut app, &["list", "show", &list_id]).await;
        assert!(show.trim_end().ends_with("Ada  <ada@x>  555"), "got: {show}");
        assert_eq!(show.lines().count(), 7);
    }

    #[tokio::test]
    async fn history_lists_and_clears() {
        let mut app = test_app(1);
        let list_id = five_entrants(&app);
        assert_eq!(exec(&mut app, &["history"]).await, "No draws recorded.\n");

        exec(&mut app, &["draw", &list_id, "-w", "1", "-s", "test"]).await;
        let history = exec(&mut app, &["history"]).await;
        assert!(history.contains("  1. A\n"));

        assert_eq!(exec(&mut app, &["history", "--clear"]).await, "Cleared 1 draw(s).\n");
    }

    #[tokio::test]
    async fn failed_command_surfaces_error() {
        let mut app = test_app(1);
        let cli =
            Cli::try_parse_from(["raffle", "list", "rename", "list-missing", "X"]).unwrap();
        let mut out = Vec::new();
        let err = run(&mut app, cli.command, &mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "list not found: list-missing");
    }
}
