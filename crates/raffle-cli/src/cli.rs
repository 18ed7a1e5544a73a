// Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "raffle")]
#[command(about = "Manage participant lists and run fair, reproducible raffle draws")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show every list with its participant count
    Lists,
    /// Create, show, rename or delete a list
    #[command(subcommand)]
    List(ListCommand),
    /// Add, rename or remove participants
    #[command(subcommand)]
    Participant(ParticipantCommand),
    /// Append participants from a CSV file with a `name` column
    Import {
        list_id: String,
        file: PathBuf,
    },
    /// Write a list's participants as CSV
    Export {
        list_id: String,
        #[arg(long, short, help = "Output file (defaults to <list name>_participants.csv)")]
        output: Option<PathBuf>,
    },
    /// Draw winners from a list and record the result
    Draw(DrawArgs),
    /// Ask the AI for a winner count suited to a list
    Suggest { list_id: String },
    /// Show past draws, newest first
    History {
        #[arg(long, help = "Delete all recorded draws", default_value_t = false)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    Create {
        /// List name (defaults to "Untitled list")
        name: Option<String>,
    },
    Show {
        list_id: String,
    },
    Rename {
        list_id: String,
        name: String,
    },
    Delete {
        list_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ParticipantCommand {
    Add {
        list_id: String,
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Rename {
        list_id: String,
        participant_id: String,
        name: String,
    },
    Remove {
        list_id: String,
        participant_id: String,
    },
}

#[derive(Debug, Args)]
pub struct DrawArgs {
    pub list_id: String,
    #[arg(long, short, help = "Number of winners (defaults to draw.default_winner_count)")]
    pub winners: Option<usize>,
    #[arg(long, short, help = "Seed for a reproducible draw")]
    pub seed: Option<String>,
    #[arg(
        long,
        help = "Use the AI-suggested winner count",
        default_value_t = false,
        conflicts_with = "winners"
    )]
    pub suggest: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("raffle").chain(args.iter().copied()))
    }

    #[test]
    fn parses_draw_with_seed_and_count() {
        let cli =
            parse(&["draw", "list-1", "--winners", "3", "--seed", "spring gala"]).unwrap();
        match cli.command {
            Commands::Draw(args) => {
                assert_eq!(args.list_id, "list-1");
                assert_eq!(args.winners, Some(3));
                assert_eq!(args.seed.as_deref(), Some("spring gala"));
                assert!(!args.suggest);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn suggest_conflicts_with_explicit_winners() {
        assert!(parse(&["draw", "list-1", "--suggest"]).is_ok());
        assert!(parse(&["draw", "list-1", "--suggest", "-w", "2"]).is_err());
    }

    #[test]
    fn list_create_name_is_optional() {
        match parse(&["list", "create"]).unwrap().command {
            Commands::List(ListCommand::Create { name }) => assert_eq!(name, None),
            other => panic!("unexpected command: {other:?}"),
        }
        match parse(&["list", "create", "Spring Gala"]).unwrap().command {
            Commands::List(ListCommand::Create { name }) => {
                assert_eq!(name.as_deref(), Some("Spring Gala"))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn participant_add_takes_optional_contacts() {
        let cli = parse(&[
            "participant", "add", "list-1", "Ada", "--email", "ada@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Participant(ParticipantCommand::Add {
                list_id,
                name,
                email,
                phone,
            }) => {
                assert_eq!(list_id, "list-1");
                assert_eq!(name, "Ada");
                assert_eq!(email.as_deref(), Some("ada@example.com"));
                assert_eq!(phone, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_winner_count() {
        assert!(parse(&["draw", "list-1", "--winners", "three"]).is_err());
    }

    #[test]
    fn history_clear_flag() {
        match parse(&["history", "--clear"]).unwrap().command {
            Commands::History { clear } => assert!(clear),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
