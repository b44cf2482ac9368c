//! Command-line front end for Simple Notes.
//!
//! # Responsibility
//! - Load configuration (`.env` first), open the local store and build one
//!   repository session per invocation.
//! - Expose note CRUD, the repository mode, and an interactive shell that
//!   drives the application controller.

mod shell;

use clap::{Args, Parser, Subcommand};
use simple_notes_core::{
    default_log_level, init_logging, open_db, Note, NotePayload, NotesApp, NotesConfig,
    NotesRepository, SqliteKeyValueStore,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "simple-notes", version, about = "Notes with remote API and local fallback")]
struct Cli {
    /// SQLite file for local notes (overrides SIMPLE_NOTES_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Print notes as JSON instead of text lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List notes, most recently updated first when served locally.
    List,
    /// Show one note.
    Show { id: String },
    /// Create a note.
    Create(FieldArgs),
    /// Update the given fields of a note.
    Update {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a note (unknown ids succeed).
    Delete { id: String },
    /// Print where notes are served from: remote or stub.
    Mode,
    /// Interactive session over the notes controller.
    Shell,
}

#[derive(Debug, Args)]
struct FieldArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
}

impl From<FieldArgs> for NotePayload {
    fn from(value: FieldArgs) -> Self {
        Self {
            title: value.title,
            content: value.content,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut config = NotesConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    start_logging(cli.log_level.as_deref(), cli.log_dir)?;

    let conn = open_db(&config.db_path).map_err(|err| {
        format!(
            "failed to open local store `{}`: {err}",
            config.db_path.display()
        )
    })?;
    let repo = NotesRepository::new(&config, SqliteKeyValueStore::new(conn));
    let json = cli.json;

    match cli.command {
        Command::List => {
            let notes = repo.list_notes().await.map_err(|err| err.to_string())?;
            print_notes(&notes, json)?;
        }
        Command::Show { id } => match repo.get_note(&id).await.map_err(|err| err.to_string())? {
            Some(note) => print_note(&note, json)?,
            None => println!("not found: {id}"),
        },
        Command::Create(fields) => {
            let created = repo
                .create_note(&fields.into())
                .await
                .map_err(|err| err.to_string())?;
            match created {
                Some(note) => print_note(&note, json)?,
                None => println!("created"),
            }
        }
        Command::Update { id, fields } => {
            let updated = repo
                .update_note(&id, &fields.into())
                .await
                .map_err(|err| err.to_string())?;
            match updated {
                Some(note) => print_note(&note, json)?,
                None => println!("not found: {id}"),
            }
        }
        Command::Delete { id } => {
            repo.delete_note(&id).await.map_err(|err| err.to_string())?;
            println!("deleted: {id}");
        }
        Command::Mode => println!("{}", repo.get_mode().await),
        Command::Shell => {
            let mut app = NotesApp::new(repo);
            shell::run(&mut app).await?;
        }
    }
    Ok(())
}

fn start_logging(level: Option<&str>, log_dir: Option<PathBuf>) -> Result<(), String> {
    let log_dir = log_dir.unwrap_or_else(|| std::env::temp_dir().join("simple_notes").join("logs"));
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log dir is not valid UTF-8: {}", log_dir.display()))?
        .to_string();
    init_logging(level.unwrap_or(default_log_level()), &log_dir)
}

pub(crate) fn print_notes(notes: &[Note], json: bool) -> Result<(), String> {
    if json {
        let encoded = serde_json::to_string_pretty(notes).map_err(|err| err.to_string())?;
        println!("{encoded}");
        return Ok(());
    }
    for note in notes {
        println!("{}", summary_line(note));
    }
    Ok(())
}

pub(crate) fn print_note(note: &Note, json: bool) -> Result<(), String> {
    if json {
        let encoded = serde_json::to_string_pretty(note).map_err(|err| err.to_string())?;
        println!("{encoded}");
        return Ok(());
    }
    println!("{}", summary_line(note));
    if !note.content.is_empty() {
        println!();
        println!("{}", note.content);
    }
    Ok(())
}

pub(crate) fn summary_line(note: &Note) -> String {
    format!(
        "{}\t{}\t{}",
        note.id,
        note.updated_at.as_deref().unwrap_or("-"),
        note.display_title()
    )
}
