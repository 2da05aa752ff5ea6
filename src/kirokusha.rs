use colored::Colorize;
use env_logger::Env;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;
mod libshiken;
use crate::libshiken::db::{SqliteStorage, StateStorage, StorageError};
use crate::libshiken::joutai::QuizState;

#[derive(Parser, Debug)]
#[command(name = "記録者 (Kirokusha)")]
#[command(version, about = "Inspect and maintain the stored quiz session", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[arg(short, long, value_name = "FILE", default_value = "shiken.db")]
    db: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a summary of the stored session.
    Show,
    /// Write the stored session to a JSON file.
    Export { json: PathBuf },
    /// Replace the stored session with one read from a JSON file.
    Import { json: PathBuf },
    /// Forget the stored session.
    Clear,
}

#[derive(Debug, Error)]
enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no stored session")]
    NoSession,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    info!("{}", format!("Database at {:?}", args.db).cyan());
    let storage = match SqliteStorage::create_or_open(&args.db) {
        Ok(s) => s,
        Err(e) => {
            error!("{}{}", "Unable to open Database: ".red(), e);
            std::process::exit(1);
        }
    };

    let result = execute(&storage, args.command);
    if let Err(e) = storage.close() {
        warn!("[DB] {}", e);
    }
    if let Err(e) = result {
        error!("{}", e.to_string().red());
        std::process::exit(1);
    }
}

fn execute(storage: &SqliteStorage, command: Commands) -> Result<(), Error> {
    match command {
        Commands::Show => {
            let state = storage.load().ok_or(Error::NoSession)?;
            println!("{}", summary(&state));
        }
        Commands::Export { json } => export(storage, &json)?,
        Commands::Import { json } => {
            let content = std::fs::read_to_string(&json)?;
            let state = serde_json::from_str::<QuizState>(&content)?.restored();
            storage.save(&state)?;
            info!(
                "{}",
                format!("Imported session with {} questions", state.questions.len()).green()
            );
        }
        Commands::Clear => {
            storage.clear()?;
            info!("{}", "Stored session removed".green());
        }
    }
    Ok(())
}

fn export(storage: &SqliteStorage, dest: &Path) -> Result<(), Error> {
    let raw = storage.raw()?.ok_or(Error::NoSession)?;
    // Pretty-print when possible, otherwise hand back exactly what is stored.
    let out = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value)?,
        Err(e) => {
            warn!("{}", format!("Stored session is not valid JSON ({e}), exporting as-is").yellow());
            raw
        }
    };
    std::fs::write(dest, out)?;
    info!("{}", format!("Exported session to {:?}", dest).green());
    Ok(())
}

fn summary(state: &QuizState) -> String {
    let answered = state
        .questions
        .iter()
        .filter(|q| {
            state
                .selection_for(&q.id)
                .is_some_and(|selection| selection.values().any(|selected| *selected))
        })
        .count();
    let mut lines = vec![
        format!("status:    {:?}", state.status),
        format!(
            "question:  {} of {}",
            (state.current_question_index + 1).min(state.questions.len()),
            state.questions.len()
        ),
        format!("answered:  {}", answered),
        format!("submitted: {}", state.is_submitted),
    ];
    if state.is_submitted {
        lines.push(format!("score:     {:.1}", state.score));
    }
    if let Some(error) = &state.error {
        lines.push(format!("error:     {}", error));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libshiken::joutai::Action;
    use crate::libshiken::shitsumon::tests::capital_question;

    fn submitted() -> QuizState {
        QuizState::default()
            .apply(Action::FetchStarted)
            .apply(Action::FetchSucceeded(vec![
                capital_question("1"),
                capital_question("2"),
            ]))
            .apply(Action::SelectAnswer {
                question_id: "1".into(),
                answer_id: "answer_a".into(),
            })
            .apply(Action::SubmitQuiz)
    }

    #[test]
    fn summary_reports_progress_and_score() {
        let text = summary(&submitted());
        assert!(text.contains("status:    Loaded"));
        assert!(text.contains("question:  1 of 2"));
        assert!(text.contains("answered:  1"));
        assert!(text.contains("score:     50.0"));
    }

    #[test]
    fn export_then_import_into_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("session.json");

        let source = SqliteStorage::in_memory().unwrap();
        source.save(&submitted()).unwrap();
        execute(&source, Commands::Export { json: json.clone() }).unwrap();

        let target = SqliteStorage::in_memory().unwrap();
        execute(&target, Commands::Import { json }).unwrap();
        assert_eq!(target.load(), Some(submitted()));
    }

    #[test]
    fn show_and_export_need_a_session() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert!(matches!(
            execute(&storage, Commands::Show),
            Err(Error::NoSession)
        ));
        assert!(matches!(
            export(&storage, Path::new("unused.json")),
            Err(Error::NoSession)
        ));
    }

    #[test]
    fn import_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("broken.json");
        std::fs::write(&json, "[1, 2").unwrap();
        let storage = SqliteStorage::in_memory().unwrap();
        assert!(matches!(
            execute(&storage, Commands::Import { json }),
            Err(Error::Json(_))
        ));
        assert!(storage.load().is_none());
    }

    #[test]
    fn clear_forgets_the_session() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.save(&submitted()).unwrap();
        execute(&storage, Commands::Clear).unwrap();
        assert!(storage.raw().unwrap().is_none());
    }
}
