use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use log::{debug, error};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod cli;
mod libshiken;

use crate::libshiken::db::SqliteStorage;
use crate::libshiken::quizapi::{
    ApiConfig, FetchError, QuestionFile, QuestionSource, QuizApiClient, DEFAULT_ENDPOINT,
};
use crate::libshiken::store::QuizStore;

cfg_if::cfg_if! {
    if #[cfg(feature = "gui")] {
        mod gui;

        fn run(mut store: QuizStore, use_cli: bool) -> Result<(), Error> {
            if use_cli || cfg!(feature = "cli") {
                cli::cli_loop(&mut store)
            } else {
                gui::init_gui(store)
            }
        }
    } else {
        fn run(mut store: QuizStore, _use_cli: bool) -> Result<(), Error> {
            cli::cli_loop(&mut store)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "試験しよう！ (Shikenshiyō!)")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "shiken.db")]
    db: PathBuf,
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, env = "QUIZAPI_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Play questions from a local JSON file instead of the API.
    #[arg(short, long, value_name = "FILE")]
    questions: Option<PathBuf>,
    /// Use the terminal instead of a window.
    #[arg(long)]
    cli: bool,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error("cannot open session database: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("cannot set up question source: {0}")]
    Source(#[from] FetchError),
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "gui")]
    #[error("window error: {0}")]
    Gui(#[from] eframe::Error),
}

fn question_source(args: &Args) -> Result<Arc<dyn QuestionSource>, Error> {
    Ok(match &args.questions {
        Some(path) => Arc::new(QuestionFile { path: path.clone() }),
        None => Arc::new(QuizApiClient::new(ApiConfig {
            endpoint: args.endpoint.clone(),
            api_key: args.api_key.clone(),
        })?),
    })
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    let storage = match SqliteStorage::create_or_open(&args.db) {
        Ok(storage) => storage,
        Err(err) => {
            error!("[DB] Cannot open {:?}: {}", args.db, err);
            println!(
                "{}",
                format!("Cannot open the session database at {:?}.", args.db).bright_red()
            );
            return Err(err.into());
        }
    };
    debug!("[DB] Database Connection Successful!");

    let source = question_source(&args)?;
    let mut store = QuizStore::new(Box::new(storage), source);
    store.subscribe(|state| {
        debug!(
            "[Quiz] {:?}, question {}/{}, submitted: {}",
            state.status,
            state.current_question_index + 1,
            state.questions.len(),
            state.is_submitted
        )
    });

    run(store, args.cli)
}
