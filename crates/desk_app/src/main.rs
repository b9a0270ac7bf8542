use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use rusqlite::Connection;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use desk_ai::embeddings::OllamaEmbedder;
use desk_ai::faq::{FaqIndex, FaqSet};
use desk_ai::indexing::build_index;
use desk_ai::language::WhatlangDetector;
use desk_ai::llm::OllamaLlm;
use desk_ai::ollama::OllamaClient;
use desk_ai::pipeline::{HistorySink, NoopHistorySink, PipelineContext, PipelineSettings};
use desk_ai::retrieve::{ArtifactStore, Retriever, VectorIndex};
use desk_ai::translate::LlmTranslator;
use desk_core::error::AppError;
use desk_core::{db, history, users};

mod cli;
mod config;

use cli::{Cli, Command, IndexCommand};
use config::{AppConfig, WELCOME_MESSAGE};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Ask { user, query } => cmd_ask(&config, user.as_deref(), &query),
        Command::Chat { user } => cmd_chat(&config, user.as_deref()),
        Command::Index(IndexCommand::Build { corpus }) => cmd_index_build(&config, corpus.as_deref()),
        Command::Index(IndexCommand::Status) => cmd_index_status(&config),
        Command::FaqCheck => cmd_faq_check(&config),
        Command::UserAdd { username, password } => cmd_user_add(&config, &username, &password),
        Command::History { username } => cmd_history(&config, &username),
    }
}

/// Chat-history sink over the shared SQLite connection. `Connection` is not
/// `Sync`, so the sink serializes writes behind a mutex.
struct SqliteHistorySink {
    conn: Mutex<Connection>,
}

impl HistorySink for SqliteHistorySink {
    fn record(&self, user_id: i64, query: &str, response: &str) -> Result<(), AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::new("DB_LOCK_POISONED", "History connection lock poisoned"))?;
        history::record_exchange(&conn, user_id, query, response).map(|_| ())
    }
}

fn open_db(config: &AppConfig) -> Result<Connection, AppError> {
    if let Some(parent) = config.paths.db_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::new("DB_OPEN_FAILED", "Failed to create database directory")
                .with_details(format!("path={}; err={}", parent.display(), e))
        })?;
    }
    let mut conn = db::open(&config.paths.db_file)?;
    db::migrate(&mut conn)?;
    Ok(conn)
}

fn resolve_user(conn: &Connection, username: &str) -> Result<users::User, AppError> {
    users::find_by_username(conn, username)?.ok_or_else(|| {
        AppError::new("USER_NOT_FOUND", "Unknown username; create it with `deskbot user-add`")
            .with_details(format!("username={username}"))
    })
}

/// Build the immutable pipeline context: load FAQ files, embed the question
/// set, load the index artifact pair, wire the model capabilities.
fn build_pipeline(
    config: &AppConfig,
    history: Box<dyn HistorySink>,
) -> Result<PipelineContext, AppError> {
    let client = OllamaClient::new(&config.models.base_url)?;
    let embedder = OllamaEmbedder::new(client.clone());
    let llm = OllamaLlm::new(client.clone());
    let translator = LlmTranslator::new(
        OllamaLlm::new(client.clone()),
        config.models.translate_model.clone(),
    );

    let faq_set = FaqSet::load_files(&config.paths.faq_files)?;
    info!(entries = faq_set.len(), "faq loaded");
    let faq = FaqIndex::build(&faq_set, &embedder, &config.models.embed_model)?;

    let store = ArtifactStore::open(config.paths.data_dir.clone());
    let retriever = match Retriever::from_store(&store) {
        Ok((retriever, manifest)) => {
            if manifest.model != config.models.embed_model {
                warn!(
                    index_model = %manifest.model,
                    configured = %config.models.embed_model,
                    "index was built with a different embedding model"
                );
            }
            info!(rows = manifest.rows, dims = manifest.dims, "index loaded");
            retriever
        }
        Err(e) if e.code == "INDEX_NOT_READY" => {
            warn!("no index artifacts; retrieval will always fall back");
            Retriever::new(VectorIndex::new(0), Vec::new())?
        }
        Err(e) => return Err(e),
    };

    Ok(PipelineContext::new(
        PipelineSettings {
            embed_model: config.models.embed_model.clone(),
            generate_model: config.models.generate_model.clone(),
        },
        faq,
        retriever,
        Box::new(WhatlangDetector),
        Box::new(translator),
        Box::new(embedder),
        Box::new(llm),
        history,
    ))
}

/// Sink and correlation id for an optional username. Anonymous queries get
/// the noop sink and user id 0.
fn history_for(config: &AppConfig, username: Option<&str>) -> Result<(i64, Box<dyn HistorySink>), AppError> {
    match username {
        Some(name) => {
            let conn = open_db(config)?;
            let user = resolve_user(&conn, name)?;
            history::seed_welcome(&conn, user.id, WELCOME_MESSAGE)?;
            Ok((user.id, Box::new(SqliteHistorySink { conn: Mutex::new(conn) })))
        }
        None => Ok((0, Box::new(NoopHistorySink))),
    }
}

fn cmd_ask(config: &AppConfig, username: Option<&str>, query: &str) -> Result<(), AppError> {
    let (user_id, sink) = history_for(config, username)?;
    let pipeline = build_pipeline(config, sink)?;
    println!("{}", pipeline.respond(user_id, query));
    Ok(())
}

fn cmd_chat(config: &AppConfig, username: Option<&str>) -> Result<(), AppError> {
    let (user_id, sink) = history_for(config, username)?;
    let pipeline = build_pipeline(config, sink)?;

    println!("{WELCOME_MESSAGE}");
    println!("(type 'exit' to quit)");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        println!("{}", pipeline.respond(user_id, query));
    }
    Ok(())
}

fn cmd_index_build(config: &AppConfig, corpus: Option<&Path>) -> Result<(), AppError> {
    let client = OllamaClient::new(&config.models.base_url)?;
    client.health_check()?;
    let embedder = OllamaEmbedder::new(client);

    let corpus_dir = corpus.unwrap_or(config.paths.corpus_dir.as_path());
    let store = ArtifactStore::open(config.paths.data_dir.clone());
    let built_at = now_rfc3339()?;

    let manifest = build_index(
        corpus_dir,
        &store,
        &embedder,
        &config.models.embed_model,
        &built_at,
    )?;
    println!(
        "indexed {} chunks ({} dims, model {}) at {}",
        manifest.rows, manifest.dims, manifest.model, manifest.built_at
    );
    Ok(())
}

fn cmd_index_status(config: &AppConfig) -> Result<(), AppError> {
    let store = ArtifactStore::open(config.paths.data_dir.clone());
    match store.manifest()? {
        Some(m) => println!(
            "ready: {} rows, {} dims, model {}, built {}",
            m.rows, m.dims, m.model, m.built_at
        ),
        None => println!("not built"),
    }
    Ok(())
}

fn cmd_faq_check(config: &AppConfig) -> Result<(), AppError> {
    let set = FaqSet::load_files(&config.paths.faq_files)?;
    for (question, answer) in set.entries() {
        println!("Q: {question}");
        println!("A: {answer}");
    }
    println!("{} entries after precedence", set.len());
    Ok(())
}

fn cmd_user_add(config: &AppConfig, username: &str, password: &str) -> Result<(), AppError> {
    let conn = open_db(config)?;
    let user = users::create_user(&conn, username, password)?;
    println!("created user {} (id {})", user.username, user.id);
    Ok(())
}

fn cmd_history(config: &AppConfig, username: &str) -> Result<(), AppError> {
    let conn = open_db(config)?;
    let user = resolve_user(&conn, username)?;
    for row in history::list_for_user(&conn, user.id)? {
        if row.message == history::WELCOME_SENTINEL {
            println!("[{}] bot: {}", row.created_at, row.response);
        } else {
            println!("[{}] {}: {}", row.created_at, user.username, row.message);
            println!("[{}] bot: {}", row.created_at, row.response);
        }
    }
    Ok(())
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("TIME_FORMAT_FAILED", "Failed to format current time")
            .with_details(e.to_string())
    })
}
