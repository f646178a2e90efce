//! Command-line administration for Swiss tournaments.
//!
//! Runs one engine operation per invocation against PostgreSQL, or a script
//! of operations (one per line) against either backend.

mod commands;
mod config;

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use anyhow::{Context, Error, bail};
use log::{debug, info};
use pico_args::Arguments;
use swiss_tournament::{
    Engine,
    db::{Database, MemoryStore, PgStore, Repository},
};

use commands::{Command, Output, split_words};
use config::{Backend, CliConfig};

const HELP: &str = "\
Administer Swiss-system tournaments

USAGE:
  st_cli [OPTIONS] COMMAND...
  st_cli [OPTIONS] script FILE|-

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --memory                 Use a process-local store (only useful with script)
  --migrate                Apply schema migrations first
  --json                   Print results as JSON

FLAGS:
  -h, --help               Print help information

COMMANDS:
  player add NAME [EMAIL]              player list
  player show ID                       player delete ID
  player find-name NAME                player find-email EMAIL
  player edit ID NAME [EMAIL]          player rank PLAYER TOURNAMENT RANKING
  tournament create NAME START|- END|- [PLAYER...]
  tournament edit ID NAME START|- END|-
  tournament list|show|start|complete|cancel|delete|rounds|standings ID
  tournament enroll|withdraw TOURNAMENT PLAYER
  round next TOURNAMENT                round complete|matches ROUND
  match start|cancel|show ID           match result ID SCORE1 SCORE2

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size [default: 10]
  DB_MIN_CONNECTIONS       Idle connections kept open [default: 1]
  DB_CONNECTION_TIMEOUT    Seconds to wait for a connection
  DB_IDLE_TIMEOUT          Seconds before an idle connection closes
  DB_MAX_LIFETIME          Seconds before a connection is recycled
  RUST_LOG                 Log level (e.g. info, swiss_tournament=debug)
";

fn print_output(output: &Output, json: bool) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string(output)?);
    } else {
        print!("{output}");
    }
    Ok(())
}

async fn run_line(engine: &Engine, words: &[String], json: bool) -> Result<(), Error> {
    let command = Command::parse(words)?;
    debug!("Running {command:?}");
    let output = command
        .run(engine)
        .await
        .map_err(|e| {
            debug!("Command failed: {e:?}");
            anyhow::anyhow!(e.client_message())
        })?;
    print_output(&output, json)
}

/// Run each non-empty, non-comment line; stop at the first failure
async fn run_script(engine: &Engine, source: &str, json: bool) -> Result<(), Error> {
    let reader: Box<dyn BufRead> = if source == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(source)
            .with_context(|| format!("Failed to open script {source}"))?;
        Box::new(BufReader::new(file))
    };

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let words = split_words(line).with_context(|| format!("line {}", number + 1))?;
        run_line(engine, &words, json)
            .await
            .with_context(|| format!("line {}: {line}", number + 1))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let memory = pargs.contains("--memory");
    let migrate = pargs.contains("--migrate");
    let json = pargs.contains("--json");

    let words: Vec<String> = pargs
        .finish()
        .into_iter()
        .map(|arg| arg.into_string())
        .collect::<Result<_, _>>()
        .map_err(|arg| anyhow::anyhow!("Argument is not valid UTF-8: {arg:?}"))?;
    if words.is_empty() {
        print!("{HELP}");
        std::process::exit(2);
    }

    env_logger::builder().format_target(false).init();

    let config = CliConfig::load(database_url, memory, json, migrate)?;

    let (repo, db): (Arc<dyn Repository>, Option<Database>) = match &config.backend {
        Backend::Memory => {
            info!("Using in-memory store");
            let store: Arc<dyn Repository> = Arc::new(MemoryStore::new());
            (store, None)
        }
        Backend::Postgres(db_config) => {
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            info!("Database connected successfully");
            if config.migrate {
                db.migrate().await?;
                info!("Migrations applied");
            }
            let store: Arc<dyn Repository> = Arc::new(PgStore::new(Arc::new(db.pool().clone())));
            (store, Some(db))
        }
    };
    let engine = Engine::new(repo);

    let result = match words.as_slice() {
        [script, source] if script == "script" => run_script(&engine, source, config.json).await,
        [script, ..] if script == "script" => bail!("Usage: st_cli script FILE|-"),
        _ if config.backend == Backend::Memory => {
            bail!("--memory keeps nothing between runs; use it with `script`")
        }
        _ => run_line(&engine, &words, config.json).await,
    };

    if let Some(db) = db {
        db.close().await;
    }
    result
}
