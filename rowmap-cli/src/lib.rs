//! Command-line front end for a rowmap database.
//!
//! Wires a JSON config file and a JSON schema file into a [`Database`] and
//! runs one operation, rendering the result as JSON.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rowmap_db::{Database, DatabaseConfig, Entity, LoadMode, Record, Schema, Value};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "rowmap")]
#[command(about = "Read and write records through a rowmap schema")]
pub struct Args {
    /// Database config file (JSON). Defaults to a private in-memory store.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Schema file describing the record types (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// SQL script to run before the command (e.g. table definitions)
    #[arg(long)]
    pub init: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one record by its alternate key
    Get {
        record_type: String,
        key: String,
        #[arg(long, value_enum, default_value_t = Load::NoLazy)]
        load: Load,
    },
    /// Fetch every record, optionally filtered by trailing SQL clauses
    List {
        record_type: String,
        /// Clauses appended after FROM, e.g. "WHERE Active = ?1 ORDER BY Name"
        #[arg(long = "where", default_value = "")]
        clauses: String,
        /// Positional parameter for the clauses; repeatable
        #[arg(short, long = "param")]
        params: Vec<String>,
        #[arg(long, value_enum, default_value_t = Load::None)]
        load: Load,
    },
    /// Fetch an arbitrary record
    Random {
        record_type: String,
        #[arg(long, value_enum, default_value_t = Load::NoLazy)]
        load: Load,
    },
    /// Insert or update a record from a JSON object
    Save { record_type: String, json: String },
    /// Delete a record by its alternate key
    Delete { record_type: String, key: String },
}

/// Which relationships to resolve when reading.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Load {
    None,
    NoLazy,
    All,
}

impl From<Load> for LoadMode {
    fn from(load: Load) -> Self {
        match load {
            Load::None => LoadMode::None,
            Load::NoLazy => LoadMode::NoLazy,
            Load::All => LoadMode::All,
        }
    }
}

/// Opens the database described by `args`, runs the init script if any.
pub fn open(args: &Args) -> Result<Database> {
    let config = match &args.config {
        Some(path) => DatabaseConfig::from_file(path)?,
        None => DatabaseConfig::in_memory(),
    };
    let raw = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read schema {}", args.schema.display()))?;
    let schema = Schema::from_json(&raw).context("Failed to load schema")?;
    info!(types = schema.len(), dsn = %config.dsn, "opening database");

    let db = Database::open(config, schema)?;
    if let Some(init) = &args.init {
        let script = std::fs::read_to_string(init)
            .with_context(|| format!("Failed to read init script {}", init.display()))?;
        db.execute_batch(&script)?;
        debug!(path = %init.display(), "ran init script");
    }
    Ok(db)
}

/// Runs the parsed command and returns its JSON output.
pub fn run(args: &Args) -> Result<String> {
    let db = open(args)?;
    let output = match &args.command {
        Command::Get {
            record_type,
            key,
            load,
        } => render(db.select(record_type, parse_key(key), (*load).into())?),
        Command::List {
            record_type,
            clauses,
            params,
            load,
        } => {
            let params: Vec<Value> = params.iter().map(|p| parse_key(p)).collect();
            let records = db.select_all(record_type, clauses, &params, (*load).into())?;
            serde_json::Value::Array(records.iter().map(Record::to_json).collect())
        }
        Command::Random { record_type, load } => {
            render(db.select_random(record_type, (*load).into())?)
        }
        Command::Save { record_type, json } => {
            let json: serde_json::Value =
                serde_json::from_str(json).context("Record must be valid JSON")?;
            let mut entity = Entity::from_json(json)?;
            db.save(record_type, &mut entity)?;
            entity.to_json()
        }
        Command::Delete { record_type, key } => {
            let deleted = db.delete(record_type, parse_key(key))?;
            if deleted == 0 {
                bail!("No {record_type} with key {key}");
            }
            serde_json::json!({ "deleted": deleted })
        }
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn render(record: Option<Record>) -> serde_json::Value {
    record.map_or(serde_json::Value::Null, |r| r.to_json())
}

/// Integers bind as integers, everything else as text.
fn parse_key(raw: &str) -> Value {
    raw.parse::<i64>().map_or_else(|_| Value::from(raw), Value::from)
}
