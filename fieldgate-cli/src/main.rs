//! Fieldgate - configuration checker and resolution inspector
//!
//! Loads a field configuration, runs the integrity pass, and prints
//! resolutions for a given actor and record as JSON.

mod args;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldgate::{
    membership_catalogue, EngineConfig, FieldEngine, FixedClock, Record, SystemClock,
};

use args::{Args, Command, Format};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the JSON output
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fieldgate={},warn", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(args.config.as_deref())?;

    if let Command::Dump { format } = &args.command {
        let text = match format {
            Format::Yaml => config.to_yaml()?,
            Format::Json => config.to_json()?,
        };
        println!("{}", text);
        return Ok(());
    }

    let engine = match build_engine(config, &args) {
        Ok(engine) => engine,
        Err(err) => {
            for finding in err.findings() {
                error!("{}", finding);
            }
            bail!("configuration rejected: {}", err);
        }
    };

    match &args.command {
        Command::Check => {
            info!(fingerprint = %engine.fingerprint(), "Configuration is valid");
            print_json(&serde_json::json!({
                "valid": true,
                "fingerprint": engine.fingerprint(),
                "fields": engine.registry().len(),
                "groups": engine.registry().groups().collect::<Vec<_>>(),
                "tables": engine.config().tables.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "forms": engine.config().forms.iter().map(|f| &f.name).collect::<Vec<_>>(),
            }))
        }
        Command::Dump { .. } => Ok(()),
        Command::Table { name, actor } => {
            print_json(&engine.resolve_table(name, &actor.to_actor())?)
        }
        Command::Rows { name, actor, records } => {
            let actor = actor.to_actor();
            let raw = read_json(records)?;
            let rows: Vec<Record> =
                serde_json::from_value(raw).context("records must be an array of objects")?;

            let mut resolved = Vec::new();
            for row in engine.filter_rows(name, &actor, &rows)? {
                if let Some(row) = engine.resolve_row(name, &actor, row)? {
                    resolved.push(row);
                }
            }
            info!(total = rows.len(), visible = resolved.len(), "Rows resolved");
            print_json(&resolved)
        }
        Command::Form { name, actor, record } => {
            let record = load_record(record.record.as_deref())?;
            print_json(&engine.resolve_form(name, &actor.to_actor(), &record)?)
        }
        Command::Validate { name, actor, record, stored } => {
            let actor = actor.to_actor();
            let record = load_record(record.record.as_deref())?;
            let issues = match stored {
                Some(path) => {
                    let stored = load_record(Some(path.as_path()))?;
                    engine.validate_update(name, &actor, &stored, &record)?
                }
                None => engine.validate_submission(name, &actor, &record)?,
            };
            print_json(&issues)?;
            if !issues.is_empty() {
                bail!("{} validation issue(s)", issues.len());
            }
            Ok(())
        }
        Command::Explain { field, actor, record } => {
            let actor = actor.to_actor();
            let record = load_record(record.record.as_deref())?;
            print_json(&serde_json::json!({
                "field": field,
                "view": engine.explain_view(field, &actor, &record)?,
                "edit": engine.explain_edit(field, &actor, &record)?,
                "options": engine.filter_options(field, &actor.roles)?,
                "required": engine.is_required(field, &record)?,
                "computed_value": engine.compute(field, &record)?,
            }))
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(membership_catalogue()),
    }
}

fn build_engine(config: EngineConfig, args: &Args) -> Result<FieldEngine, fieldgate::ConfigError> {
    match args.today {
        Some(today) => FieldEngine::with_clock(config, FixedClock(today)),
        None => FieldEngine::with_clock(config, SystemClock),
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn load_record(path: Option<&Path>) -> anyhow::Result<Record> {
    let Some(path) = path else {
        return Ok(Record::new());
    };
    match Record::from_json(read_json(path)?) {
        Some(record) => Ok(record),
        None => bail!("{} must hold a JSON object", path.display()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
