//! Command-line arguments for the fieldgate tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use fieldgate::Actor;

/// Fieldgate - field-level authorization inspector
#[derive(Parser, Debug, Clone)]
#[command(name = "fieldgate")]
#[command(about = "Check field configurations and inspect resolutions")]
pub struct Args {
    /// Configuration file (YAML or JSON); the built-in membership catalogue when absent
    #[arg(long, env = "FIELDGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD); today when absent
    #[arg(long, env = "FIELDGATE_TODAY")]
    pub today: Option<NaiveDate>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load the configuration and run the integrity pass
    Check,

    /// Print the configuration document
    Dump {
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// Resolve a table view for an actor
    Table {
        name: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Filter and resolve rows of a table for an actor
    Rows {
        name: String,
        #[command(flatten)]
        actor: ActorArgs,
        /// JSON file holding an array of records
        #[arg(long)]
        records: PathBuf,
    },

    /// Resolve a form for an actor and record
    Form {
        name: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[command(flatten)]
        record: RecordArgs,
    },

    /// Validate a submitted record against a form
    Validate {
        name: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[command(flatten)]
        record: RecordArgs,
        /// JSON file holding the record as stored before the edit
        #[arg(long)]
        stored: Option<PathBuf>,
    },

    /// Explain the view and edit decision for one field
    Explain {
        field: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[command(flatten)]
        record: RecordArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

/// The acting identity.
#[derive(ClapArgs, Debug, Clone)]
pub struct ActorArgs {
    /// Actor identity, compared against the record owner
    #[arg(long = "actor", default_value = "")]
    pub id: String,

    /// Role held by the actor (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Region the actor is authorized for
    #[arg(long, conflicts_with = "all_regions")]
    pub region: Option<String>,

    /// Authorize the actor for every region
    #[arg(long)]
    pub all_regions: bool,
}

impl ActorArgs {
    pub fn to_actor(&self) -> Actor {
        let actor = Actor::new(self.id.clone()).with_roles(self.roles.iter().cloned());
        match (&self.region, self.all_regions) {
            (_, true) => actor.unrestricted(),
            (Some(region), false) => actor.in_region(region.clone()),
            (None, false) => actor,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RecordArgs {
    /// JSON file holding one record; an empty record when absent
    #[arg(long)]
    pub record: Option<PathBuf>,
}
