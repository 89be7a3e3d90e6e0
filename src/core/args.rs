use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Load the annotated dataset into the selected backends.
    Load {
        #[arg(short, long, value_enum, default_value_t = BackendSelection::All)]
        backend: BackendSelection,
    },
    /// Run the cross-backend query benchmark and write the report.
    Bench,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum BackendSelection {
    Mongo,
    Postgres,
    All,
}

impl BackendSelection {
    pub fn includes_mongo(self) -> bool {
        matches!(self, BackendSelection::Mongo | BackendSelection::All)
    }

    pub fn includes_postgres(self) -> bool {
        matches!(self, BackendSelection::Postgres | BackendSelection::All)
    }
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
