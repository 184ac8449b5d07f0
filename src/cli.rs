//! Command-line interface definitions for ReguWatch.
//!
//! Two subcommands drive the core: `sync` runs one sync cycle and `list`
//! prints a filtered, sorted view of the store. Global options can also be
//! given through environment variables.
//!
//! ```sh
//! reguwatch sync
//! reguwatch --store ./data/updates.json sync --source OSFI --source IAIS
//! reguwatch list --keyword capital --sort title-asc
//! reguwatch list --auto-only --type "RSS Feed" --json
//! ```

use reguwatch::models::{RecordType, Source};
use reguwatch::query::SortMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "REGUWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path of the JSON store (overrides the settings file)
    #[arg(short, long, env = "REGUWATCH_STORE", global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every selected source and merge new items into the store
    Sync {
        /// Source to sync (repeatable); defaults to the enabled sources
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<Source>,
    },
    /// Print stored items matching the given filters
    List {
        /// Case-insensitive keyword matched against title and summary
        #[arg(short, long)]
        keyword: Option<String>,

        /// Source to include (repeatable); defaults to all
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<Source>,

        /// Update type to include (repeatable); defaults to all
        #[arg(long = "type", value_parser = parse_record_type)]
        types: Vec<RecordType>,

        /// Only items that look auto-insurance related
        #[arg(long)]
        auto_only: bool,

        /// Sort order; `date-*` compare the display strings, `ingested-*` the fetch time
        #[arg(long, value_enum, default_value_t = SortMode::IngestedDesc)]
        sort: SortMode,

        /// Print the view as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_source(s: &str) -> Result<Source, String> {
    s.parse()
}

fn parse_record_type(s: &str) -> Result<RecordType, String> {
    s.parse()
}
