use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "secmaster",
    version,
    about = "Resolve security identifiers to canonical securities"
)]
pub struct Cli {
    /// Database file; overrides SECMASTER_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one identifier.
    Resolve {
        /// ticker, cusip, isin, sedol, figi, composite_figi, share_class_figi, wertpapier
        #[arg(value_name = "TYPE")]
        identifier_type: String,
        #[arg(value_name = "VALUE")]
        identifier_value: String,
        #[arg(long)]
        exchange: Option<String>,
        /// Currency given to a placeholder when the identifier cannot be mapped.
        #[arg(long)]
        currency: Option<String>,
        /// Only look up; never create a security.
        #[arg(long, default_value_t = false)]
        no_create: bool,
    },
    /// Resolve a JSON array of requests read from a file, or stdin with `-`.
    ResolveBatch {
        input: PathBuf,
        #[arg(long, default_value_t = false)]
        no_create: bool,
    },
    /// Fill in missing oracle data for a security.
    Enrich { security_id: String },
    /// Free-text search against the oracle.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print a security and its identifiers.
    Show { security_id: String },
    /// Mark a security inactive.
    Deactivate { security_id: String },
}
