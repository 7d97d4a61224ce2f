use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seo-console")]
#[command(about = "Validate, preview and save page SEO metadata")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Work against an in-memory backend instead of the hosted one
    #[arg(long, global = true)]
    pub offline: bool,

    /// Author recorded on saves (overrides the configuration)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a page record read from a JSON file
    Validate { file: PathBuf },

    /// Render the search result and social card previews of a page record
    Preview { file: PathBuf },

    /// List the page records held by the backend
    Pages,

    /// Publish a page record
    Publish { file: PathBuf },

    /// Save a page record as a draft
    Draft { file: PathBuf },

    /// Edit a page record on disk with autosave running until Ctrl+C
    Edit {
        file: PathBuf,

        /// Slug to edit (defaults to the record's own slug)
        #[arg(short, long)]
        slug: Option<String>,

        /// Autosave interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// How often to check the file for changes, in milliseconds
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },
}
