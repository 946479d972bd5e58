use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gridstream")]
#[command(about = "Chunked file storage on top of a sqlite document store")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The sqlite database holding files and chunks
    #[arg(short, long, value_name = "FILE", default_value = "grid.sqlite")]
    pub db: PathBuf,

    /// Root namespace, overrides the config file
    #[arg(short, long)]
    pub root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = true)]
pub struct Select {
    /// File id, 24 hex characters
    #[arg(long)]
    pub id: Option<String>,

    /// Filename, the newest upload wins when several match
    #[arg(long)]
    pub filename: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stores a file, `-` reads stdin
    Put {
        path: PathBuf,

        /// Name to store under, defaults to the path's file name
        #[arg(long)]
        filename: Option<String>,

        #[arg(long)]
        chunk_size: Option<u32>,

        #[arg(long)]
        content_type: Option<String>,

        #[arg(long)]
        alias: Vec<String>,
    },

    /// Writes a file, or a byte range of it, to stdout or `--out`
    Get {
        #[command(flatten)]
        select: Select,

        /// First byte of the range
        #[arg(long)]
        start: Option<u64>,

        /// End of the range, exclusive
        #[arg(long)]
        end: Option<u64>,

        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Shows the metadata record of a file
    Stat {
        #[command(flatten)]
        select: Select,
    },

    /// Lists every file in the root
    Ls,

    /// Removes a file and its chunks
    Rm {
        #[command(flatten)]
        select: Select,
    },
}
