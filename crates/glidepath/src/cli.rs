use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glidepath_core::model::RunMode;

#[derive(Parser, Debug)]
#[command(name = "glidepath")]
#[command(about = "Monte Carlo retirement success estimates")]
pub struct Cli {
    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a Monte Carlo batch and print the result as JSON
    Run(RunArgs),
    /// Check a parameter file without simulating
    Validate {
        /// Parameter file (.yaml, .yml or .json)
        #[arg(short, long)]
        params: PathBuf,
    },
    /// Answer JSON tasks read line by line from stdin
    Worker {
        /// Worker threads (0 = all cores)
        #[arg(short, long, default_value_t = 0)]
        workers: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Parameter file (.yaml, .yml or .json)
    #[arg(short, long)]
    pub params: PathBuf,

    #[arg(short, long, default_value_t = 1000)]
    pub trials: usize,

    #[arg(short, long, value_enum, default_value_t = Mode::Score)]
    pub mode: Mode,

    /// Base seed; overrides the seed in the parameter file
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Stop dispatching trials after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Tax tables to use; overrides the parameter file
    #[arg(long)]
    pub policy_year: Option<i16>,

    /// Print the compact worker-protocol result instead of the full aggregate
    #[arg(long)]
    pub compact: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Score,
    Bands,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Score => RunMode::Score,
            Mode::Bands => RunMode::Bands,
        }
    }
}
