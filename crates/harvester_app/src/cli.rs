use std::path::PathBuf;

use clap::Parser;

use crate::config::RunMode;

#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(about = "Harvests contact emails for the companies listed in CSV tables")]
#[command(version)]
pub struct Cli {
    /// Input tables; added to the inputs listed in the config file
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// RON config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the staging and final artifacts
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of records in flight at once
    #[arg(short = 'j', long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Which link to follow and how to read the page
    #[arg(short, long, value_enum)]
    pub mode: Option<RunMode>,

    /// Base URL for relative links (detail mode)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log file path (default ./harvester.log)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    pub no_log_file: bool,

    /// Do not log to the terminal; the per-file summary is still printed
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose logging (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
