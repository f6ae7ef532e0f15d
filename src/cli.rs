use std::path::PathBuf;

use clap::Parser;

use crate::config::parse_define;

#[derive(Parser, Debug)]
#[command(
    name = "stylechain",
    version,
    about = "Normalize deep selectors and compose style loader chains"
)]
pub struct Args {
    /// Files or directories to process
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Overlay the named `environments:` entry from the config
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,

    /// Define a global style variable (repeatable), overriding the config
    #[arg(long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Rewrite deep selectors in place
    #[arg(short = 'a', long)]
    pub write: bool,

    /// Print the composed stage pipeline for each file instead of normalizing
    #[arg(long)]
    pub pipeline: bool,

    /// Read source from stdin, using PATH for classification and display
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// Resource query for --stdin input (e.g. `vue&type=style&index=0&lang=less`)
    #[arg(long, value_name = "QUERY", requires = "stdin")]
    pub query: Option<String>,

    /// Print the resolved configuration as JSON, then exit
    #[arg(long)]
    pub print_config: bool,

    /// List files that would be processed, then exit
    #[arg(short = 'L', long)]
    pub list_target_files: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}
