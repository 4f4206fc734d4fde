use clap::Parser;
use std::path::PathBuf;

/// Annotation file tool: validate, summarize and migrate VideoVanish
/// annotation JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Annotation JSON file to inspect
    #[arg(value_name = "ANNOTATIONS")]
    pub annotations: PathBuf,

    /// Re-save the file normalized: object ids materialized, duplicate
    /// keyframes merged, empty records pruned
    #[arg(short = 'r', long = "rewrite")]
    pub rewrite: bool,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
