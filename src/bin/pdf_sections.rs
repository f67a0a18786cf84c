//! CLI tool for ranking PDF sections of each collection against its job

use clap::Parser;
use pdf_outliner::{process_collections, RankingOptions};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "pdf-sections")]
#[command(version)]
#[command(about = "Rank the sections of every document collection", long_about = None)]
struct Cli {
    /// Folder holding one sub-folder per collection
    #[arg(value_name = "INPUT_ROOT", default_value = "input")]
    input: PathBuf,

    /// Folder receiving `<collection>_analysis.json` reports
    #[arg(value_name = "OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// Number of sections kept per collection
    #[arg(long, default_value_t = 5)]
    top: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let options = RankingOptions {
        max_results: cli.top,
        ..Default::default()
    };

    match process_collections(&cli.input, &cli.output, &options) {
        Ok(count) => {
            println!("Wrote {} report(s) to {}", count, cli.output.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
