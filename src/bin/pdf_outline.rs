//! CLI tool for extracting title and H1/H2 outlines from a folder of PDFs

use clap::Parser;
use pdf_outliner::{write_outlines, OutlineOptions};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "pdf-outline")]
#[command(version)]
#[command(about = "Write a JSON outline for every PDF in a folder", long_about = None)]
struct Cli {
    /// Folder containing the PDF files
    #[arg(value_name = "INPUT_DIR", default_value = "input")]
    input: PathBuf,

    /// Folder receiving one JSON file per PDF
    #[arg(value_name = "OUTPUT_DIR", default_value = "output")]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match write_outlines(&cli.input, &cli.output, &OutlineOptions::default()) {
        Ok(count) => {
            println!("Wrote {} outline(s) to {}", count, cli.output.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
