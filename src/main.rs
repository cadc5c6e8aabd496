use anyhow::Result;
use chrono::Local;
use clap::Parser;
use env_logger::Env;
use lite_notebooks::{NotebookProcessor, ProcessConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

/// Process notebooks for JupyterLite.
///
/// Rewrites admonitions, exercise and solution markers in the book's MyST
/// pages, drops cells tagged for removal, sets the Pyodide kernel and writes
/// the notebooks plus `jupyter-lite.json` to OUTPUT_DIR.
#[derive(Debug, Parser)]
#[command(name = "lite-notebooks", version, about)]
struct Cli {
    /// Directory to which we will output notebooks
    output_dir: PathBuf,

    /// Directory containing the `_config.yml` file
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Number of pages converted in parallel (default: one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Convert the remaining pages when one fails
    #[arg(long)]
    keep_going: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] ({}): {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

pub fn main() {
    init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ProcessConfig::load(&cli.config_dir)?;

    let processor = NotebookProcessor::new(config)
        .with_jobs(cli.jobs.unwrap_or(0))
        .keep_going(cli.keep_going);
    let summary = processor.run(&cli.output_dir)?;

    if !summary.failed.is_empty() {
        log::warn!(
            "{} page(s) were skipped: {}",
            summary.failed.len(),
            summary.failed.join(", ")
        );
    }

    Ok(())
}
