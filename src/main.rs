use anyhow::Result;
use citytally::{concurrency_from_arg, init_tracing_once, CityTally};
use clap::Parser;
use std::path::PathBuf;

/// Sum `name,value` records across every file in a directory.
#[derive(Parser, Debug)]
#[command(name = "citytally")]
#[command(version)]
#[command(about = "Aggregate `name,value` records from all files in a directory")]
struct Cli {
    /// Directory with the source files
    directory: PathBuf,

    /// Number of files processed at the same time (default 1; unusable values fall back to 1)
    #[arg(allow_negative_numbers = true)]
    max_concurrency: Option<String>,

    /// Write the result here instead of <DIRECTORY>/RESULT<ext>
    #[arg(long, short = 'o', conflicts_with = "no_write")]
    output: Option<PathBuf>,

    /// Aggregate only; don't write a result file
    #[arg(long)]
    no_write: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Print run statistics as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_once();

    let max_concurrency = concurrency_from_arg(cli.max_concurrency.as_deref());

    let mut job = CityTally::new()
        .dir(&cli.directory)
        .max_concurrency(max_concurrency)
        .write_result(!cli.no_write)
        .progress(cli.progress);
    if let Some(out) = &cli.output {
        job = job.output_path(out);
    }

    let (_tally, summary) = job.run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Files processed: {}", summary.files_processed);
        if summary.files_skipped > 0 {
            println!("Files skipped: {}", summary.files_skipped);
        }
        if summary.batches_lost > 0 {
            println!("Batches lost: {}", summary.batches_lost);
        }
        println!("Elapsed: {} ms", summary.elapsed_ms);
        println!("Max concurrency: {}", summary.max_concurrency);
        if let Some(p) = &summary.result_path {
            println!("Result: {}", p.display());
        }
    }
    Ok(())
}
