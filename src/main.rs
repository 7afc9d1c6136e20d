use clap::Parser;
use log::info;
use snafu::ErrorCompat;

mod analysis;
mod args;

use crate::analysis::{run_analysis, AnalysisConfig, AnalysisResult};
use crate::args::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(e) = run(&args).await {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> AnalysisResult<()> {
    let config = AnalysisConfig::resolve(args)?;
    info!(
        "data: {}, output: {}, workers: {}",
        config.data_dir.display(),
        config.out_dir.display(),
        config.workers
    );
    run_analysis(&config).await
}
