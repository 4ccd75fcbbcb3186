//! songsorter CLI entry point

use clap::Parser;
use songsorter::config::{Cli, Settings};
use songsorter::pipeline::{self, PipelineResult};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments; a missing input prints usage and exits with 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(&cli);

    let settings = Settings::from_cli(&cli);

    match pipeline::run(&settings) {
        Ok(result) => {
            print_results(&result);
            println!();
            println!(
                "Summary: {} successful, {} failed, {} skipped (of {} total)",
                result.successful, result.failed, result.skipped, result.total_files
            );

            if result.failed > 0 || result.successful == 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "error".to_string()
    } else {
        cli.log_level().to_string().to_lowercase()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

/// Per-song segment table followed by the average and its mood
fn print_results(result: &PipelineResult) {
    for song in result.ordered_songs() {
        println!();
        match &song.path {
            Some(path) => println!("{} ({})", song.title, path.display()),
            None => println!("{}", song.title),
        }
        println!("{:>5} {:>9} {:>9} {:>9}", "index", "start_s", "arousal", "valence");
        for segment in &song.segments {
            println!(
                "{:>5} {:>9.2} {:>9.4} {:>9.4}",
                segment.index,
                segment.start_seconds,
                segment.emotion.arousal,
                segment.emotion.valence
            );
        }
        if let (Some(average), Some(mood)) = (song.average, song.mood) {
            println!("average {} -> {}", average, mood);
        }
    }
}
