//! scqp-score CLI - Score South Carolina QSO Party contest logs.

use anyhow::{Context, Result};
use clap::Parser;
use scqp_score::{
    ContestRules, Recorded, Scorer, Validated, looks_like_qso, parse_qso, validate,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// scqp-score - Score South Carolina QSO Party contest logs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Contest log files to score, processed in the order given
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Rules file overriding the built-in SCQP rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Emit the final report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print each accepted QSO
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let rules = ContestRules::load(args.rules.as_deref())?;
    rules.validate()?;
    let mut scorer = Scorer::new(rules);

    for path in &args.files {
        process_file(path, &mut scorer, args.verbose)?;
    }

    let summary = scorer.finalize();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

/// Score every line of one log file, tagging any fatal error with the
/// file path and 1-based line number.
fn process_file(path: &Path, scorer: &mut Scorer, verbose: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("{}: failed to read line {}", path.display(), i + 1))?;
        process_line(&line, scorer, verbose)
            .with_context(|| format!("{}: line {}", path.display(), i + 1))?;
    }
    Ok(())
}

/// Process a single line from a log file.
///
/// Non-QSO lines are skipped silently; out-of-window contacts are dropped
/// with a notice; duplicates and conflicts are handled (and logged) by the
/// scorer. Anything else wrong with a QSO line is a fatal error.
fn process_line(line: &str, scorer: &mut Scorer, verbose: bool) -> Result<()> {
    // Quick filter for header/comment lines
    if !looks_like_qso(line) {
        return Ok(());
    }

    let Some(raw) = parse_qso(line)? else {
        return Ok(());
    };

    match validate(raw, scorer.rules())? {
        Validated::OutOfWindow(timestamp) => {
            info!("Ignoring QSO: out of time range {}", timestamp);
        }
        Validated::Accepted(qso) => {
            let echo = verbose.then(|| qso.to_string());
            if scorer.record(qso) == Recorded::Accepted
                && let Some(echo) = echo
            {
                println!("{}", echo);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> Scorer {
        Scorer::new(ContestRules::default())
    }

    #[test]
    fn test_process_line_valid_qso() {
        let mut scorer = scorer();
        let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 CT";

        process_line(line, &mut scorer, false).unwrap();

        let summary = scorer.finalize();
        assert_eq!(summary.unique_count, 1);
        assert_eq!(summary.score, 4);
    }

    #[test]
    fn test_process_line_header_skipped() {
        let mut scorer = scorer();
        process_line("CALLSIGN: K4YTZ", &mut scorer, false).unwrap();
        process_line("", &mut scorer, false).unwrap();

        assert_eq!(scorer.finalize().qso_count, 0);
    }

    #[test]
    fn test_process_line_out_of_window_dropped() {
        let mut scorer = scorer();
        let line = "QSO: 14038 CW 2023-02-24 1502 K4YTZ 599 RICH W1AW 599 CT";

        process_line(line, &mut scorer, false).unwrap();

        assert_eq!(scorer.finalize().qso_count, 0);
    }

    #[test]
    fn test_process_line_invalid_exchange_is_fatal() {
        let mut scorer = scorer();
        let line = "QSO: 14038 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 XX";

        assert!(process_line(line, &mut scorer, false).is_err());
    }

    #[test]
    fn test_two_file_run_with_duplicate() {
        // The duplicate scenario across two submitted files: the repeat
        // counts as a QSO but not as a unique, and is not scored.
        let file1 = ["START-OF-LOG: 3.0",
            "QSO: 14000 CW 2023-02-25 1502 K4YTZ 599 RICH W1AW 599 GA"];
        let file2 = ["QSO: 14000 CW 2023-02-25 1507 K4YTZ 599 RICH W1AW 599 GA",
            "END-OF-LOG:"];

        let mut scorer = scorer();
        for line in file1.iter().chain(file2.iter()) {
            process_line(line, &mut scorer, false).unwrap();
        }

        let summary = scorer.finalize();
        assert_eq!(summary.qso_count, 2);
        assert_eq!(summary.unique_count, 1);
        assert_eq!(summary.qso_points, 4);
        assert_eq!(summary.multiplier, 1);
        assert_eq!(summary.score, 4);
    }
}
