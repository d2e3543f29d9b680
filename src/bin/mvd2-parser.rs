//! MVD2 demo parser CLI
//!
//! A command-line interface for inspecting, parsing and validating `.mvd2`
//! captures.
//!
//! ## Commands
//!
//! - `info` - Display map, players and event totals
//! - `parse` - Print the full summary as JSON
//! - `validate` - Check that a capture decodes (exit codes for scripting)
//!
//! Set `RUST_LOG=mvd2_parser=debug` to see aborted blocks and truncation.

use clap::{Parser, Subcommand, ValueEnum};
use mvd2_parser::blocks::StreamEnd;
use mvd2_parser::{decode, load_file, summarize, DemoSummary, ParseOptions, ParserError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// MVD2 demo parser
#[derive(Parser)]
#[command(name = "mvd2-parser")]
#[command(about = "Quake 2 multi-view demo (.mvd2) parser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display capture information
    Info {
        /// Path to the capture file
        file: PathBuf,
    },
    /// Parse a capture and print the summary
    Parse {
        /// Path to the capture file
        file: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Stop after this many frames (0 = all)
        #[arg(long, default_value_t = 0)]
        max_frames: usize,
        /// Leave the frame timeline out of the output
        #[arg(long)]
        no_frames: bool,
    },
    /// Validate a capture
    Validate {
        /// Path to the capture file
        file: PathBuf,
        /// Verbose error reporting
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Parse {
            file,
            output,
            max_frames,
            no_frames,
        } => cmd_parse(&file, &output, max_frames, no_frames),
        Commands::Validate { file, verbose } => cmd_validate(&file, verbose),
    }
}

fn describe_error(error: &ParserError) -> String {
    if error.is_fatal() {
        format!("Not a readable MVD2 capture: {error}")
    } else {
        format!("Error: {error}")
    }
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(file: &Path) -> ExitCode {
    match load_file(file, &ParseOptions::default()) {
        Ok(summary) => {
            print_info(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn print_info(summary: &DemoSummary) {
    println!("=== Capture Information ===\n");
    println!("Map: {}", summary.map);
    println!(
        "Frames: {} ({:.1}s)",
        summary.frame_count, summary.duration
    );
    println!();

    println!("Players ({}):", summary.player_names.len());
    for (client, name) in &summary.player_names {
        let team = summary
            .player_teams
            .get(name)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let kills = summary.kill_counts.get(name).copied().unwrap_or(0);
        let deaths = summary.death_counts.get(name).copied().unwrap_or(0);
        println!("  [{client:>3}] {name:<20} team {team}  {kills}/{deaths}");
    }
    if !summary.ghost_clients.is_empty() {
        println!("  unnamed clients: {:?}", summary.ghost_clients);
    }
    println!();

    println!("Events:");
    println!("  Kills: {}", summary.kills.len());
    println!("  Hits: {}", summary.hit_events.len());
    println!("  Awards: {}", summary.award_events.len());
    println!("  Round outcomes: {}", summary.round_events.len());
    println!(
        "  Score: {} - {}",
        summary.team_scores.get(&1).copied().unwrap_or(0),
        summary.team_scores.get(&2).copied().unwrap_or(0)
    );
}

// ============================================================================
// Parse Command Implementation
// ============================================================================

fn cmd_parse(file: &Path, output: &OutputFormat, max_frames: usize, no_frames: bool) -> ExitCode {
    let options = ParseOptions::default().with_max_frames(max_frames);
    let mut summary = match load_file(file, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            return ExitCode::FAILURE;
        }
    };

    if no_frames {
        summary.frames.clear();
    }

    let json = match output {
        OutputFormat::Json => serde_json::to_string(&summary),
        OutputFormat::Pretty => serde_json::to_string_pretty(&summary),
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing to JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

struct ValidationResult {
    container_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn cmd_validate(file: &Path, verbose: bool) -> ExitCode {
    let result = validate_capture(file);

    if verbose {
        print_validation_details(&result, file);
    } else {
        let status = if result.container_valid { "VALID" } else { "INVALID" };
        println!("{}: {}", file.display(), status);
    }

    if result.container_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate_capture(file: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        container_valid: false,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let data = match std::fs::read(file) {
        Ok(d) => d,
        Err(e) => {
            result.errors.push(format!("Failed to read file: {e}"));
            return result;
        }
    };

    let options = ParseOptions::default();
    let capture = match decode(&data, &options) {
        Ok(c) => c,
        Err(e) => {
            result.errors.push(describe_error(&e));
            return result;
        }
    };
    result.container_valid = true;

    let stats = capture.stats;
    if stats.blocks_aborted > 0 {
        result.warnings.push(format!(
            "{} of {} blocks aborted early",
            stats.blocks_aborted, stats.blocks
        ));
    }
    match stats.stream_end {
        Some(StreamEnd::Truncated { offset }) => {
            result
                .warnings
                .push(format!("Capture truncated at offset {offset}"));
        }
        Some(StreamEnd::EndOfBuffer) => {
            result
                .warnings
                .push("No terminator block".to_string());
        }
        Some(StreamEnd::Terminator) | None => {}
    }

    let summary = summarize(capture, &options);
    if summary.frame_count == 0 {
        result.warnings.push("No frames decoded".to_string());
    }
    if summary.player_names.is_empty() {
        result.warnings.push("No players found".to_string());
    }

    result
}

fn print_validation_details(result: &ValidationResult, file: &Path) {
    println!("Validating: {}\n", file.display());
    println!("Checks:");
    println!("  Container:    {}", status_icon(result.container_valid));

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in &result.errors {
            println!("  - {error}");
        }
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }

    println!(
        "\nResult: {}",
        if result.container_valid { "VALID" } else { "INVALID" }
    );
}

fn status_icon(valid: bool) -> &'static str {
    if valid {
        "[OK]"
    } else {
        "[FAIL]"
    }
}
