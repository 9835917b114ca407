//! CAN Signal Decoder CLI Application
//!
//! This is the command-line interface for the CAN signal decoder.
//! It uses the can-signal-decoder library and adds:
//! - TOML configuration files with command-line overrides
//! - Text and JSON-lines reports to stdout or a file
//! - Optional parallel decoding of large logs

use anyhow::{Context, Result};
use can_signal_decoder::{CandumpParser, Decoder, DecoderConfig, Payload};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::ReportWriter;

/// CAN Signal Decoder - Decode physical signal values from candump logs
#[derive(Parser, Debug)]
#[command(name = "can-signal-cli")]
#[command(about = "Decode CAN signals from a candump log using a DBC file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the DBC file describing the message
    #[arg(value_name = "DBC")]
    dbc: PathBuf,

    /// Path to the candump log file (`candump -l` format)
    #[arg(value_name = "CANDUMP")]
    candump: PathBuf,

    /// Output file for decoded signals (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Signal to decode (can be repeated; default: all signals)
    #[arg(short = 's', long = "signal", value_name = "SIGNAL")]
    signals: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Number of decimals for text output
    #[arg(long, value_name = "N")]
    precision: Option<usize>,

    /// Reject values outside the signal's declared range
    #[arg(long)]
    strict: bool,

    /// Decode every frame regardless of its CAN ID
    #[arg(long)]
    all_ids: bool,

    /// Decode payloads on all CPU cores
    #[arg(long)]
    parallel: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Signal Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_signal_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    let app_config = apply_overrides(app_config, &args);

    let decoder = Decoder::from_dbc(&args.dbc)
        .with_context(|| format!("Failed to load DBC file: {:?}", args.dbc))?;
    log::info!(
        "Message {} (0x{:X}) with {} signal(s)",
        decoder.frame().name,
        decoder.frame().id,
        decoder.frame().signals.len()
    );
    decoder
        .validate_config(&app_config.decoder)
        .context("Invalid signal selection")?;

    let output = &app_config.output;
    let mut report = ReportWriter::open(output.file.as_deref(), output.format, output.precision)?;

    if args.parallel {
        parallel_decode(&decoder, &app_config.decoder, &args, &mut report)?;
    } else {
        sequential_decode(&decoder, app_config.decoder.clone(), &args, &mut report)?;
    }

    let written = report.finish()?;
    log::info!("Decoded {} signal value(s)", written);

    Ok(())
}

/// Merge command-line flags over the configuration file
fn apply_overrides(mut config: AppConfig, args: &Args) -> AppConfig {
    if !args.signals.is_empty() {
        config.decoder.signals = Some(args.signals.clone());
    }
    if args.strict {
        config.decoder.enforce_range = true;
    }
    if args.all_ids {
        config.decoder.id_filter = false;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(precision) = args.precision {
        config.output.precision = precision;
    }
    if args.output.is_some() {
        config.output.file = args.output.clone();
    }
    config
}

/// Decode the log line by line, streaming results to the report
fn sequential_decode(
    decoder: &Decoder,
    config: DecoderConfig,
    args: &Args,
    report: &mut ReportWriter,
) -> Result<()> {
    let signals = decoder
        .decode_file(&args.candump, config)
        .with_context(|| format!("Failed to open candump log: {:?}", args.candump))?;

    for signal in signals {
        match signal {
            Ok(decoded) => report.write(&decoded)?,
            Err(e) => log::warn!("Skipping: {}", e),
        }
    }
    Ok(())
}

/// Read every payload first, then decode them with rayon in input order
fn parallel_decode(
    decoder: &Decoder,
    config: &DecoderConfig,
    args: &Args,
    report: &mut ReportWriter,
) -> Result<()> {
    let frames = CandumpParser::parse(&args.candump)
        .with_context(|| format!("Failed to open candump log: {:?}", args.candump))?;

    let payloads: Vec<Payload> = frames
        .filter_map(|frame| match frame {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Skipping: {}", e);
                None
            }
        })
        .collect();
    log::debug!("Decoding {} payload(s) in parallel", payloads.len());

    let results: Vec<_> = payloads
        .par_iter()
        .map(|payload| decoder.decode_payload(payload, config))
        .collect();

    for signal in results.into_iter().flatten() {
        match signal {
            Ok(decoded) => report.write(&decoded)?,
            Err(e) => log::warn!("Skipping: {}", e),
        }
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "can-signal-cli",
            "a.dbc",
            "b.log",
            "-s",
            "WheelSpeedFR",
            "--strict",
            "--all-ids",
            "-f",
            "json",
            "--precision",
            "2",
        ]);

        let config = apply_overrides(AppConfig::default(), &args);
        assert_eq!(config.decoder.signals, Some(vec!["WheelSpeedFR".to_string()]));
        assert!(config.decoder.enforce_range);
        assert!(!config.decoder.id_filter);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.precision, 2);
        assert!(config.output.file.is_none());
    }

    #[test]
    fn test_config_kept_without_flags() {
        let args = Args::parse_from(["can-signal-cli", "a.dbc", "b.log"]);
        let mut file_config = AppConfig::default();
        file_config.decoder.signals = Some(vec!["WheelSpeedFL".to_string()]);
        file_config.output.precision = 4;

        let config = apply_overrides(file_config, &args);
        assert_eq!(config.decoder.signals, Some(vec!["WheelSpeedFL".to_string()]));
        assert!(config.decoder.id_filter);
        assert_eq!(config.output.precision, 4);
    }
}
