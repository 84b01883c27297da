mod output;

use blockbuster_error::{BlockbusterError, CliErrorKind};
use blockbuster_parser::{DecompressionPolicy, ParseOptions};
use blockbuster_report::report::DEFAULT_REFERENCE_THRESHOLD;
use blockbuster_report::{ReportOptions, build_report, load_from_path, render_report};
use clap::Parser;
use log::{debug, info};
use output::ColorChoice;
use std::io::Write;
use std::path::PathBuf;

/// Report how much memory and disk space the datablocks of a .blend file take
#[derive(Parser)]
#[command(name = "blockbuster", version)]
struct Cli {
    /// Path to the .blend file
    file: PathBuf,

    /// When to color the output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// List the users of datablocks larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_REFERENCE_THRESHOLD)]
    reference_threshold: u64,

    /// Maximum size to decompress into memory (in MB)
    #[arg(long, default_value = "256")]
    max_in_memory: usize,

    /// Enable verbose logging (can be used multiple times: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(e) = run_main() {
        use log::error;
        error!("{}", e.user_message());
        std::process::exit(1);
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .format(|buf, record| {
            let level_style = match record.level() {
                log::Level::Error => "\x1b[31mERROR\x1b[0m",
                log::Level::Warn => "\x1b[33mWARN\x1b[0m",
                log::Level::Info => "\x1b[32mINFO\x1b[0m",
                log::Level::Debug => "\x1b[36mDEBUG\x1b[0m",
                log::Level::Trace => "\x1b[35mTRACE\x1b[0m",
            };

            writeln!(buf, "[{}] {}", level_style, record.args())
        })
        .init();
}

fn run_main() -> Result<(), BlockbusterError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let parse_options = ParseOptions {
        decompression_policy: DecompressionPolicy {
            max_in_memory_bytes: cli.max_in_memory.saturating_mul(1024 * 1024),
            ..Default::default()
        },
    };
    let report_options = ReportOptions {
        reference_threshold: cli.reference_threshold,
    };

    info!("Loading {}", cli.file.display());
    let data = load_from_path(&cli.file, Some(&parse_options))?;
    debug!(
        "{} datablocks, {} scene objects",
        data.len(),
        data.objects().len()
    );

    let report = build_report(&data, &report_options);
    let colors = cli.color.enabled();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_report(&report, &mut out, colors).map_err(output_error)?;
    if !report.warnings.is_empty() {
        writeln!(out, "{}", output::skipped_summary(report.warnings.len(), colors))
            .map_err(output_error)?;
    }
    out.flush().map_err(output_error)?;
    Ok(())
}

fn output_error(e: std::io::Error) -> BlockbusterError {
    BlockbusterError::cli(
        format!("Failed to write report: {e}"),
        CliErrorKind::OutputFormatError,
    )
}
