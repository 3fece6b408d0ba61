//! pfinder: find the processes behind ports, open files, PIDs and names.

use clap::Parser;
use pf_common::{format_error_human, Error, OutputFormat, StructuredError};
use pf_config::{load_settings, validate_settings, PathMatch, Settings, Strategy};
use pf_core::collect::{default_port_lookup, list_processes, UserTable};
use pf_core::exit_codes::ExitCode;
use pf_core::locate::{LocateOptions, Locator};
use pf_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use pf_core::output::{render_failures, render_report};
use pf_core::query::QueryEngine;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

const TARGET_HELP: &str = "\
Each TARGET is read as the first of these forms that applies:

  :PORT      processes with a TCP socket bound locally on PORT (1-65535)
  PATH       an existing file; the process holding it open
  PID        a decimal process id
  PATTERN    executable names matching this case-insensitive regex
             (an invalid regex is matched literally)

Results from all targets are merged; each process is listed once.

Exit status: 0 found, 1 nothing matched, 10 usage, 11 config,
12 unsupported platform, 21 process enumeration failed.";

/// Find processes by port, open file, PID or executable name
#[derive(Parser, Debug)]
#[command(name = "pfinder")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true, after_long_help = TARGET_HELP)]
struct Cli {
    /// Ports (:PORT), file paths, PIDs or name patterns
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<String>,

    /// Output format [default: from config, else human]
    #[arg(long, short = 'f')]
    format: Option<OutputFormat>,

    /// Config file (JSON) [default: $PFINDER_CONFIG, then the config dirs]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Descriptor scan strategy: auto, sequential, parallel
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Descriptor target comparison: literal, canonical
    #[arg(long)]
    path_match: Option<PathMatch>,

    /// Worker threads for the parallel scan
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Stop the parallel scan after the first owner is found
    #[arg(long)]
    cancel_on_match: bool,

    /// Report pfinder itself when it holds a queried file
    #[arg(long)]
    include_self: bool,

    /// Root of the per-process directories
    #[arg(long, value_name = "DIR")]
    proc_root: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence diagnostics
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Diagnostic log format on stderr: human, jsonl
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Explicit level from flags; None leaves it to the environment.
    fn log_level(&self) -> Option<LogLevel> {
        if self.verbose == 0 && !self.quiet {
            return None;
        }
        Some(LogLevel::from_verbosity(self.verbose, self.quiet))
    }

    /// Fold the command-line overrides into the loaded settings.
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(strategy) = self.strategy {
            settings.scan.strategy = strategy;
        }
        if let Some(path_match) = self.path_match {
            settings.scan.path_match = path_match;
        }
        if let Some(workers) = self.workers {
            settings.scan.max_workers = workers;
        }
        if self.cancel_on_match {
            settings.scan.cancel_on_match = true;
        }
        if self.include_self {
            settings.scan.exclude_self = false;
        }
        if let Some(root) = &self.proc_root {
            settings.scan.proc_root = root.clone();
        }
        if let Some(format) = self.format {
            settings.output.format = format;
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Found
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    init_logging(&LogConfig::from_env(cli.log_level(), cli.log_format));

    let mut format = cli.format.unwrap_or_default();
    let exit_code = match run(&cli, &mut format) {
        Ok(code) => code,
        Err(err) => {
            report_fatal(&err, format);
            ExitCode::for_error(&err)
        }
    };

    debug!(exit_code = %exit_code, "done");
    std::process::exit(exit_code.as_i32());
}

/// `format` is updated to the configured output format once settings load,
/// so later fatal errors are rendered the same way as results.
fn run(cli: &Cli, format: &mut OutputFormat) -> Result<ExitCode, Error> {
    let loaded = load_settings(cli.config.as_deref())?;
    info!(
        source = %loaded.source,
        path = ?loaded.path,
        "configuration loaded"
    );

    let mut settings = loaded.settings;
    cli.apply_overrides(&mut settings);
    validate_settings(&settings).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    *format = settings.output.format;

    let users = UserTable::load();
    let snapshot = list_processes(&settings.scan.proc_root, &users)?;
    let ports = default_port_lookup(&settings.scan.proc_root)?;
    let locator = Locator::new(LocateOptions::from(&settings.scan));

    let engine = QueryEngine::new(&snapshot, &locator, ports.as_ref());
    let report = engine.run(&cli.targets);

    let mut stdout = std::io::stdout().lock();
    render_report(&mut stdout, &report, *format)?;
    let mut stderr = std::io::stderr().lock();
    render_failures(&mut stderr, &report, *format)?;

    Ok(ExitCode::for_report(&report))
}

/// Report an error that ended the run before results were printed.
fn report_fatal(err: &Error, format: OutputFormat) {
    if format.is_machine() {
        let body = serde_json::json!({ "error": StructuredError::from(err) });
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{body}");
    } else {
        eprintln!("{}", format_error_human(err));
    }
}
