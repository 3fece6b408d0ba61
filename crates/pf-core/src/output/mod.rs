//! Result rendering for stdout and argument failures for stderr.

use pf_common::OutputFormat;
use std::io::{self, Write};

use crate::collect::ProcessRecord;
use crate::query::{ArgumentFailure, QueryReport};

/// Printed when a batch matched nothing.
pub const NO_MATCH_MESSAGE: &str = "No matching processes found.";

/// `[PID:<pid>] [PPID:<ppid>] [USER:<user>] <executable>`
pub fn format_process_line(process: &ProcessRecord) -> String {
    format!(
        "[PID:{}] [PPID:{}] [USER:{}] {}",
        process.pid, process.ppid, process.user, process.executable
    )
}

pub fn format_failure_line(failure: &ArgumentFailure) -> String {
    format!("Error: {}: {}", failure.argument, failure.error.message)
}

/// Write the matches in `format`.
pub fn render_report<W: Write>(
    out: &mut W,
    report: &QueryReport,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Human => {
            if report.matches.is_empty() {
                writeln!(out, "{NO_MATCH_MESSAGE}")?;
            }
            for matched in &report.matches {
                writeln!(out, "{}", format_process_line(&matched.process))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Jsonl => {
            for matched in &report.matches {
                serde_json::to_writer(&mut *out, matched)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()
}

/// Write argument failures as human lines. Machine formats carry them in the
/// report body instead.
pub fn render_failures<W: Write>(
    err: &mut W,
    report: &QueryReport,
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return Ok(());
    }
    for failure in &report.failures {
        writeln!(err, "{}", format_failure_line(failure))?;
    }
    Ok(())
}
