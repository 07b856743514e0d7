//! Terminal rendering of child output and session outcomes.

use colored::Colorize;
use phoenix_adapters::OutputSink;
use phoenix_core::{ExitReport, OutcomeKind};
use std::io::Write;
use std::time::Duration;

/// Writes child output to any writer, optionally without ANSI escapes.
pub struct ConsoleSink<W: Write> {
    out: W,
    strip_ansi: bool,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(strip_ansi: bool) -> Self {
        Self::new(std::io::stdout(), strip_ansi)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, strip_ansi: bool) -> Self {
        Self { out, strip_ansi }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn on_fragment(&mut self, text: &str) {
        let result = if self.strip_ansi {
            self.out.write_all(&strip_ansi_escapes::strip(text.as_bytes()))
        } else {
            self.out.write_all(text.as_bytes())
        };
        if let Err(e) = result.and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "Failed to write child output");
        }
    }

    fn on_complete(&mut self, _report: &ExitReport) {
        let _ = self.out.flush();
    }
}

/// One-line human summary of a finished session.
pub fn format_outcome(report: &ExitReport, use_colors: bool) -> String {
    let runtime = report
        .runtime_ms
        .map(|ms| format!(" ({:.1}s)", Duration::from_millis(ms).as_secs_f64()))
        .unwrap_or_default();
    let plain = format!("Program {}{runtime}", report.message);

    if !use_colors {
        return plain;
    }
    match report.kind {
        OutcomeKind::Success => plain.green().to_string(),
        OutcomeKind::Error => plain.yellow().to_string(),
        OutcomeKind::Abnormal | OutcomeKind::LaunchFailed | OutcomeKind::AssertionFailed => {
            plain.red().bold().to_string()
        }
    }
}
