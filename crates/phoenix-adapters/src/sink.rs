//! Output sinks.

use phoenix_core::{ExitReport, LineAssembler};

/// Receives child output and the final outcome.
///
/// Fragments arrive in the order the child wrote them. `on_complete` is called
/// exactly once per foreground session, after the last fragment.
pub trait OutputSink {
    fn on_fragment(&mut self, text: &str);

    fn on_complete(&mut self, report: &ExitReport);
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn on_fragment(&mut self, text: &str) {
        (**self).on_fragment(text);
    }

    fn on_complete(&mut self, report: &ExitReport) {
        (**self).on_complete(report);
    }
}

/// Sink that records everything it receives.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    fragments: Vec<String>,
    reports: Vec<ExitReport>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn reports(&self) -> &[ExitReport] {
        &self.reports
    }

    pub fn last_report(&self) -> Option<&ExitReport> {
        self.reports.last()
    }

    /// All fragments concatenated.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// The concatenated output split into lines, terminators removed.
    pub fn lines(&self) -> Vec<String> {
        let mut assembler = LineAssembler::new();
        let mut lines = Vec::new();
        for fragment in &self.fragments {
            lines.extend(assembler.push(fragment));
        }
        lines.extend(assembler.finish());
        lines
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.reports.clear();
    }
}

impl OutputSink for CollectingSink {
    fn on_fragment(&mut self, text: &str) {
        self.fragments.push(text.to_string());
    }

    fn on_complete(&mut self, report: &ExitReport) {
        self.reports.push(report.clone());
    }
}
