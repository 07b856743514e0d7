//! Exit reporter.
//!
//! Translates an [`ExitInfo`] into one human-readable outcome. The mapping is an
//! ordered table of rules; the first matching rule wins. New exit codes are
//! handled by adding rules, never by touching the supervisor.

use phoenix_proto::{ASSERTION_FAILED_CODE, ExitInfo, LAUNCH_FAILED_CODE, SUCCESS_CODE};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Coarse classification of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Killed by a signal or otherwise did not exit on its own.
    Abnormal,
    /// Executable not found or failed to start.
    LaunchFailed,
    /// The child tripped an internal consistency check.
    AssertionFailed,
    Success,
    /// Any other exit code.
    Error,
}

/// Predicate half of an [`ExitRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMatch {
    /// Matches abnormal terminations regardless of code.
    Abnormal,
    /// Matches a normal exit with exactly this code.
    Code(i32),
    /// Matches everything.
    Any,
}

impl ExitMatch {
    fn matches(self, info: &ExitInfo) -> bool {
        match self {
            ExitMatch::Abnormal => info.abnormal,
            ExitMatch::Code(code) => !info.abnormal && info.code == code,
            ExitMatch::Any => true,
        }
    }
}

/// One row of the policy table.
///
/// `message` may contain `{code}`, replaced by the numeric exit code.
#[derive(Debug, Clone)]
pub struct ExitRule {
    pub matcher: ExitMatch,
    pub kind: OutcomeKind,
    pub message: Cow<'static, str>,
}

impl ExitRule {
    pub fn new(matcher: ExitMatch, kind: OutcomeKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            matcher,
            kind,
            message: message.into(),
        }
    }
}

/// Final outcome of a session, delivered once to the output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    pub kind: OutcomeKind,
    pub code: i32,
    pub message: String,
    /// Wall-clock runtime of the child, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_ms: Option<u64>,
}

impl ExitReport {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// Attaches the measured runtime.
    pub fn with_runtime_ms(mut self, runtime_ms: u64) -> Self {
        self.runtime_ms = Some(runtime_ms);
        self
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered table of exit rules.
#[derive(Debug, Clone)]
pub struct ExitPolicy {
    rules: Vec<ExitRule>,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                ExitRule::new(
                    ExitMatch::Abnormal,
                    OutcomeKind::Abnormal,
                    "terminated abnormally, check the log",
                ),
                ExitRule::new(
                    ExitMatch::Code(LAUNCH_FAILED_CODE),
                    OutcomeKind::LaunchFailed,
                    "executable not found or failed to launch",
                ),
                ExitRule::new(
                    ExitMatch::Code(ASSERTION_FAILED_CODE),
                    OutcomeKind::AssertionFailed,
                    "failed an internal consistency check, check the log",
                ),
                ExitRule::new(
                    ExitMatch::Code(SUCCESS_CODE),
                    OutcomeKind::Success,
                    "completed successfully",
                ),
                ExitRule::new(
                    ExitMatch::Any,
                    OutcomeKind::Error,
                    "exited with error code {code}, check the log",
                ),
            ],
        }
    }
}

impl ExitPolicy {
    /// Inserts a rule ahead of the catch-all fallback.
    ///
    /// Rules added later still lose to the built-in abnormal rule, so a signal
    /// death is never reported as a code-based outcome.
    pub fn with_rule(mut self, rule: ExitRule) -> Self {
        let at = self
            .rules
            .iter()
            .position(|r| r.matcher == ExitMatch::Any)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
        self
    }

    pub fn rules(&self) -> &[ExitRule] {
        &self.rules
    }

    /// Computes the outcome for `info`. Pure and total.
    pub fn report(&self, info: &ExitInfo) -> ExitReport {
        let rule = self.rules.iter().find(|rule| rule.matcher.matches(info));

        match rule {
            Some(rule) => ExitReport {
                kind: rule.kind,
                code: info.code,
                message: rule.message.replace("{code}", &info.code.to_string()),
                runtime_ms: None,
            },
            // Only reachable when a caller strips the fallback out of a custom table.
            None => ExitReport {
                kind: if info.abnormal {
                    OutcomeKind::Abnormal
                } else {
                    OutcomeKind::Error
                },
                code: info.code,
                message: format!("exited with code {}", info.code),
                runtime_ms: None,
            },
        }
    }
}
