// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The policy engine: how unmatched references are reported.
//!
//! Each policy variant consumes the full unmatched list for one check and
//! performs its side effect: warn on every check, warn once per class,
//! raise on the first finding, route through a log collaborator, or do
//! nothing. Warning output goes to the registry's [`DiagnosticSink`]
//! (standard error by default) one line per reference, with a spelling
//! suggestion looked up against the known-name dictionary.

use std::str::FromStr;
use std::sync::Arc;

use ecow::EcoString;

use crate::analysis::Reference;
use crate::error::{PolicyError, UnknownIvarError};
use crate::suggest::SuggestionProvider;

/// A line-oriented text sink for warning output.
pub trait DiagnosticSink: Send + Sync {
    /// Writes one diagnostic line (no trailing newline in `line`).
    fn write_line(&self, line: &str);
}

/// The default sink: standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn write_line(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// A logging collaborator for the log policy.
pub trait LogTarget: Send + Sync {
    /// Records one finding.
    fn log(&self, message: &str);
}

/// The default log target, forwarding to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogTarget for TracingLog {
    fn log(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// How unmatched references are handled.
#[derive(Clone, Default)]
pub enum CheckPolicy {
    /// Warn on every check that finds unmatched references.
    WarnAlways,
    /// Warn the first time a class has findings; stay silent afterwards.
    #[default]
    WarnOnce,
    /// Raise an [`UnknownIvarError`] for the first unmatched reference.
    Raise,
    /// Route each finding through a log collaborator.
    Log(Arc<dyn LogTarget>),
    /// Do nothing.
    None,
}

impl std::fmt::Debug for CheckPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WarnAlways => f.write_str("WarnAlways"),
            Self::WarnOnce => f.write_str("WarnOnce"),
            Self::Raise => f.write_str("Raise"),
            Self::Log(_) => f.write_str("Log(..)"),
            Self::None => f.write_str("None"),
        }
    }
}

impl FromStr for CheckPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" | "warn_always" => Ok(Self::WarnAlways),
            "warn_once" => Ok(Self::WarnOnce),
            "raise" => Ok(Self::Raise),
            "log" => Ok(Self::Log(Arc::new(TracingLog))),
            "none" => Ok(Self::None),
            other => Err(PolicyError(EcoString::from(other))),
        }
    }
}

/// Formats the warning line for one unmatched reference.
///
/// The format is fixed: `<path>:<line>: warning: unknown instance variable
/// <name>. Did you mean: <suggestion>?` — when there is no suggestion the
/// clause is empty and the trailing space after the period remains.
pub(crate) fn warning_line(reference: &Reference, suggestion: Option<&EcoString>) -> String {
    let clause = suggestion
        .map(|s| format!("Did you mean: {s}?"))
        .unwrap_or_default();
    format!(
        "{}:{}: warning: unknown instance variable {}. {clause}",
        reference.path, reference.line, reference.name
    )
}

/// What the dispatcher asks the caller to do afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PolicyOutcome {
    /// True when the class should be marked in the once-per-class ledger.
    pub mark_reported: bool,
}

/// Runs one policy over the unmatched references.
///
/// `dictionary` is the allowed set minus reserved names; the candidate
/// itself is excluded by the suggester. `already_reported` is the ledger
/// state for the class, consulted only by [`CheckPolicy::WarnOnce`].
pub(crate) fn dispatch(
    policy: &CheckPolicy,
    class_name: &EcoString,
    unmatched: &[Reference],
    dictionary: &[EcoString],
    suggester: &dyn SuggestionProvider,
    sink: &dyn DiagnosticSink,
    already_reported: bool,
) -> Result<PolicyOutcome, UnknownIvarError> {
    let no_mark = PolicyOutcome {
        mark_reported: false,
    };
    if unmatched.is_empty() {
        return Ok(no_mark);
    }

    match policy {
        CheckPolicy::WarnAlways => {
            warn_all(unmatched, dictionary, suggester, sink);
            Ok(no_mark)
        }
        CheckPolicy::WarnOnce => {
            if already_reported {
                return Ok(no_mark);
            }
            warn_all(unmatched, dictionary, suggester, sink);
            Ok(PolicyOutcome {
                mark_reported: true,
            })
        }
        CheckPolicy::Raise => {
            // Only the first finding is reported; raising aborts the rest.
            let first = &unmatched[0];
            let suggestion = suggester.suggest(first.name.as_str(), dictionary);
            Err(UnknownIvarError::new(
                class_name.clone(),
                first.name.clone(),
                first.path.clone(),
                first.line,
                suggestion,
            ))
        }
        CheckPolicy::Log(target) => {
            for reference in unmatched {
                let suggestion = suggester.suggest(reference.name.as_str(), dictionary);
                target.log(&warning_line(reference, suggestion.as_ref()));
            }
            Ok(no_mark)
        }
        CheckPolicy::None => Ok(no_mark),
    }
}

fn warn_all(
    unmatched: &[Reference],
    dictionary: &[EcoString],
    suggester: &dyn SuggestionProvider,
    sink: &dyn DiagnosticSink,
) {
    for reference in unmatched {
        let suggestion = suggester.suggest(reference.name.as_str(), dictionary);
        sink.write_line(&warning_line(reference, suggestion.as_ref()));
    }
}
