// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Crate-level error types.
//!
//! Configuration mistakes (bad declaration names, unknown policy
//! identifiers) fail synchronously at the point of misuse. Unmatched
//! references are findings, not errors; only the raise policy converts one
//! into [`UnknownIvarError`]. Source files that cannot be read or parsed
//! are fatal to analysis ([`AnalysisError`]).

use camino::Utf8PathBuf;
use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use crate::source_analysis::ParseError;

/// Any error surfaced by registry operations.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// A method could not be resolved anywhere on the ancestor chain.
    #[error("undefined method `{method}` for class `{class}`")]
    UnknownMethod {
        /// The receiver's class name.
        class: EcoString,
        /// The method that was looked up.
        method: EcoString,
    },

    /// A method was resolved but carries no callable body (it exists only
    /// as a source location for analysis).
    #[error("method `{method}` on class `{class}` has no callable body")]
    NotCallable {
        /// The receiver's class name.
        class: EcoString,
        /// The method that was called.
        method: EcoString,
    },

    /// An invalid declaration.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// An invalid policy configuration.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Reference analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// An unmatched reference under the raise policy.
    #[error(transparent)]
    UnknownIvar(#[from] UnknownIvarError),
}

/// A configuration error raised while registering declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The declared name is not a legal instance variable name.
    #[error("`{0}` is not a valid instance variable name")]
    InvalidName(EcoString),

    /// An unrecognized initialization source spelling.
    #[error("unknown init source `{0}` (expected `none`, `positional`, or `keyword`)")]
    UnknownInitSource(EcoString),
}

/// An unrecognized check policy identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown check policy `{0}` (expected `warn`, `warn_once`, `raise`, `log`, or `none`)")]
pub struct PolicyError(pub EcoString);

/// A fatal failure while analyzing a class's source files.
///
/// Analysis runs at developer time, so a file that cannot be read or
/// parsed fails loudly instead of degrading to fewer known references.
#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    /// A backing source file could not be read.
    #[error("failed to read source file `{path}`")]
    Io {
        /// The file that was being read.
        path: Utf8PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A backing source file could not be parsed.
    #[error("failed to parse source file `{path}`")]
    Parse {
        /// The file that was being parsed.
        path: Utf8PathBuf,
        /// The underlying syntax error.
        #[source]
        #[diagnostic_source]
        source: ParseError,
    },
}

/// A reference to an instance variable that is neither declared nor set,
/// thrown by the raise policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UnknownIvarError {
    /// The class whose construction triggered the check.
    pub class: EcoString,
    /// The unknown instance variable name.
    pub name: EcoString,
    /// The source file containing the reference.
    pub path: Utf8PathBuf,
    /// The 1-based line of the reference.
    pub line: u32,
    /// The closest known name, if any.
    pub suggestion: Option<EcoString>,
    message: EcoString,
}

impl UnknownIvarError {
    /// Builds the error for one unmatched reference.
    #[must_use]
    pub(crate) fn new(
        class: EcoString,
        name: EcoString,
        path: Utf8PathBuf,
        line: u32,
        suggestion: Option<EcoString>,
    ) -> Self {
        let clause = suggestion
            .as_ref()
            .map(|s| format!(" Did you mean: {s}?"))
            .unwrap_or_default();
        let message = EcoString::from(format!(
            "{path}:{line}: unknown instance variable {name}.{clause}"
        ));
        Self {
            class,
            name,
            path,
            line,
            suggestion,
            message,
        }
    }
}
