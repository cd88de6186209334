// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parse error types.
//!
//! Reference analysis is a developer-time tool, so a file that fails to
//! parse is a fatal condition, not something to degrade around. Errors
//! carry source locations ([`Span`]) and integrate with [`miette`] for
//! readable reports.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use super::Span;

/// A syntax error encountered while parsing a source file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic()]
pub struct ParseError {
    /// What went wrong.
    pub message: EcoString,
    /// The source location of the error.
    #[label("here")]
    pub span: Span,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
