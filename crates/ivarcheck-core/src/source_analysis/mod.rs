// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexing and parsing for the analyzed surface language.
//!
//! This module turns source text into the AST defined in [`crate::ast`].
//! The pipeline is the usual two stages:
//!
//! 1. [`Lexer`] produces a token stream (statement separators collapsed,
//!    interpolated strings carrying the spans of their embedded code);
//! 2. [`parse`] builds a [`crate::ast::SourceFile`], failing fast on the
//!    first syntax error.
//!
//! Spans are byte offsets into the original source; [`LineMap`] converts
//! them to 1-based line/column positions for diagnostics.

mod error;
mod lexer;
mod parser;
mod span;
mod token;

pub use error::ParseError;
pub use lexer::{lex, lex_with_eof, Lexer};
pub use parser::parse;
pub use span::{LineMap, Position, Span};
pub use token::{StringPart, Token, TokenKind};
