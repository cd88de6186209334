// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for the analyzed surface language.
//!
//! The surface language is a small Ruby-flavored notation: `def ... end`
//! method definitions, `@name` instance variable slots, `=` assignment,
//! compound assignment operators, and interpolated double-quoted strings.
//! Tokens are designed to be cheap to clone (using [`EcoString`] for
//! string data).

use ecow::EcoString;

use super::Span;

/// One piece of an interpolated string literal.
///
/// `"ham and #{@cheese}!"` lexes into `Text("ham and ")`, `Code(span of
/// @cheese)`, `Text("!")`. Code parts carry the span of the embedded
/// source so the parser can lex and parse them in place, preserving exact
/// positions for reference reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringPart {
    /// Literal text between interpolations.
    Text(EcoString),
    /// The span of an embedded `#{...}` expression (braces excluded).
    Code(Span),
}

/// The kind of token, not including source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Names ===
    /// A lowercase identifier: `bread`, `to_s`
    Identifier(EcoString),

    /// A constant (uppercase start): `Sandwich`
    Constant(EcoString),

    /// An instance variable, sigil included: `@cheese`
    Ivar(EcoString),

    /// A label: an identifier immediately followed by a colon, as in
    /// keyword arguments and keyword parameters (`bread:`). The colon is
    /// not part of the stored name.
    Label(EcoString),

    // === Literals ===
    /// An integer literal: `42`
    Integer(EcoString),

    /// A floating-point literal: `3.14`
    Float(EcoString),

    /// A string literal with no interpolation: `'hello'`, `"hello"`
    String(EcoString),

    /// A double-quoted string containing `#{...}` interpolations.
    InterpolatedString(Vec<StringPart>),

    /// A symbol literal: `:keyword`
    Symbol(EcoString),

    // === Keywords ===
    Def,
    End,
    Class,
    SelfKw,
    If,
    Elsif,
    Else,
    Unless,
    While,
    Until,
    Do,
    Then,
    Return,
    Nil,
    True,
    False,

    // === Operators ===
    /// Plain assignment: `=`
    Assign,

    /// A compound assignment operator, stored without the trailing `=`:
    /// `+=` is `OpAssign("+")`, `||=` is `OpAssign("||")`.
    OpAssign(EcoString),

    /// A binary operator: `+`, `==`, `<=>`, `<<`, `&&`, ...
    Operator(EcoString),

    /// Logical negation: `!`
    Bang,

    /// Block-parameter delimiter: `|`
    Pipe,

    /// A lone `&`: the block-parameter sigil in a parameter list (`&&`
    /// lexes as `Operator("&&")`).
    Amp,

    // === Delimiters ===
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Comma,
    Colon,

    /// A statement separator: newline or `;` (consecutive separators are
    /// collapsed into one token).
    Separator,

    /// End of input.
    Eof,

    /// An unrecognized or malformed piece of input.
    Error(EcoString),
}

impl TokenKind {
    /// Returns true for tokens that terminate a statement.
    #[must_use]
    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator | Self::Eof)
    }
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The source location of the token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Looks up the keyword for an identifier, if it is one.
#[must_use]
pub(crate) fn keyword(name: &str) -> Option<TokenKind> {
    let kind = match name {
        "def" => TokenKind::Def,
        "end" => TokenKind::End,
        "class" => TokenKind::Class,
        "self" => TokenKind::SelfKw,
        "if" => TokenKind::If,
        "elsif" => TokenKind::Elsif,
        "else" => TokenKind::Else,
        "unless" => TokenKind::Unless,
        "while" => TokenKind::While,
        "until" => TokenKind::Until,
        "do" => TokenKind::Do,
        "then" => TokenKind::Then,
        "return" => TokenKind::Return,
        "nil" => TokenKind::Nil,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}
