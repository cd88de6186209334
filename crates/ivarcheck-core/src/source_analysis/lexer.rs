// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for the analyzed surface language.
//!
//! The lexer is hand-written for maximum control over error recovery and
//! span precision. It never panics on malformed input: unknown characters
//! and unterminated literals become [`TokenKind::Error`] tokens, and the
//! parser decides whether those are fatal.
//!
//! # Interpolated strings
//!
//! Double-quoted strings may embed `#{...}` expressions. The lexer does not
//! recurse into them; it records the byte span of each embedded expression
//! ([`StringPart::Code`]) so the parser can lex that slice in place with
//! [`Lexer::with_offset`], keeping every reported position relative to the
//! original file.

use std::iter::Peekable;
use std::str::CharIndices;

use ecow::EcoString;

use super::token::{keyword, StringPart};
use super::{Span, Token, TokenKind};

/// A lexer that tokenizes surface-language source code.
pub struct Lexer<'src> {
    /// The source text being lexed.
    source: &'src str,
    /// Character iterator with byte positions.
    chars: Peekable<CharIndices<'src>>,
    /// Current byte position in `source`.
    position: usize,
    /// Offset added to every produced span (non-zero when re-lexing an
    /// interpolation slice of a larger file).
    base: u32,
    /// Whether `Eof` has been produced (terminates the iterator).
    done: bool,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.position)
            .field("remaining", &self.source.get(self.position..).unwrap_or(""))
            .finish()
    }
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Creates a lexer for a slice of a larger file.
    ///
    /// Every produced span is shifted by `base` so it indexes into the
    /// original file, not the slice.
    #[must_use]
    pub fn with_offset(source: &'src str, base: u32) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
            base,
            done: false,
        }
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peeks `n+1` characters ahead without consuming.
    fn peek_char_n(&self, n: usize) -> Option<char> {
        let mut iter = self.chars.clone();
        for _ in 0..n {
            iter.next();
        }
        iter.next().map(|(_, c)| c)
    }

    /// Consumes the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        Some(c)
    }

    /// Consumes characters while the predicate is true.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Returns the current byte position (base-shifted).
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn current_position(&self) -> u32 {
        self.position as u32 + self.base
    }

    /// Creates a span from a base-shifted start to the current position.
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current_position())
    }

    /// Extracts source text for a base-shifted span.
    fn text_for(&self, span: Span) -> &'src str {
        let local = Span::new(span.start() - self.base, span.end() - self.base);
        &self.source[local.as_range()]
    }

    /// Lexes the next token.
    fn lex_token(&mut self) -> Token {
        // Horizontal whitespace never separates statements.
        self.advance_while(|c| c == ' ' || c == '\t' || c == '\r');

        let start = self.current_position();
        let Some(c) = self.peek_char() else {
            return Token::new(TokenKind::Eof, self.span_from(start));
        };

        // Newlines, semicolons, and comments collapse into one separator.
        if c == '\n' || c == ';' || c == '#' {
            self.consume_separator_run();
            return Token::new(TokenKind::Separator, self.span_from(start));
        }

        let kind = self.lex_token_kind(c);
        Token::new(kind, self.span_from(start))
    }

    /// Consumes a run of newlines, semicolons, comments, and whitespace.
    fn consume_separator_run(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ' | '\t' | '\r' | '\n' | ';') => {
                    self.advance();
                }
                Some('#') => {
                    self.advance_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    /// Lexes a token kind based on the first character.
    fn lex_token_kind(&mut self, c: char) -> TokenKind {
        match c {
            'a'..='z' | '_' => self.lex_identifier(),
            'A'..='Z' => self.lex_constant(),
            '0'..='9' => self.lex_number(),
            '@' => self.lex_ivar(),
            '\'' => self.lex_single_quoted(),
            '"' => self.lex_double_quoted(),
            ':' => self.lex_colon(),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '.' => self.single(TokenKind::Dot),
            ',' => self.single(TokenKind::Comma),
            '=' => self.lex_equals(),
            '+' | '-' | '/' | '%' => self.lex_simple_operator(),
            '*' => self.lex_star(),
            '<' | '>' => self.lex_comparison(),
            '!' => self.lex_bang(),
            '&' => self.lex_amp(),
            '|' => self.lex_pipe(),
            _ => {
                self.advance();
                TokenKind::Error(EcoString::from(format!("unexpected character '{c}'")))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Lexes an identifier, keyword, or label.
    ///
    /// Identifiers may end with `?` or `!` (predicate/bang methods), but a
    /// trailing `!` is left alone when it starts `!=`.
    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if matches!(self.peek_char(), Some('?' | '!')) && self.peek_char_n(1) != Some('=') {
            self.advance();
        }
        let text = self.text_for(self.span_from(start));

        if let Some(kind) = keyword(text) {
            return kind;
        }

        // `name:` is a label unless the colon starts a symbol (`x :sym`
        // never lexes that way because the space stops the identifier).
        if self.peek_char() == Some(':') && self.peek_char_n(1) != Some(':') {
            self.advance();
            return TokenKind::Label(EcoString::from(text));
        }

        TokenKind::Identifier(EcoString::from(text))
    }

    /// Lexes a constant name.
    fn lex_constant(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        TokenKind::Constant(EcoString::from(self.text_for(self.span_from(start))))
    }

    /// Lexes an integer or float literal.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance_while(|c| c.is_ascii_digit() || c == '_');

        // A dot only continues the number when a digit follows (`1.to_s`
        // must lex as integer, dot, identifier).
        if self.peek_char() == Some('.') && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance(); // .
            self.advance_while(|c| c.is_ascii_digit() || c == '_');
            return TokenKind::Float(EcoString::from(self.text_for(self.span_from(start))));
        }

        TokenKind::Integer(EcoString::from(self.text_for(self.span_from(start))))
    }

    /// Lexes an instance variable: `@name`.
    fn lex_ivar(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance(); // @
        if self.peek_char() == Some('@') {
            self.advance();
            self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return TokenKind::Error(EcoString::from("class variables are not supported"));
        }
        if !self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            return TokenKind::Error(EcoString::from("'@' must be followed by a name"));
        }
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        TokenKind::Ivar(EcoString::from(self.text_for(self.span_from(start))))
    }

    /// Lexes a single-quoted string (no interpolation, `\'` and `\\` escapes).
    fn lex_single_quoted(&mut self) -> TokenKind {
        self.advance(); // '
        let mut value = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return TokenKind::Error(EcoString::from("unterminated string literal"));
                }
                Some('\\') => match self.advance() {
                    Some(c @ ('\'' | '\\')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => {
                        return TokenKind::Error(EcoString::from("unterminated string literal"));
                    }
                },
                Some('\'') => break,
                Some(c) => value.push(c),
            }
        }
        TokenKind::String(EcoString::from(value))
    }

    /// Lexes a double-quoted string, splitting out `#{...}` interpolations.
    fn lex_double_quoted(&mut self) -> TokenKind {
        self.advance(); // "
        let mut parts: Vec<StringPart> = Vec::new();
        let mut text = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return TokenKind::Error(EcoString::from("unterminated string literal"));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some(c @ ('"' | '\\' | '#')) => text.push(c),
                        Some(c) => {
                            text.push('\\');
                            text.push(c);
                        }
                        None => {
                            return TokenKind::Error(EcoString::from(
                                "unterminated string literal",
                            ));
                        }
                    }
                }
                Some('#') if self.peek_char_n(1) == Some('{') => {
                    if !text.is_empty() {
                        parts.push(StringPart::Text(EcoString::from(text.as_str())));
                        text.clear();
                    }
                    self.advance(); // #
                    self.advance(); // {
                    let code_start = self.current_position();
                    let mut depth = 1u32;
                    loop {
                        match self.peek_char() {
                            None => {
                                return TokenKind::Error(EcoString::from(
                                    "unterminated interpolation",
                                ));
                            }
                            Some('{') => {
                                depth += 1;
                                self.advance();
                            }
                            Some('}') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                                self.advance();
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                    let code_span = self.span_from(code_start);
                    self.advance(); // }
                    parts.push(StringPart::Code(code_span));
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }

        if parts.is_empty() {
            return TokenKind::String(EcoString::from(text));
        }
        if !text.is_empty() {
            parts.push(StringPart::Text(EcoString::from(text)));
        }
        TokenKind::InterpolatedString(parts)
    }

    /// Lexes `:` — a symbol (`:name`, or `:@name` keeping the sigil) or a
    /// bare colon.
    fn lex_colon(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance(); // :
        let sigil = if self.peek_char() == Some('@') {
            self.advance();
            true
        } else {
            false
        };
        if self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let text = self.text_for(self.span_from(start));
            return TokenKind::Symbol(EcoString::from(&text[1..]));
        }
        if sigil {
            return TokenKind::Error(EcoString::from("expected a name after `:@`"));
        }
        TokenKind::Colon
    }

    /// Lexes `=`, `==`, or `=~`.
    fn lex_equals(&mut self) -> TokenKind {
        self.advance(); // =
        match self.peek_char() {
            Some('=') => {
                self.advance();
                TokenKind::Operator(EcoString::from("=="))
            }
            Some('~') => {
                self.advance();
                TokenKind::Operator(EcoString::from("=~"))
            }
            _ => TokenKind::Assign,
        }
    }

    /// Lexes `+ - / %` and their compound-assignment forms.
    fn lex_simple_operator(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance();
        let op = EcoString::from(self.text_for(self.span_from(start)));
        if self.peek_char() == Some('=') {
            self.advance();
            return TokenKind::OpAssign(op);
        }
        TokenKind::Operator(op)
    }

    /// Lexes `*`, `**`, `*=`.
    fn lex_star(&mut self) -> TokenKind {
        self.advance(); // *
        match self.peek_char() {
            Some('*') => {
                self.advance();
                TokenKind::Operator(EcoString::from("**"))
            }
            Some('=') => {
                self.advance();
                TokenKind::OpAssign(EcoString::from("*"))
            }
            _ => TokenKind::Operator(EcoString::from("*")),
        }
    }

    /// Lexes `< > <= >= << >> <<=`.
    fn lex_comparison(&mut self) -> TokenKind {
        let start = self.current_position();
        let first = self.advance().unwrap_or_default();
        if self.peek_char() == Some('=') {
            self.advance();
            return TokenKind::Operator(EcoString::from(self.text_for(self.span_from(start))));
        }
        if self.peek_char() == Some(first) {
            self.advance();
            if first == '<' && self.peek_char() == Some('=') {
                self.advance();
                return TokenKind::OpAssign(EcoString::from("<<"));
            }
            return TokenKind::Operator(EcoString::from(self.text_for(self.span_from(start))));
        }
        TokenKind::Operator(EcoString::from(self.text_for(self.span_from(start))))
    }

    /// Lexes `!` or `!=`.
    fn lex_bang(&mut self) -> TokenKind {
        self.advance(); // !
        if self.peek_char() == Some('=') {
            self.advance();
            return TokenKind::Operator(EcoString::from("!="));
        }
        TokenKind::Bang
    }

    /// Lexes `|`, `||`, `||=`.
    fn lex_pipe(&mut self) -> TokenKind {
        self.advance(); // |
        if self.peek_char() == Some('|') {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return TokenKind::OpAssign(EcoString::from("||"));
            }
            return TokenKind::Operator(EcoString::from("||"));
        }
        TokenKind::Pipe
    }

    /// Lexes `&`, `&&`, `&&=`.
    fn lex_amp(&mut self) -> TokenKind {
        self.advance(); // &
        if self.peek_char() == Some('&') {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return TokenKind::OpAssign(EcoString::from("&&"));
            }
            return TokenKind::Operator(EcoString::from("&&"));
        }
        TokenKind::Amp
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.lex_token();
        if token.kind == TokenKind::Eof {
            self.done = true;
            return None;
        }
        Some(token)
    }
}

/// Tokenizes source text (without a trailing EOF token).
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Tokenizes source text, appending an EOF token (parser input).
#[must_use]
pub fn lex_with_eof(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.lex_token();
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_identifiers_and_keywords() {
        assert_eq!(
            kinds("def bread end"),
            vec![
                TokenKind::Def,
                TokenKind::Identifier("bread".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn lex_predicate_and_bang_methods() {
        assert_eq!(kinds("empty?"), vec![TokenKind::Identifier("empty?".into())]);
        assert_eq!(kinds("save!"), vec![TokenKind::Identifier("save!".into())]);
        // `x != 1` must not glue the bang onto the identifier.
        assert_eq!(
            kinds("x != 1"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("!=".into()),
                TokenKind::Integer("1".into()),
            ]
        );
    }

    #[test]
    fn lex_ivar() {
        assert_eq!(kinds("@cheese"), vec![TokenKind::Ivar("@cheese".into())]);
    }

    #[test]
    fn lex_ivar_spans() {
        let tokens = lex("  @bread");
        assert_eq!(tokens[0].span, Span::new(2, 8));
    }

    #[test]
    fn lex_class_variable_is_error() {
        assert!(matches!(kinds("@@count")[0], TokenKind::Error(_)));
    }

    #[test]
    fn lex_bare_sigil_is_error() {
        assert!(matches!(kinds("@ x")[0], TokenKind::Error(_)));
    }

    #[test]
    fn lex_label_and_symbol() {
        assert_eq!(
            kinds("bread: :wheat"),
            vec![
                TokenKind::Label("bread".into()),
                TokenKind::Symbol("wheat".into()),
            ]
        );
    }

    #[test]
    fn lex_ivar_symbol_keeps_sigil() {
        assert_eq!(
            kinds("ivar :@bread, init: :kwarg"),
            vec![
                TokenKind::Identifier("ivar".into()),
                TokenKind::Symbol("@bread".into()),
                TokenKind::Comma,
                TokenKind::Label("init".into()),
                TokenKind::Symbol("kwarg".into()),
            ]
        );
        assert!(matches!(kinds(":@ x")[0], TokenKind::Error(_)));
    }

    #[test]
    fn lex_numbers() {
        assert_eq!(
            kinds("42 3.14 1.to_s"),
            vec![
                TokenKind::Integer("42".into()),
                TokenKind::Float("3.14".into()),
                TokenKind::Integer("1".into()),
                TokenKind::Dot,
                TokenKind::Identifier("to_s".into()),
            ]
        );
    }

    #[test]
    fn lex_plain_strings() {
        assert_eq!(
            kinds(r"'it''s' "),
            vec![
                TokenKind::String("it".into()),
                TokenKind::String("s".into()),
            ]
        );
        assert_eq!(kinds(r#""wheat""#), vec![TokenKind::String("wheat".into())]);
    }

    #[test]
    fn lex_interpolated_string() {
        let tokens = lex(r#""a #{@cheese} b""#);
        let TokenKind::InterpolatedString(parts) = &tokens[0].kind else {
            panic!("expected interpolated string, got {:?}", tokens[0].kind);
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], StringPart::Text("a ".into()));
        let StringPart::Code(span) = parts[1] else {
            panic!("expected code part");
        };
        assert_eq!(span, Span::new(5, 12));
        assert_eq!(parts[2], StringPart::Text(" b".into()));
    }

    #[test]
    fn lex_unterminated_string_is_error() {
        assert!(matches!(kinds("\"oops")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("'oops")[0], TokenKind::Error(_)));
    }

    #[test]
    fn lex_operators_and_assignment() {
        assert_eq!(
            kinds("a += 1"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::OpAssign("+".into()),
                TokenKind::Integer("1".into()),
            ]
        );
        assert_eq!(
            kinds("a ||= b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::OpAssign("||".into()),
                TokenKind::Identifier("b".into()),
            ]
        );
        assert_eq!(
            kinds("a == b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Operator("==".into()),
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn lex_separators_collapse() {
        assert_eq!(
            kinds("a\n\n# comment\n;b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Separator,
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn lex_with_offset_shifts_spans() {
        let tokens: Vec<_> = Lexer::with_offset("@x", 10).collect();
        assert_eq!(tokens[0].span, Span::new(10, 12));
    }

    #[test]
    fn lex_with_eof_appends_eof() {
        let tokens = lex_with_eof("a");
        assert_eq!(tokens.last().map(|t| t.kind.clone()), Some(TokenKind::Eof));
    }
}
