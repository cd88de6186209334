// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for the analyzed surface language.
//!
//! The parser turns a token stream into a [`SourceFile`] AST. Binary
//! operator precedence uses a small Pratt loop; everything else is plain
//! recursive descent.
//!
//! Unlike an IDE-grade parser, this one is **fatal on error**: reference
//! analysis is a developer-time tool, and a file that does not parse should
//! fail loudly rather than silently contribute fewer references. The first
//! syntax error aborts the parse with a [`ParseError`].
//!
//! Deliberate non-coverage (kept small on purpose — see the crate docs):
//! modifier conditionals (`x if y`), brace blocks (`{ |x| ... }`), hash
//! literals, and constant paths are not part of the analyzed language.

use ecow::EcoString;

use crate::ast::{
    Argument, AssignTarget, BlockNode, ClassNode, CondArm, Expression, Identifier, Item, Literal,
    MethodNode, Parameter, ParameterKind, SourceFile, StringSegment,
};

use super::lexer::Lexer;
use super::token::StringPart;
use super::{ParseError, Span, Token, TokenKind};

/// Parses source text into a [`SourceFile`].
///
/// # Errors
///
/// Returns the first syntax error encountered; the AST is all-or-nothing.
pub fn parse(source: &str) -> Result<SourceFile, ParseError> {
    let tokens = collect_tokens(Lexer::new(source))?;
    Parser::new(source, tokens).parse_file()
}

/// Runs a lexer to completion, appending an EOF token and rejecting error
/// tokens (which are fatal here).
fn collect_tokens(lexer: Lexer<'_>) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut end = 0;
    for token in lexer {
        if let TokenKind::Error(message) = &token.kind {
            return Err(ParseError::new(message.clone(), token.span));
        }
        end = token.span.end();
        tokens.push(token);
    }
    tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
    Ok(tokens)
}

/// The parser state.
struct Parser<'src> {
    /// The full original source (interpolation slices index into it).
    source: &'src str,
    /// The tokens being parsed (EOF-terminated).
    tokens: Vec<Token>,
    /// Current token index.
    current: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    // ── Token plumbing ───────────────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.current].span
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let idx = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokenKind::Separator) {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<EcoString>) -> ParseError {
        ParseError::new(message, self.peek_span())
    }

    /// Consumes a statement boundary: one or more separators, or lookahead
    /// at a block terminator / EOF.
    fn expect_boundary(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            TokenKind::Separator => {
                self.skip_separators();
                Ok(())
            }
            TokenKind::Eof | TokenKind::End | TokenKind::Elsif | TokenKind::Else => Ok(()),
            other => Err(self.error(format!("expected end of statement, found {other:?}"))),
        }
    }

    // ── File structure ───────────────────────────────────────────────────

    fn parse_file(mut self) -> Result<SourceFile, ParseError> {
        let mut items = Vec::new();
        self.skip_separators();
        while !self.at_eof() {
            items.push(self.parse_item()?);
            self.expect_boundary()?;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "source files over 4GB are not supported"
        )]
        let span = Span::new(0, self.source.len() as u32);
        Ok(SourceFile::new(items, span))
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        match self.peek() {
            TokenKind::Class => Ok(Item::Class(self.parse_class()?)),
            TokenKind::Def => Ok(Item::Method(self.parse_method()?)),
            _ => Ok(Item::Statement(self.parse_statement()?)),
        }
    }

    fn parse_class(&mut self) -> Result<ClassNode, ParseError> {
        let start = self.peek_span();
        self.advance(); // class

        let TokenKind::Constant(name) = self.peek().clone() else {
            return Err(self.error("expected class name"));
        };
        let name = Identifier::new(name, self.peek_span());
        self.advance();

        let superclass = if matches!(self.peek(), TokenKind::Operator(op) if op == "<") {
            self.advance();
            let TokenKind::Constant(sup) = self.peek().clone() else {
                return Err(self.error("expected superclass name"));
            };
            let id = Identifier::new(sup, self.peek_span());
            self.advance();
            Some(id)
        } else {
            None
        };

        self.expect_boundary()?;

        let mut methods = Vec::new();
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                TokenKind::End => break,
                TokenKind::Eof => return Err(self.error("expected `end` to close class body")),
                TokenKind::Def => {
                    methods.push(self.parse_method()?);
                    self.expect_boundary()?;
                }
                _ => {
                    statements.push(self.parse_statement()?);
                    self.expect_boundary()?;
                }
            }
        }
        let end = self.peek_span();
        self.advance(); // end

        Ok(ClassNode {
            name,
            superclass,
            methods,
            statements,
            span: start.merge(end),
        })
    }

    fn parse_method(&mut self) -> Result<MethodNode, ParseError> {
        let start = self.peek_span();
        self.advance(); // def

        let is_type_level = if matches!(self.peek(), TokenKind::SelfKw)
            && matches!(self.peek_nth(1), TokenKind::Dot)
        {
            self.advance();
            self.advance();
            true
        } else {
            false
        };

        let TokenKind::Identifier(name) = self.peek().clone() else {
            return Err(self.error("expected method name"));
        };
        let mut name = name;
        let mut name_span = self.peek_span();
        self.advance();

        // `def bread=(value)` — the `=` belongs to the name only when glued
        // to it, otherwise it would swallow `def x = 1`-style syntax we
        // do not support anyway.
        if matches!(self.peek(), TokenKind::Assign) && self.peek_span().start() == name_span.end() {
            name = EcoString::from(format!("{name}="));
            name_span = name_span.merge(self.peek_span());
            self.advance();
        }

        let parameters = if matches!(self.peek(), TokenKind::LeftParen) {
            self.parse_parameters()?
        } else {
            Vec::new()
        };

        self.expect_boundary()?;
        let body = self.parse_body_until_end()?;
        let end = self.peek_span();
        self.advance(); // end

        Ok(MethodNode {
            name,
            name_span,
            is_type_level,
            parameters,
            body,
            span: start.merge(end),
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.advance(); // (
        let mut parameters = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::RightParen) {
                break;
            }
            parameters.push(self.parse_parameter()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => break,
                _ => return Err(self.error("expected `,` or `)` in parameter list")),
            }
        }
        self.advance(); // )
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        let start = self.peek_span();
        let kind = match self.peek() {
            TokenKind::Operator(op) if op == "*" => {
                self.advance();
                ParameterKind::Rest
            }
            TokenKind::Operator(op) if op == "**" => {
                self.advance();
                ParameterKind::KeywordRest
            }
            TokenKind::Amp => {
                self.advance();
                ParameterKind::Block
            }
            TokenKind::Label(_) => ParameterKind::Keyword,
            _ => ParameterKind::Positional,
        };

        let name = match self.peek().clone() {
            TokenKind::Label(name) if kind == ParameterKind::Keyword => {
                self.advance();
                name
            }
            TokenKind::Identifier(name) => {
                self.advance();
                name
            }
            _ => return Err(self.error("expected parameter name")),
        };

        // Keyword params default after the label, positional after `=`.
        let default = match (kind, self.peek()) {
            (ParameterKind::Keyword, t)
                if !matches!(t, TokenKind::Comma | TokenKind::RightParen) =>
            {
                Some(self.parse_expression(0)?)
            }
            (ParameterKind::Positional, TokenKind::Assign) => {
                self.advance();
                Some(self.parse_expression(0)?)
            }
            _ => None,
        };

        let span = default
            .as_ref()
            .map_or(start, |d| start.merge(d.span()));
        Ok(Parameter {
            kind,
            name,
            default,
            span,
        })
    }

    /// Parses statements up to (but not consuming) a matching `end`.
    fn parse_body_until_end(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.parse_statements_until(|t| matches!(t, TokenKind::End))
    }

    fn parse_statements_until(
        &mut self,
        terminator: impl Fn(&TokenKind) -> bool,
    ) -> Result<Vec<Expression>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            if terminator(self.peek()) {
                return Ok(body);
            }
            if self.at_eof() {
                return Err(self.error("unexpected end of file (missing `end`?)"));
            }
            body.push(self.parse_statement()?);
            self.expect_boundary()?;
        }
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_conditional(false),
            TokenKind::Unless => self.parse_conditional(true),
            TokenKind::While => self.parse_loop(false),
            TokenKind::Until => self.parse_loop(true),
            TokenKind::Def => Ok(Expression::MethodDef(Box::new(self.parse_method()?))),
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_return(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        self.advance(); // return
        if matches!(
            self.peek(),
            TokenKind::Separator | TokenKind::Eof | TokenKind::End
        ) {
            return Ok(Expression::Return {
                value: None,
                span: start,
            });
        }
        let value = self.parse_expression(0)?;
        let span = start.merge(value.span());
        Ok(Expression::Return {
            value: Some(Box::new(value)),
            span,
        })
    }

    fn parse_conditional(&mut self, negated: bool) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        self.advance(); // if / unless

        let mut arms = Vec::new();
        let condition = self.parse_condition(negated)?;
        self.expect_then_or_boundary()?;
        let body =
            self.parse_statements_until(|t| matches!(t, TokenKind::Elsif | TokenKind::Else | TokenKind::End))?;
        arms.push(CondArm { condition, body });

        while matches!(self.peek(), TokenKind::Elsif) {
            self.advance();
            let condition = self.parse_condition(false)?;
            self.expect_then_or_boundary()?;
            let body = self.parse_statements_until(|t| {
                matches!(t, TokenKind::Elsif | TokenKind::Else | TokenKind::End)
            })?;
            arms.push(CondArm { condition, body });
        }

        let else_body = if matches!(self.peek(), TokenKind::Else) {
            self.advance();
            self.parse_body_until_end()?
        } else {
            Vec::new()
        };

        let end = self.peek_span();
        if !matches!(self.peek(), TokenKind::End) {
            return Err(self.error("expected `end` to close conditional"));
        }
        self.advance();

        Ok(Expression::Conditional {
            arms,
            else_body,
            span: start.merge(end),
        })
    }

    fn parse_loop(&mut self, negated: bool) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        self.advance(); // while / until
        let condition = self.parse_condition(negated)?;
        if matches!(self.peek(), TokenKind::Do) {
            self.advance();
        }
        self.expect_boundary()?;
        let body = self.parse_body_until_end()?;
        let end = self.peek_span();
        self.advance(); // end
        Ok(Expression::While {
            condition: Box::new(condition),
            body,
            span: start.merge(end),
        })
    }

    fn parse_condition(&mut self, negated: bool) -> Result<Expression, ParseError> {
        let condition = self.parse_expression(0)?;
        if negated {
            let span = condition.span();
            return Ok(Expression::Unary {
                op: EcoString::from("!"),
                operand: Box::new(condition),
                span,
            });
        }
        Ok(condition)
    }

    fn expect_then_or_boundary(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek(), TokenKind::Then) {
            self.advance();
            self.skip_separators();
            return Ok(());
        }
        self.expect_boundary()
    }

    fn parse_assignment_or_expression(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_expression(0)?;

        match self.peek().clone() {
            TokenKind::Assign => {
                self.advance();
                let target = self.to_target(first)?;
                let value = self.parse_expression(0)?;
                let span = target_span(&target).merge(value.span());
                Ok(Expression::Assign {
                    target,
                    value: Box::new(value),
                    span,
                })
            }
            TokenKind::OpAssign(op) => {
                self.advance();
                let target = self.to_target(first)?;
                let value = self.parse_expression(0)?;
                let span = target_span(&target).merge(value.span());
                Ok(Expression::OpAssign {
                    target,
                    op,
                    value: Box::new(value),
                    span,
                })
            }
            TokenKind::Comma => {
                let mut targets = vec![self.to_target(first)?];
                while matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                    let next = self.parse_expression(0)?;
                    targets.push(self.to_target(next)?);
                }
                if !matches!(self.peek(), TokenKind::Assign) {
                    return Err(self.error("expected `=` after destructuring targets"));
                }
                self.advance();
                let value = self.parse_expression(0)?;
                let span = target_span(&targets[0]).merge(value.span());
                Ok(Expression::Destructure {
                    targets,
                    value: Box::new(value),
                    span,
                })
            }
            _ => Ok(first),
        }
    }

    fn to_target(&self, expr: Expression) -> Result<AssignTarget, ParseError> {
        match expr {
            Expression::IvarRead(id) => Ok(AssignTarget::Ivar(id)),
            Expression::LocalRead(id) => Ok(AssignTarget::Local(id)),
            Expression::Call {
                receiver: Some(receiver),
                name,
                name_span,
                arguments,
                block: None,
                ..
            } if arguments.is_empty() => Ok(AssignTarget::Attr {
                receiver,
                name,
                span: name_span,
            }),
            other => Err(ParseError::new("invalid assignment target", other.span())),
        }
    }

    // ── Expressions (Pratt loop for binary operators) ────────────────────

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let TokenKind::Operator(op) = self.peek().clone() else {
                break;
            };
            let Some(bp) = binding_power(&op) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expression(bp + 1)?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expression::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        match self.peek() {
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start.merge(operand.span());
                Ok(Expression::Unary {
                    op: EcoString::from("!"),
                    operand: Box::new(operand),
                    span,
                })
            }
            TokenKind::Operator(op) if op == "-" => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start.merge(operand.span());
                Ok(Expression::Unary {
                    op: EcoString::from("-"),
                    operand: Box::new(operand),
                    span,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        while matches!(self.peek(), TokenKind::Dot) {
            self.advance();
            let TokenKind::Identifier(name) = self.peek().clone() else {
                return Err(self.error("expected method name after `.`"));
            };
            let name_span = self.peek_span();
            self.advance();

            let arguments = if matches!(self.peek(), TokenKind::LeftParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            let block = self.parse_optional_block()?;

            let mut span = expr.span().merge(name_span);
            if let Some(b) = &block {
                span = span.merge(b.span);
            }
            if let Some(last) = arguments.last() {
                span = span.merge(last.span);
            }
            expr = Expression::Call {
                receiver: Some(Box::new(expr)),
                name,
                name_span,
                arguments,
                block,
                span,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Integer(text) => {
                self.advance();
                let digits: String = text.chars().filter(|c| *c != '_').collect();
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| ParseError::new("invalid integer literal", span))?;
                Ok(Expression::Literal(Literal::Integer(value), span))
            }
            TokenKind::Float(text) => {
                self.advance();
                let digits: String = text.chars().filter(|c| *c != '_').collect();
                let value = digits
                    .parse::<f64>()
                    .map_err(|_| ParseError::new("invalid float literal", span))?;
                Ok(Expression::Literal(Literal::Float(value), span))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(value), span))
            }
            TokenKind::InterpolatedString(parts) => {
                self.advance();
                let segments = self.parse_interpolation(&parts)?;
                Ok(Expression::StringInterpolation { segments, span })
            }
            TokenKind::Symbol(name) => {
                self.advance();
                Ok(Expression::Literal(Literal::Symbol(name), span))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::Literal(Literal::Nil, span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(false), span))
            }
            TokenKind::SelfKw => {
                self.advance();
                Ok(Expression::SelfExpr(span))
            }
            TokenKind::Ivar(name) => {
                self.advance();
                Ok(Expression::IvarRead(Identifier::new(name, span)))
            }
            TokenKind::Constant(name) => {
                self.advance();
                Ok(Expression::ConstRead(Identifier::new(name, span)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_bare_call(name, span)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression(0)?;
                if !matches!(self.peek(), TokenKind::RightParen) {
                    return Err(self.error("expected `)`"));
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::LeftBracket => self.parse_array(),
            other => Err(self.error(format!("expected expression, found {other:?}"))),
        }
    }

    /// Parses what follows a bare identifier: a parenthesized call, a
    /// paren-less call (argument must start with an unambiguous token), a
    /// call with only a block, or a plain local read.
    fn parse_bare_call(&mut self, name: EcoString, name_span: Span) -> Result<Expression, ParseError> {
        if matches!(self.peek(), TokenKind::LeftParen) {
            let arguments = self.parse_arguments()?;
            let block = self.parse_optional_block()?;
            let mut span = name_span;
            if let Some(last) = arguments.last() {
                span = span.merge(last.span);
            }
            if let Some(b) = &block {
                span = span.merge(b.span);
            }
            return Ok(Expression::Call {
                receiver: None,
                name,
                name_span,
                arguments,
                block,
                span,
            });
        }

        if starts_parenless_argument(self.peek()) {
            let mut arguments = Vec::new();
            loop {
                arguments.push(self.parse_argument()?);
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let span = name_span.merge(arguments.last().map_or(name_span, |a| a.span));
            return Ok(Expression::Call {
                receiver: None,
                name,
                name_span,
                arguments,
                block: None,
                span,
            });
        }

        if matches!(self.peek(), TokenKind::Do) {
            let block = self.parse_optional_block()?;
            let span = block.as_ref().map_or(name_span, |b| name_span.merge(b.span));
            return Ok(Expression::Call {
                receiver: None,
                name,
                name_span,
                arguments: Vec::new(),
                block,
                span,
            });
        }

        Ok(Expression::LocalRead(Identifier::new(name, name_span)))
    }

    fn parse_array(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        self.advance(); // [
        let mut elements = Vec::new();
        loop {
            self.skip_separators();
            if matches!(self.peek(), TokenKind::RightBracket) {
                break;
            }
            elements.push(self.parse_expression(0)?);
            self.skip_separators();
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBracket => break,
                _ => return Err(self.error("expected `,` or `]` in array literal")),
            }
        }
        let end = self.peek_span();
        self.advance(); // ]
        Ok(Expression::ArrayLiteral {
            elements,
            span: start.merge(end),
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        self.advance(); // (
        let mut arguments = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::RightParen) {
                break;
            }
            arguments.push(self.parse_argument()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => break,
                _ => return Err(self.error("expected `,` or `)` in argument list")),
            }
        }
        self.advance(); // )
        Ok(arguments)
    }

    fn parse_argument(&mut self) -> Result<Argument, ParseError> {
        let start = self.peek_span();
        if let TokenKind::Label(label) = self.peek().clone() {
            self.advance();
            let value = self.parse_expression(0)?;
            let span = start.merge(value.span());
            return Ok(Argument {
                label: Some(label),
                value,
                span,
            });
        }
        let value = self.parse_expression(0)?;
        let span = value.span();
        Ok(Argument {
            label: None,
            value,
            span,
        })
    }

    fn parse_optional_block(&mut self) -> Result<Option<BlockNode>, ParseError> {
        if !matches!(self.peek(), TokenKind::Do) {
            return Ok(None);
        }
        let start = self.peek_span();
        self.advance(); // do

        let mut parameters = Vec::new();
        if matches!(self.peek(), TokenKind::Pipe) {
            self.advance();
            loop {
                let TokenKind::Identifier(name) = self.peek().clone() else {
                    return Err(self.error("expected block parameter name"));
                };
                parameters.push(Identifier::new(name, self.peek_span()));
                self.advance();
                match self.peek() {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::Pipe => break,
                    _ => return Err(self.error("expected `,` or `|` in block parameters")),
                }
            }
            self.advance(); // |
        }

        let body = self.parse_body_until_end()?;
        let end = self.peek_span();
        self.advance(); // end
        Ok(Some(BlockNode {
            parameters,
            body,
            span: start.merge(end),
        }))
    }

    /// Parses the `#{...}` code parts of an interpolated string, reusing
    /// the original source so spans point into the real file.
    fn parse_interpolation(
        &mut self,
        parts: &[StringPart],
    ) -> Result<Vec<StringSegment>, ParseError> {
        let mut segments = Vec::new();
        for part in parts {
            match part {
                StringPart::Text(text) => segments.push(StringSegment::Text(text.clone())),
                StringPart::Code(span) => {
                    let slice = &self.source[span.as_range()];
                    let tokens = collect_tokens(Lexer::with_offset(slice, span.start()))?;
                    let mut sub = Parser::new(self.source, tokens);
                    sub.skip_separators();
                    let expr = sub.parse_expression(0)?;
                    sub.skip_separators();
                    if !sub.at_eof() {
                        return Err(ParseError::new(
                            "unexpected trailing tokens in interpolation",
                            sub.peek_span(),
                        ));
                    }
                    segments.push(StringSegment::Interpolation(expr));
                }
            }
        }
        Ok(segments)
    }
}

/// Returns the span of an assignment target.
fn target_span(target: &AssignTarget) -> Span {
    match target {
        AssignTarget::Ivar(id) | AssignTarget::Local(id) => id.span,
        AssignTarget::Attr { receiver, span, .. } => receiver.span().merge(*span),
    }
}

/// Binding power for binary operators (higher binds tighter).
fn binding_power(op: &str) -> Option<u8> {
    let bp = match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" | "=~" => 3,
        "<" | ">" | "<=" | ">=" => 4,
        "<<" | ">>" => 5,
        "+" | "-" => 6,
        "*" | "/" | "%" => 7,
        "**" => 8,
        _ => return None,
    };
    Some(bp)
}

/// Tokens that may begin a paren-less call argument.
///
/// Bare identifiers are excluded: `a b` stays a parse error rather than
/// guessing, which keeps `a + b`-style expressions unambiguous.
fn starts_parenless_argument(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::String(_)
            | TokenKind::InterpolatedString(_)
            | TokenKind::Symbol(_)
            | TokenKind::Ivar(_)
            | TokenKind::Label(_)
            | TokenKind::Constant(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SourceFile {
        match parse(source) {
            Ok(file) => file,
            Err(err) => panic!("parse failed: {err} at {:?}", err.span),
        }
    }

    fn first_method(file: &SourceFile) -> &MethodNode {
        match &file.items[0] {
            Item::Method(m) => m,
            other => panic!("expected method, got {other:?}"),
        }
    }

    // --- Structure ---

    #[test]
    fn parse_empty_file() {
        let file = parse_ok("\n\n");
        assert!(file.items.is_empty());
    }

    #[test]
    fn parse_method_definition() {
        let file = parse_ok("def to_s\n  @bread\nend\n");
        let method = first_method(&file);
        assert_eq!(method.name, "to_s");
        assert!(!method.is_type_level);
        assert_eq!(method.body.len(), 1);
        assert!(matches!(&method.body[0], Expression::IvarRead(id) if id.name == "@bread"));
    }

    #[test]
    fn parse_type_level_method() {
        let file = parse_ok("def self.build\n  nil\nend\n");
        let method = first_method(&file);
        assert_eq!(method.name, "build");
        assert!(method.is_type_level);
    }

    #[test]
    fn parse_writer_method_name() {
        let file = parse_ok("def bread=(value)\n  @bread = value\nend\n");
        let method = first_method(&file);
        assert_eq!(method.name, "bread=");
        assert_eq!(method.parameters.len(), 1);
    }

    #[test]
    fn parse_class_with_methods_and_statements() {
        let source = "class Sandwich < Lunch\n  ivar :@bread\n  def initialize\n    @bread = 'wheat'\n  end\nend\n";
        let file = parse_ok(source);
        let Item::Class(class) = &file.items[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name.name, "Sandwich");
        assert_eq!(class.superclass.as_ref().map(|s| s.name.as_str()), Some("Lunch"));
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.statements.len(), 1);
    }

    #[test]
    fn parse_two_classes_in_one_file() {
        let source = "class A\n  def x\n    @a\n  end\nend\nclass B\n  def x\n    @b\n  end\nend\n";
        let file = parse_ok(source);
        assert_eq!(file.items.len(), 2);
    }

    #[test]
    fn parse_nested_method_definition() {
        let source = "def outer\n  def inner\n    @hidden\n  end\n  @seen\nend\n";
        let file = parse_ok(source);
        let method = first_method(&file);
        assert_eq!(method.body.len(), 2);
        assert!(matches!(&method.body[0], Expression::MethodDef(m) if m.name == "inner"));
    }

    // --- Parameters ---

    #[test]
    fn parse_parameter_kinds() {
        let file = parse_ok("def m(a, b = 1, c:, d: 2, *rest, **opts, &blk)\nend\n");
        let method = first_method(&file);
        let kinds: Vec<ParameterKind> = method.parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::Positional,
                ParameterKind::Positional,
                ParameterKind::Keyword,
                ParameterKind::Keyword,
                ParameterKind::Rest,
                ParameterKind::KeywordRest,
                ParameterKind::Block,
            ]
        );
        assert!(method.parameters[1].default.is_some());
        assert!(method.parameters[2].default.is_none());
        assert!(method.parameters[3].default.is_some());
    }

    // --- Assignments ---

    #[test]
    fn parse_ivar_assignment() {
        let file = parse_ok("@bread = 'wheat'\n");
        let Item::Statement(Expression::Assign { target, .. }) = &file.items[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(target, AssignTarget::Ivar(id) if id.name == "@bread"));
    }

    #[test]
    fn parse_compound_assignment() {
        let file = parse_ok("@count += 1\n");
        let Item::Statement(Expression::OpAssign { target, op, .. }) = &file.items[0] else {
            panic!("expected compound assignment");
        };
        assert!(matches!(target, AssignTarget::Ivar(id) if id.name == "@count"));
        assert_eq!(op, "+");
    }

    #[test]
    fn parse_destructuring_assignment() {
        let file = parse_ok("@a, b, @c = parts\n");
        let Item::Statement(Expression::Destructure { targets, .. }) = &file.items[0] else {
            panic!("expected destructure");
        };
        assert_eq!(targets.len(), 3);
        assert!(matches!(&targets[0], AssignTarget::Ivar(id) if id.name == "@a"));
        assert!(matches!(&targets[1], AssignTarget::Local(id) if id.name == "b"));
        assert!(matches!(&targets[2], AssignTarget::Ivar(id) if id.name == "@c"));
    }

    #[test]
    fn parse_attr_assignment() {
        let file = parse_ok("order.total = 5\n");
        let Item::Statement(Expression::Assign { target, .. }) = &file.items[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(target, AssignTarget::Attr { name, .. } if name == "total"));
    }

    #[test]
    fn invalid_assignment_target_is_fatal() {
        assert!(parse("1 = 2\n").is_err());
    }

    // --- Expressions ---

    #[test]
    fn parse_binary_precedence() {
        let file = parse_ok("x = 1 + 2 * 3\n");
        let Item::Statement(Expression::Assign { value, .. }) = &file.items[0] else {
            panic!("expected assignment");
        };
        let Expression::Binary { op, right, .. } = value.as_ref() else {
            panic!("expected binary");
        };
        assert_eq!(op, "+");
        assert!(matches!(right.as_ref(), Expression::Binary { op, .. } if op == "*"));
    }

    #[test]
    fn parse_call_chain() {
        let file = parse_ok("x = name.strip.upcase\n");
        let Item::Statement(Expression::Assign { value, .. }) = &file.items[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(value.as_ref(), Expression::Call { name, .. } if name == "upcase"));
    }

    #[test]
    fn parse_keyword_arguments() {
        let file = parse_ok("make(bread: :wheat, cheese: @cheese)\n");
        let Item::Statement(Expression::Call { arguments, .. }) = &file.items[0] else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[0].label.as_deref(), Some("bread"));
        assert!(matches!(&arguments[1].value, Expression::IvarRead(id) if id.name == "@cheese"));
    }

    #[test]
    fn parse_parenless_call() {
        let file = parse_ok("ivar :@bread, init: :kwarg\n");
        let Item::Statement(Expression::Call {
            name, arguments, ..
        }) = &file.items[0]
        else {
            panic!("expected call");
        };
        assert_eq!(name, "ivar");
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[1].label.as_deref(), Some("init"));
    }

    #[test]
    fn parse_block_with_parameters() {
        let file = parse_ok("items.each do |item, i|\n  @total += item\nend\n");
        let Item::Statement(Expression::Call { block, .. }) = &file.items[0] else {
            panic!("expected call");
        };
        let block = block.as_ref().expect("block");
        assert_eq!(block.parameters.len(), 2);
        assert_eq!(block.body.len(), 1);
    }

    #[test]
    fn parse_string_interpolation() {
        let file = parse_ok("s = \"a #{@cheese} b\"\n");
        let Item::Statement(Expression::Assign { value, .. }) = &file.items[0] else {
            panic!("expected assignment");
        };
        let Expression::StringInterpolation { segments, .. } = value.as_ref() else {
            panic!("expected interpolation");
        };
        assert_eq!(segments.len(), 3);
        let StringSegment::Interpolation(Expression::IvarRead(id)) = &segments[1] else {
            panic!("expected embedded ivar");
        };
        assert_eq!(id.name, "@cheese");
        // Span points into the original file, not the slice.
        assert_eq!(id.span, Span::new(9, 16));
    }

    #[test]
    fn parse_conditional_with_elsif_and_else() {
        let source = "if @a\n  1\nelsif @b\n  2\nelse\n  3\nend\n";
        let file = parse_ok(source);
        let Item::Statement(Expression::Conditional {
            arms, else_body, ..
        }) = &file.items[0]
        else {
            panic!("expected conditional");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn parse_unless_negates_condition() {
        let file = parse_ok("unless done\n  work\nend\n");
        let Item::Statement(Expression::Conditional { arms, .. }) = &file.items[0] else {
            panic!("expected conditional");
        };
        assert!(matches!(&arms[0].condition, Expression::Unary { op, .. } if op == "!"));
    }

    #[test]
    fn parse_while_loop() {
        let file = parse_ok("while @n > 0\n  @n -= 1\nend\n");
        assert!(matches!(
            &file.items[0],
            Item::Statement(Expression::While { .. })
        ));
    }

    // --- Fatal errors ---

    #[test]
    fn missing_end_is_fatal() {
        assert!(parse("def broken\n  @x\n").is_err());
    }

    #[test]
    fn lexer_error_is_fatal() {
        assert!(parse("def m\n  @@legacy\nend\n").is_err());
    }

    #[test]
    fn unterminated_string_is_fatal() {
        assert!(parse("x = \"oops\n").is_err());
    }
}
