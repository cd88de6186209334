// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Abstract Syntax Tree (AST) definitions for the analyzed surface language.
//!
//! The AST exists to serve reference analysis: every node that can mention
//! an instance variable carries a [`Span`], and method-definition subtrees
//! can be located and visited selectively (by name and starting line). The
//! tree is rich enough to classify every slot occurrence — read, write,
//! compound assignment, destructuring target — but deliberately does not
//! model the full host language (no modifier conditionals, no constant
//! paths, no hash literals).

use ecow::EcoString;

use crate::source_analysis::Span;

/// Top-level container for one parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Top-level items in source order.
    pub items: Vec<Item>,
    /// Source location spanning the entire file.
    pub span: Span,
}

impl SourceFile {
    /// Creates a new source file node.
    #[must_use]
    pub fn new(items: Vec<Item>, span: Span) -> Self {
        Self { items, span }
    }
}

/// A top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A class definition.
    Class(ClassNode),
    /// A method defined outside any class body.
    Method(MethodNode),
    /// A top-level statement.
    Statement(Expression),
}

/// A class definition: `class Name < Super ... end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    /// The class name.
    pub name: Identifier,
    /// The superclass name, if written.
    pub superclass: Option<Identifier>,
    /// Methods defined in the class body.
    pub methods: Vec<MethodNode>,
    /// Non-method statements in the class body (declaration calls etc.).
    pub statements: Vec<Expression>,
    /// Source location of the entire definition.
    pub span: Span,
}

/// A method definition: `def name(params) ... end`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    /// The method name (writer methods keep their trailing `=`).
    pub name: EcoString,
    /// Source location of the name.
    pub name_span: Span,
    /// True for `def self.name` (type-level) definitions.
    pub is_type_level: bool,
    /// Declared parameters.
    pub parameters: Vec<Parameter>,
    /// The statements in the body.
    pub body: Vec<Expression>,
    /// Source location of the entire definition, starting at `def`.
    pub span: Span,
}

/// How a method parameter binds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// An ordinary positional parameter (optionally defaulted).
    Positional,
    /// A keyword parameter (`name:`, optionally defaulted).
    Keyword,
    /// A rest parameter (`*args`).
    Rest,
    /// A keyword-rest parameter (`**opts`).
    KeywordRest,
    /// A block parameter (`&blk`).
    Block,
}

/// One declared method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The binding style.
    pub kind: ParameterKind,
    /// The parameter name.
    pub name: EcoString,
    /// The default value expression, if any.
    pub default: Option<Expression>,
    /// Source location.
    pub span: Span,
}

/// An identifier with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// The name (ivars keep their `@` sigil).
    pub name: EcoString,
    /// Source location.
    pub span: Span,
}

impl Identifier {
    /// Creates a new identifier.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// An expression (or statement — the distinction is positional).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal, Span),

    /// A read of a local variable (or a paren-less call — the analyzer
    /// does not care which).
    LocalRead(Identifier),

    /// A read of a constant.
    ConstRead(Identifier),

    /// A read of an instance variable.
    IvarRead(Identifier),

    /// The receiver `self`.
    SelfExpr(Span),

    /// A method call, with or without an explicit receiver.
    Call {
        /// The receiver, absent for bare calls.
        receiver: Option<Box<Expression>>,
        /// The method name.
        name: EcoString,
        /// Source location of the name.
        name_span: Span,
        /// Call arguments.
        arguments: Vec<Argument>,
        /// An attached block, if any.
        block: Option<BlockNode>,
        /// Source location of the entire call.
        span: Span,
    },

    /// A prefix operator application (`!x`, `-x`).
    Unary {
        /// The operator.
        op: EcoString,
        /// The operand.
        operand: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A binary operator application.
    Binary {
        /// The operator.
        op: EcoString,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A plain assignment: `target = value`.
    Assign {
        /// The assignment target.
        target: AssignTarget,
        /// The assigned value.
        value: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A compound assignment: `target op= value`.
    OpAssign {
        /// The assignment target.
        target: AssignTarget,
        /// The operator (without the `=`).
        op: EcoString,
        /// The assigned value.
        value: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A destructuring assignment: `a, @b = value`.
    Destructure {
        /// The targets, left to right.
        targets: Vec<AssignTarget>,
        /// The assigned value.
        value: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A double-quoted string with `#{...}` interpolations.
    StringInterpolation {
        /// Literal and embedded-expression segments, in order.
        segments: Vec<StringSegment>,
        /// Source location of the whole literal.
        span: Span,
    },

    /// An array literal: `[a, b]`.
    ArrayLiteral {
        /// Element expressions.
        elements: Vec<Expression>,
        /// Source location including brackets.
        span: Span,
    },

    /// An `if`/`unless` statement with optional `elsif`/`else` arms.
    Conditional {
        /// Condition/body arms in order (`unless` stores a negated condition).
        arms: Vec<CondArm>,
        /// The `else` body, empty when absent.
        else_body: Vec<Expression>,
        /// Source location.
        span: Span,
    },

    /// A `while`/`until` loop (`until` stores a negated condition).
    While {
        /// The loop condition.
        condition: Box<Expression>,
        /// The loop body.
        body: Vec<Expression>,
        /// Source location.
        span: Span,
    },

    /// A `return` statement.
    Return {
        /// The returned value, if written.
        value: Option<Box<Expression>>,
        /// Source location.
        span: Span,
    },

    /// A method definition nested inside another method body.
    MethodDef(Box<MethodNode>),
}

impl Expression {
    /// Returns the span of this expression.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::SelfExpr(span)
            | Self::Call { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Assign { span, .. }
            | Self::OpAssign { span, .. }
            | Self::Destructure { span, .. }
            | Self::StringInterpolation { span, .. }
            | Self::ArrayLiteral { span, .. }
            | Self::Conditional { span, .. }
            | Self::While { span, .. }
            | Self::Return { span, .. } => *span,
            Self::LocalRead(id) | Self::ConstRead(id) | Self::IvarRead(id) => id.span,
            Self::MethodDef(m) => m.span,
        }
    }
}

/// The left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// An instance variable target.
    Ivar(Identifier),
    /// A local variable target.
    Local(Identifier),
    /// An attribute-writer target: `receiver.name = value`.
    Attr {
        /// The receiver expression.
        receiver: Box<Expression>,
        /// The attribute name (without `=`).
        name: EcoString,
        /// Source location of the name.
        span: Span,
    },
}

/// One segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum StringSegment {
    /// Literal text.
    Text(EcoString),
    /// An embedded expression.
    Interpolation(Expression),
}

/// One `if`/`elsif` arm of a conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct CondArm {
    /// The arm condition.
    pub condition: Expression,
    /// The arm body.
    pub body: Vec<Expression>,
}

/// One call argument, optionally labeled (`bread: x`).
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// The keyword label, if any.
    pub label: Option<EcoString>,
    /// The argument value.
    pub value: Expression,
    /// Source location.
    pub span: Span,
}

/// A block attached to a call: `items.each do |x| ... end`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    /// Block parameters.
    pub parameters: Vec<Identifier>,
    /// The block body.
    pub body: Vec<Expression>,
    /// Source location.
    pub span: Span,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// An integer literal.
    Integer(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal without interpolation.
    String(EcoString),
    /// A symbol literal.
    Symbol(EcoString),
    /// A boolean literal.
    Bool(bool),
    /// The nil literal.
    Nil,
}
