// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Shared AST expression walker for the reference analyzer.
//!
//! Provides a pre-order recursive walk over a single expression tree
//! ([`walk_expression`]) plus a convenience over a whole statement sequence
//! ([`walk_body`]). The visitor closure is called on the current node before
//! its children.
//!
//! Nested method definitions are deliberately **not** entered: a `def`
//! inside a method body starts a fresh slot context, and the analyzer
//! visits each method body exactly once. Callers that want the nested
//! bodies visit them explicitly.

use crate::ast::{AssignTarget, BlockNode, Expression, StringSegment};

/// Walks an expression tree in pre-order, calling `f` on every node.
///
/// The visitor receives references tied to the tree's own lifetime, so
/// callers may collect nodes out of the walk.
pub(crate) fn walk_expression<'a, F>(expr: &'a Expression, f: &mut F)
where
    F: FnMut(&'a Expression),
{
    f(expr);
    match expr {
        Expression::Call {
            receiver,
            arguments,
            block,
            ..
        } => {
            if let Some(receiver) = receiver {
                walk_expression(receiver, f);
            }
            for arg in arguments {
                walk_expression(&arg.value, f);
            }
            if let Some(block) = block {
                walk_block(block, f);
            }
        }
        Expression::Unary { operand, .. } => {
            walk_expression(operand, f);
        }
        Expression::Binary { left, right, .. } => {
            walk_expression(left, f);
            walk_expression(right, f);
        }
        Expression::Assign { target, value, .. } | Expression::OpAssign { target, value, .. } => {
            walk_target(target, f);
            walk_expression(value, f);
        }
        Expression::Destructure { targets, value, .. } => {
            for target in targets {
                walk_target(target, f);
            }
            walk_expression(value, f);
        }
        Expression::StringInterpolation { segments, .. } => {
            for seg in segments {
                if let StringSegment::Interpolation(e) = seg {
                    walk_expression(e, f);
                }
            }
        }
        Expression::ArrayLiteral { elements, .. } => {
            for elem in elements {
                walk_expression(elem, f);
            }
        }
        Expression::Conditional {
            arms, else_body, ..
        } => {
            for arm in arms {
                walk_expression(&arm.condition, f);
                walk_body(&arm.body, f);
            }
            walk_body(else_body, f);
        }
        Expression::While {
            condition, body, ..
        } => {
            walk_expression(condition, f);
            walk_body(body, f);
        }
        Expression::Return { value, .. } => {
            if let Some(value) = value {
                walk_expression(value, f);
            }
        }
        // Leaf nodes, and nested `def` which starts a fresh slot context.
        Expression::Literal(..)
        | Expression::LocalRead(..)
        | Expression::ConstRead(..)
        | Expression::IvarRead(..)
        | Expression::SelfExpr(..)
        | Expression::MethodDef(..) => {}
    }
}

/// Walks every expression in a statement sequence (pre-order).
pub(crate) fn walk_body<'a, F>(body: &'a [Expression], f: &mut F)
where
    F: FnMut(&'a Expression),
{
    for expr in body {
        walk_expression(expr, f);
    }
}

fn walk_block<'a, F>(block: &'a BlockNode, f: &mut F)
where
    F: FnMut(&'a Expression),
{
    walk_body(&block.body, f);
}

/// Walks the receiver and defaults reachable from an assignment target.
///
/// The target itself is not an [`Expression`] node, so ivar targets are
/// surfaced to the visitor by the assignment variants directly; only the
/// receiver of an attribute-writer target needs recursion.
fn walk_target<'a, F>(target: &'a AssignTarget, f: &mut F)
where
    F: FnMut(&'a Expression),
{
    if let AssignTarget::Attr { receiver, .. } = target {
        walk_expression(receiver, f);
    }
}
