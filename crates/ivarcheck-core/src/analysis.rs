// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Static reference analysis: which instance variables does a class's own
//! source mention, and where?
//!
//! Analysis is a pure function of the class's directly-defined methods.
//! Each backing source file is read and parsed exactly once per call;
//! method-definition nodes are located by name **and** starting line so a
//! same-named method elsewhere in the file (including one nested inside
//! another method body) is never matched by mistake. Only the targeted
//! method's own subtree is walked, so two classes sharing a file cannot
//! cross-contaminate.
//!
//! A method without a resolvable source location contributes nothing. A
//! file that cannot be read or parsed is fatal ([`AnalysisError`]).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use ecow::EcoString;

use crate::ast::{AssignTarget, Expression, Item, MethodNode, SourceFile};
use crate::ast_walker::walk_body;
use crate::error::AnalysisError;
use crate::object_model::{ClassId, MethodContext, Registry};
use crate::source_analysis::{parse, LineMap};

/// One syntactic occurrence of an instance variable in a method body:
/// a read, a write, a compound-assignment target, or a destructuring
/// target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The referenced name, sigil included.
    pub name: EcoString,
    /// The source file containing the occurrence.
    pub path: Utf8PathBuf,
    /// The 1-based line.
    pub line: u32,
    /// The 1-based column.
    pub column: u32,
    /// The enclosing method, or `None` for top-level code.
    pub method: Option<EcoString>,
    /// Whether the enclosing method is instance- or type-level.
    pub context: MethodContext,
}

/// The analysis result for one class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassAnalysis {
    /// Every referenced name, sorted and deduplicated.
    pub ivars: BTreeSet<EcoString>,
    /// Every occurrence, in method-registration then source order.
    pub references: Vec<Reference>,
}

/// Analyzes the methods defined directly on `class`.
///
/// Wrapped methods resolve through the registry's method stash, so the
/// original defining location is used even after decoration.
pub(crate) fn analyze_class(
    registry: &Registry,
    class: ClassId,
) -> Result<ClassAnalysis, AnalysisError> {
    let mut targets = Vec::new();
    for (name, context, location) in registry.method_surface(class) {
        let effective = registry
            .stashed_location(class, &name, context)
            .or(location);
        // A method with no discoverable location contributes nothing.
        if let Some(location) = effective {
            targets.push((name, context, location));
        }
    }

    let mut parsed: BTreeMap<Utf8PathBuf, (SourceFile, LineMap)> = BTreeMap::new();
    for (_, _, location) in &targets {
        if parsed.contains_key(&location.path) {
            continue;
        }
        let source =
            std::fs::read_to_string(location.path.as_std_path()).map_err(|source| {
                AnalysisError::Io {
                    path: location.path.clone(),
                    source,
                }
            })?;
        let file = parse(&source).map_err(|source| AnalysisError::Parse {
            path: location.path.clone(),
            source,
        })?;
        let line_map = LineMap::new(&source);
        parsed.insert(location.path.clone(), (file, line_map));
    }

    let mut references = Vec::new();
    for (name, context, location) in &targets {
        let Some((file, line_map)) = parsed.get(&location.path) else {
            continue;
        };
        let Some(node) = find_method_node(file, line_map, name, *context, location.line) else {
            continue;
        };
        collect_references(
            &node.body,
            line_map,
            &location.path,
            name,
            *context,
            &mut references,
        );
    }

    let ivars = references.iter().map(|r| r.name.clone()).collect();
    Ok(ClassAnalysis { ivars, references })
}

/// Locates the method-definition node matching name, context, and starting
/// line. Nested definitions are candidates too, but only an exact line
/// match wins, so a same-named nested method at a different line is never
/// confused with the target.
fn find_method_node<'a>(
    file: &'a SourceFile,
    line_map: &LineMap,
    name: &str,
    context: MethodContext,
    line: u32,
) -> Option<&'a MethodNode> {
    let want_type_level = context == MethodContext::Type;
    all_method_nodes(file).into_iter().find(|node| {
        node.name == name
            && node.is_type_level == want_type_level
            && line_map.line(node.span.start()) == line
    })
}

/// Every method-definition node in the file, including definitions nested
/// inside other method bodies and inside blocks.
fn all_method_nodes(file: &SourceFile) -> Vec<&MethodNode> {
    let mut nodes = Vec::new();
    for item in &file.items {
        match item {
            Item::Method(method) => push_with_nested(method, &mut nodes),
            Item::Class(class) => {
                for method in &class.methods {
                    push_with_nested(method, &mut nodes);
                }
                collect_nested_defs(&class.statements, &mut nodes);
            }
            Item::Statement(_) => {}
        }
    }
    let top_level = file.items.iter().filter_map(|item| match item {
        Item::Statement(expr) => Some(expr),
        _ => None,
    });
    collect_nested_defs(top_level, &mut nodes);
    nodes
}

fn push_with_nested<'a>(method: &'a MethodNode, out: &mut Vec<&'a MethodNode>) {
    out.push(method);
    collect_nested_defs(&method.body, out);
}

fn collect_nested_defs<'a>(
    statements: impl IntoIterator<Item = &'a Expression>,
    out: &mut Vec<&'a MethodNode>,
) {
    let mut found: Vec<&'a MethodNode> = Vec::new();
    for expr in statements {
        crate::ast_walker::walk_expression(expr, &mut |e| {
            if let Expression::MethodDef(method) = e {
                found.push(method);
            }
        });
    }
    for method in found {
        push_with_nested(method, out);
    }
}

/// Collects every ivar occurrence in one method body (nested definitions
/// excluded; they are separate analysis targets).
fn collect_references(
    body: &[Expression],
    line_map: &LineMap,
    path: &Utf8PathBuf,
    method: &EcoString,
    context: MethodContext,
    out: &mut Vec<Reference>,
) {
    walk_body(body, &mut |expr| {
        match expr {
            Expression::IvarRead(id) => {
                out.push(make_reference(id, line_map, path, method, context));
            }
            Expression::Assign { target, .. } | Expression::OpAssign { target, .. } => {
                if let AssignTarget::Ivar(id) = target {
                    out.push(make_reference(id, line_map, path, method, context));
                }
            }
            Expression::Destructure { targets, .. } => {
                for target in targets {
                    if let AssignTarget::Ivar(id) = target {
                        out.push(make_reference(id, line_map, path, method, context));
                    }
                }
            }
            _ => {}
        }
    });
}

fn make_reference(
    id: &crate::ast::Identifier,
    line_map: &LineMap,
    path: &Utf8PathBuf,
    method: &EcoString,
    context: MethodContext,
) -> Reference {
    let position = line_map.position(id.span.start());
    Reference {
        name: id.name.clone(),
        path: path.clone(),
        line: position.line,
        column: position.column,
        method: Some(method.clone()),
        context,
    }
}
