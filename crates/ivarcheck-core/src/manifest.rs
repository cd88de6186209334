// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Per-class declaration manifests, ancestor merging, and the
//! pre-construction protocol.
//!
//! A manifest exists only for a class that has at least one declaration
//! (explicit or implicit); classes without declarations never materialize
//! one. The effective declaration set for a class is its ancestor chain's
//! manifests merged least- to most-derived, a more-derived redeclaration
//! replacing a less-derived one while keeping the first declaration's
//! position in the order. That position stability is what makes positional
//! peel-off deterministic across the hierarchy.

use ecow::EcoString;

use crate::declaration::{strip_sigil, Declaration, InitSource};
use crate::object_model::{ClassId, CtorArgs, Instance};

/// The declaration registry for exactly one class.
#[derive(Debug, Clone)]
pub struct Manifest {
    owner: ClassId,
    declarations: Vec<Declaration>,
}

impl Manifest {
    pub(crate) fn new(owner: ClassId) -> Self {
        Self {
            owner,
            declarations: Vec::new(),
        }
    }

    /// The class this manifest belongs to.
    #[must_use]
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// Inserts a declaration. Redeclaring a name replaces the earlier
    /// entry in place (override, not error), keeping its position.
    pub(crate) fn insert(&mut self, declaration: Declaration) {
        match self
            .declarations
            .iter_mut()
            .find(|d| d.name() == declaration.name())
        {
            Some(existing) => *existing = declaration,
            None => self.declarations.push(declaration),
        }
    }

    /// Records an implicit declaration, unless the name is already known.
    pub(crate) fn record_implicit(&mut self, name: &EcoString) {
        if !self.is_declared(name) {
            self.declarations.push(Declaration::Implicit { name: name.clone() });
        }
    }

    /// Looks up the declaration for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name() == name)
    }

    /// Returns true if the name has any declaration here.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// This manifest's own declarations, in declaration order.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }
}

/// Folds ancestor manifests (least- to most-derived) into one declaration
/// per distinct name, the most-derived version winning.
///
/// An overriding declaration replaces the payload but keeps the position
/// the name first appeared at, so ancestor-declared names stay ahead of
/// descendant-declared ones in peel-off order.
pub(crate) fn merge_declarations<'a>(
    chain_oldest_first: impl IntoIterator<Item = &'a Manifest>,
) -> Vec<Declaration> {
    let mut merged: Vec<Declaration> = Vec::new();
    for manifest in chain_oldest_first {
        for declaration in manifest.declarations() {
            match merged.iter_mut().find(|d| d.name() == declaration.name()) {
                Some(existing) => *existing = declaration.clone(),
                None => merged.push(declaration.clone()),
            }
        }
    }
    merged
}

/// Applies the pre-construction protocol to a fresh instance.
///
/// In merged declaration order: positional declarations shift one value
/// off the front of the arguments while any remain (exhaustion falls
/// through to defaults, never assigns nil); keyword declarations consume
/// the matching sigil-stripped key; every declaration left unassigned gets
/// its default function's result, then its scalar default on top. The
/// arguments are left holding only the remainder for the user constructor.
pub(crate) fn apply_pre_init(
    merged: &[Declaration],
    instance: &mut Instance,
    args: &mut CtorArgs,
) {
    let mut assigned: Vec<&EcoString> = Vec::new();

    for declaration in merged {
        let Declaration::Explicit { name, init, .. } = declaration else {
            continue;
        };
        match init {
            InitSource::Positional => {
                if let Some(value) = args.shift() {
                    instance.set(name.clone(), value);
                    assigned.push(name);
                }
            }
            InitSource::Keyword => {
                if let Some(value) = args.take_keyword(strip_sigil(name)) {
                    instance.set(name.clone(), value);
                    assigned.push(name);
                }
            }
            InitSource::None => {}
        }
    }

    for declaration in merged {
        let Declaration::Explicit {
            name,
            default,
            default_fn,
            ..
        } = declaration
        else {
            continue;
        };
        if assigned.contains(&name) {
            continue;
        }
        if let Some(f) = default_fn {
            instance.set(name.clone(), f(name.as_str()));
        }
        if let Some(value) = default {
            // Scalar default overwrites the function's result when both
            // are supplied.
            instance.set(name.clone(), value.clone());
        }
    }
}
