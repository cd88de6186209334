// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Class definitions and the builder used to register them.
//!
//! Classes are registered explicitly with the [`Registry`]; there is no
//! reflective discovery of definitions. A class carries its method table
//! (each method with an optional source location for analysis and an
//! optional native body for dispatch) and a config snapshot taken at
//! definition time.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ecow::EcoString;

use crate::error::ObjectError;
use crate::policy::CheckPolicy;

use super::instance::{CtorArgs, Instance};
use super::registry::Registry;
use super::value::Value;

/// An opaque handle to a registered class.
///
/// Ids are only produced by [`Registry::define`] and are valid for the
/// registry that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn new(index: usize) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "more than 4 billion classes are not supported"
        )]
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn for_tests(index: u32) -> Self {
        Self(index)
    }
}

/// Whether a method lives on instances or on the type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodContext {
    /// An ordinary instance method.
    Instance,
    /// A type-level (`def self.name`) method.
    Type,
}

/// Where a method's body starts in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The defining file.
    pub path: Utf8PathBuf,
    /// The 1-based line of the `def`.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a new source location.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// A native method body.
pub type NativeFn =
    Arc<dyn Fn(&Registry, &mut Instance, &[Value]) -> Result<Value, ObjectError> + Send + Sync>;

/// A native constructor body. Receives the class the constructor is
/// defined on (which a super-call passes back to
/// [`Registry::run_super_initialize`]) and the arguments left over after
/// declared-slot peel-off.
pub type CtorFn = Arc<
    dyn Fn(&Registry, ClassId, &mut Instance, &CtorArgs) -> Result<(), ObjectError> + Send + Sync,
>;

/// What happens when a method is invoked.
#[derive(Clone)]
pub enum MethodBody {
    /// No callable body; the method exists only as a source location for
    /// reference analysis.
    SourceOnly,
    /// A callable native body.
    Native(NativeFn),
    /// A constructor body, invoked through the construction pipeline.
    Constructor(CtorFn),
}

impl std::fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceOnly => f.write_str("SourceOnly"),
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Constructor(_) => f.write_str("Constructor(..)"),
        }
    }
}

/// One entry in a class's method table.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// The method name (writers keep their trailing `=`).
    pub name: EcoString,
    /// Instance-level or type-level.
    pub context: MethodContext,
    /// The defining location, when resolvable.
    pub location: Option<SourceLocation>,
    /// The body, if callable.
    pub body: MethodBody,
}

/// Per-class configuration, snapshotted at definition time.
///
/// The policy is copied from the superclass when the class itself does not
/// set one, so later changes to the parent's policy do not retroactively
/// affect already-defined subclasses.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClassConfig {
    /// The class-level check policy, if one was configured.
    pub policy: Option<CheckPolicy>,
    /// Whether construction runs the reference check for this class.
    pub checks_enabled: bool,
}

/// A registered class. Method locations were resolved against the
/// builder's source file at definition time, so the path itself is not
/// retained.
#[derive(Debug, Clone)]
pub(crate) struct ClassDef {
    pub name: EcoString,
    pub superclass: Option<ClassId>,
    pub methods: Vec<MethodDef>,
    pub config: ClassConfig,
}

/// Builder for registering a class with [`Registry::define`].
#[derive(Debug, Default)]
pub struct ClassBuilder {
    pub(crate) name: EcoString,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) source_file: Option<Utf8PathBuf>,
    pub(crate) methods: Vec<MethodSpec>,
    pub(crate) policy: Option<CheckPolicy>,
}

/// A method as described to the builder; the line is resolved against the
/// builder's source file when the class is defined.
#[derive(Debug, Clone)]
pub(crate) struct MethodSpec {
    pub name: EcoString,
    pub context: MethodContext,
    pub line: Option<u32>,
    pub body: MethodBody,
}

impl ClassBuilder {
    /// Starts a builder for a class with the given name.
    #[must_use]
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn superclass(mut self, superclass: ClassId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Sets the source file backing this class's method bodies.
    #[must_use]
    pub fn source_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Registers an instance method defined at `line` of the source file.
    #[must_use]
    pub fn instance_method(mut self, name: impl Into<EcoString>, line: u32) -> Self {
        self.methods.push(MethodSpec {
            name: name.into(),
            context: MethodContext::Instance,
            line: Some(line),
            body: MethodBody::SourceOnly,
        });
        self
    }

    /// Registers a type-level method defined at `line` of the source file.
    #[must_use]
    pub fn type_method(mut self, name: impl Into<EcoString>, line: u32) -> Self {
        self.methods.push(MethodSpec {
            name: name.into(),
            context: MethodContext::Type,
            line: Some(line),
            body: MethodBody::SourceOnly,
        });
        self
    }

    /// Registers the constructor, defined at `line` of the source file,
    /// with a native body that mirrors the source.
    #[must_use]
    pub fn constructor<F>(mut self, line: u32, body: F) -> Self
    where
        F: Fn(&Registry, ClassId, &mut Instance, &CtorArgs) -> Result<(), ObjectError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(MethodSpec {
            name: EcoString::from("initialize"),
            context: MethodContext::Instance,
            line: Some(line),
            body: MethodBody::Constructor(Arc::new(body)),
        });
        self
    }

    /// Registers a constructor with no source location (analysis skips it).
    #[must_use]
    pub fn native_constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&Registry, ClassId, &mut Instance, &CtorArgs) -> Result<(), ObjectError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(MethodSpec {
            name: EcoString::from("initialize"),
            context: MethodContext::Instance,
            line: None,
            body: MethodBody::Constructor(Arc::new(body)),
        });
        self
    }

    /// Registers a callable native instance method with no source location.
    #[must_use]
    pub fn native_method<F>(mut self, name: impl Into<EcoString>, body: F) -> Self
    where
        F: Fn(&Registry, &mut Instance, &[Value]) -> Result<Value, ObjectError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(MethodSpec {
            name: name.into(),
            context: MethodContext::Instance,
            line: None,
            body: MethodBody::Native(Arc::new(body)),
        });
        self
    }

    /// Sets the class-level check policy.
    #[must_use]
    pub fn policy(mut self, policy: CheckPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}
