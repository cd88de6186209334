// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Typo detection for dynamically-named instance variables.
//!
//! In the modeled object system, reading an instance variable that was
//! never written silently yields nil, so a misspelled name fails without
//! a trace. This crate adds opt-in detection:
//! - Declarations: per-class manifests of known names, with defaults,
//!   constructor argument peel-off, and generated accessors
//! - Static analysis: every ivar reference in a class's own method
//!   bodies, extracted from parsed source
//! - Checked construction: reconciling the two when an instance is built,
//!   reporting unmatched references through a configurable policy with
//!   spelling suggestions
//!
//! The [`object_model::Registry`] hosts everything: class definitions,
//! manifests, the analysis cache, and policy configuration.

pub mod analysis;
pub mod ast;
mod ast_walker;
mod checked;
pub mod declaration;
pub mod error;
pub mod manifest;
pub mod object_model;
pub mod policy;
pub mod project;
pub mod source_analysis;
pub mod suggest;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::analysis::{ClassAnalysis, Reference};
    pub use crate::declaration::{Declaration, InitSource, IvarOptions};
    pub use crate::error::ObjectError;
    pub use crate::object_model::{
        ClassBuilder, ClassId, CtorArgs, Instance, MethodContext, Registry, Value,
    };
    pub use crate::policy::CheckPolicy;
}
