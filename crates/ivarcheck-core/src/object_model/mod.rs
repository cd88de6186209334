// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The modeled object system: values, instances, classes, and the
//! registry that hosts them.
//!
//! The modeled language stores per-instance state in named slots that
//! need no prior declaration; this module renders that model explicitly
//! (registered classes, slot maps on instances) so the checker can reason
//! about it without reflection.

mod class;
mod instance;
mod registry;
mod value;

pub use class::{
    ClassBuilder, ClassId, CtorFn, MethodBody, MethodContext, MethodDef, NativeFn,
    SourceLocation,
};
pub use instance::{ConstructionState, CtorArgs, Instance};
pub use registry::Registry;
pub use value::Value;
