// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Checked construction: the orchestration around `new`.
//!
//! Construction drives each instance through a small state machine:
//! uninitialized, pre-init applied (declared defaults and argument
//! peel-off), user constructor ran, checked. The check computes the
//! allowed set (reserved names, currently-set slots, every declared name,
//! plus ad-hoc extras), diffs it against the cached reference analysis for
//! the instance's concrete class, and hands the unmatched references to
//! the resolved policy.
//!
//! The automatic check runs exactly once per instance, at the outermost
//! construction; superclass constructors reached through the super-call
//! helper never re-enter pre-init. Re-running the check manually is legal
//! and simply re-evaluates against the current slot set.

use ecow::EcoString;

use crate::analysis::Reference;
use crate::error::ObjectError;
use crate::manifest::apply_pre_init;
use crate::object_model::{
    ClassId, ConstructionState, CtorArgs, Instance, MethodContext, Registry,
};
use crate::policy::{dispatch, CheckPolicy};

/// Internal names that are always allowed and never offered as
/// suggestions.
pub(crate) const RESERVED_NAMES: &[&str] = &["@__ivar_checked"];

/// Constructs an instance of `class`.
pub(crate) fn construct(
    registry: &Registry,
    class: ClassId,
    mut args: CtorArgs,
) -> Result<Instance, ObjectError> {
    let mut instance = Instance::new(class);

    let merged = registry.merged_declarations(class);
    apply_pre_init(&merged, &mut instance, &mut args);
    instance.set_state(ConstructionState::PreInitApplied);

    if let Some((defining, ctor)) = registry.resolve_constructor(class) {
        ctor(registry, defining, &mut instance, &args)?;
    }
    instance.set_state(ConstructionState::UserInitRan);

    if registry.checks_enabled(class) {
        run_check(registry, &mut instance, None, &[])?;
    }
    Ok(instance)
}

/// Runs the post-construction reference check on an instance.
pub(crate) fn run_check(
    registry: &Registry,
    instance: &mut Instance,
    policy_override: Option<&CheckPolicy>,
    extra_allowed: &[EcoString],
) -> Result<(), ObjectError> {
    let class = instance.class();
    let class_name = registry.class_name(class);

    let declared: Vec<EcoString> = registry
        .merged_declarations(class)
        .iter()
        .map(|d| d.name().clone())
        .collect();
    let set_names = instance.set_names();

    let mut allowed: Vec<EcoString> = RESERVED_NAMES.iter().map(|n| EcoString::from(*n)).collect();
    allowed.extend(set_names.iter().cloned());
    allowed.extend(declared.iter().cloned());
    allowed.extend(extra_allowed.iter().cloned());
    allowed.sort_unstable();
    allowed.dedup();

    // Names observed set but never declared become implicit declarations.
    for name in &set_names {
        if !declared.contains(name) && !RESERVED_NAMES.contains(&name.as_str()) {
            registry.record_implicit(class, name);
        }
    }

    let analysis = registry.analysis(class)?;
    let unmatched: Vec<Reference> = analysis
        .references
        .iter()
        .filter(|r| r.context == MethodContext::Instance && !allowed.contains(&r.name))
        .cloned()
        .collect();

    // Reserved names are not useful "did you mean" targets.
    let dictionary: Vec<EcoString> = allowed
        .iter()
        .filter(|n| !RESERVED_NAMES.contains(&n.as_str()))
        .cloned()
        .collect();

    let policy = match policy_override {
        Some(policy) => policy.clone(),
        None => registry
            .class_policy(class)
            .unwrap_or_else(|| registry.default_policy()),
    };

    let sink = registry.diagnostic_sink();
    let suggester = registry.suggester();
    let outcome = dispatch(
        &policy,
        &class_name,
        &unmatched,
        &dictionary,
        suggester.as_ref(),
        sink.as_ref(),
        registry.already_reported(class),
    )?;
    if outcome.mark_reported {
        registry.mark_reported(class);
    }

    instance.set_state(ConstructionState::Checked);
    Ok(())
}
