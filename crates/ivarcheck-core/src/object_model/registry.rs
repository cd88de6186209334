// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The class registry: explicit host for the modeled object system.
//!
//! The registry owns every shared structure the checker needs: the class
//! table, per-class declaration manifests, the method stash (original
//! source locations captured before wrapping), the per-class analysis
//! cache, the once-per-class reported ledger, and the process-wide default
//! policy with its diagnostic sink and suggestion collaborators.
//!
//! Each structure sits behind its own mutex and no lock is held while user
//! code (constructors, native methods, default functions) runs. Under
//! concurrent construction the worst case is duplicate analysis work,
//! never a torn cache entry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ecow::EcoString;

use crate::analysis::{analyze_class, ClassAnalysis};
use crate::checked;
use crate::declaration::{strip_sigil, validate_name, IvarOptions};
use crate::error::ObjectError;
use crate::manifest::{merge_declarations, Manifest};
use crate::policy::{CheckPolicy, DiagnosticSink, StderrSink};
use crate::suggest::{EditDistanceSuggester, SuggestionProvider};

use super::class::{
    ClassBuilder, ClassConfig, ClassDef, ClassId, MethodBody, MethodContext, MethodDef,
    NativeFn, SourceLocation,
};
use super::instance::{CtorArgs, Instance};
use super::value::Value;

type StashKey = (ClassId, EcoString, MethodContext);

/// Acquires a mutex, recovering the data from a poisoned lock. All guarded
/// state is kept consistent per operation, so a panic mid-update cannot
/// leave a torn entry behind.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The registry hosting classes, manifests, and checker state.
pub struct Registry {
    classes: Mutex<Vec<ClassDef>>,
    manifests: Mutex<HashMap<ClassId, Manifest>>,
    method_stash: Mutex<HashMap<StashKey, SourceLocation>>,
    analysis_cache: Mutex<HashMap<ClassId, Arc<ClassAnalysis>>>,
    reported: Mutex<HashSet<ClassId>>,
    default_policy: Mutex<CheckPolicy>,
    sink: Mutex<Arc<dyn DiagnosticSink>>,
    suggester: Mutex<Arc<dyn SuggestionProvider>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &lock(&self.classes).len())
            .field("manifests", &lock(&self.manifests).len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// A fresh registry: stderr diagnostics, edit-distance suggestions,
    /// warn-once default policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: Mutex::new(Vec::new()),
            manifests: Mutex::new(HashMap::new()),
            method_stash: Mutex::new(HashMap::new()),
            analysis_cache: Mutex::new(HashMap::new()),
            reported: Mutex::new(HashSet::new()),
            default_policy: Mutex::new(CheckPolicy::WarnOnce),
            sink: Mutex::new(Arc::new(StderrSink)),
            suggester: Mutex::new(Arc::new(EditDistanceSuggester)),
        }
    }

    // ── Class definition ─────────────────────────────────────────────────

    /// Registers a class and returns its handle.
    ///
    /// The class-level policy is snapshotted here: a class without its own
    /// policy copies the superclass's, so changing the parent's policy
    /// later never retroactively affects this class. Participation in
    /// checking is inherited the same way.
    pub fn define(&self, builder: ClassBuilder) -> ClassId {
        let mut classes = lock(&self.classes);
        let id = ClassId::new(classes.len());

        let parent_config = builder
            .superclass
            .map(|sup| classes[sup.index()].config.clone());
        let config = ClassConfig {
            policy: builder.policy.or_else(|| {
                parent_config.as_ref().and_then(|c| c.policy.clone())
            }),
            checks_enabled: parent_config.is_some_and(|c| c.checks_enabled),
        };

        let methods = builder
            .methods
            .into_iter()
            .map(|spec| MethodDef {
                name: spec.name,
                context: spec.context,
                location: match (&builder.source_file, spec.line) {
                    (Some(path), Some(line)) => Some(SourceLocation::new(path.clone(), line)),
                    _ => None,
                },
                body: spec.body,
            })
            .collect();

        tracing::debug!(class = %builder.name, id = ?id, "defining class");
        classes.push(ClassDef {
            name: builder.name,
            superclass: builder.superclass,
            methods,
            config,
        });
        id
    }

    /// The name of a class.
    #[must_use]
    pub fn class_name(&self, class: ClassId) -> EcoString {
        lock(&self.classes)[class.index()].name.clone()
    }

    /// The direct superclass, if any.
    #[must_use]
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        lock(&self.classes)[class.index()].superclass
    }

    /// The ancestor chain, most-derived first (starting with `class`).
    #[must_use]
    pub fn ancestry(&self, class: ClassId) -> Vec<ClassId> {
        let classes = lock(&self.classes);
        let mut chain = vec![class];
        let mut current = class;
        while let Some(superclass) = classes[current.index()].superclass {
            chain.push(superclass);
            current = superclass;
        }
        chain
    }

    pub(crate) fn class_policy(&self, class: ClassId) -> Option<CheckPolicy> {
        lock(&self.classes)[class.index()].config.policy.clone()
    }

    /// Whether construction runs the reference check for this class.
    #[must_use]
    pub fn checks_enabled(&self, class: ClassId) -> bool {
        lock(&self.classes)[class.index()].config.checks_enabled
    }

    /// Opts a class into checked construction. Idempotent; this is the
    /// attach interface the auto-sweep consumes.
    pub fn enable_checks(&self, class: ClassId) {
        lock(&self.classes)[class.index()].config.checks_enabled = true;
    }

    // ── Declarations ─────────────────────────────────────────────────────

    /// Declares one or more instance variables with shared options.
    ///
    /// Every name is validated before any side effect. Declaring opts the
    /// class into checked construction and, when the options ask for
    /// accessors, defines them on the class immediately.
    pub fn declare(
        &self,
        class: ClassId,
        names: &[&str],
        options: &IvarOptions,
    ) -> Result<(), ObjectError> {
        for name in names {
            validate_name(name)?;
        }
        for name in names {
            self.insert_declaration(class, name, options);
        }
        self.enable_checks(class);
        Ok(())
    }

    /// Declares several names with individually differing defaults in one
    /// call; the remaining options are shared.
    pub fn declare_each(
        &self,
        class: ClassId,
        pairs: &[(&str, Value)],
        options: &IvarOptions,
    ) -> Result<(), ObjectError> {
        for (name, _) in pairs {
            validate_name(name)?;
        }
        for (name, value) in pairs {
            let with_default = options.clone().value(value.clone());
            self.insert_declaration(class, name, &with_default);
        }
        self.enable_checks(class);
        Ok(())
    }

    fn insert_declaration(&self, class: ClassId, name: &str, options: &IvarOptions) {
        tracing::debug!(class = %self.class_name(class), name, "declaring ivar");
        lock(&self.manifests)
            .entry(class)
            .or_insert_with(|| Manifest::new(class))
            .insert(options.to_declaration(name));

        // Accessors become available immediately, not at instantiation.
        let stripped = EcoString::from(strip_sigil(name));
        if options.reader {
            let slot = EcoString::from(name);
            self.define_native(class, stripped.clone(), move |_, instance, _| {
                Ok(instance.get(&slot))
            });
        }
        if options.writer {
            let slot = EcoString::from(name);
            let writer_name = EcoString::from(format!("{stripped}="));
            self.define_native(class, writer_name, move |_, instance, args| {
                instance.set(slot.clone(), args.first().cloned().unwrap_or_default());
                Ok(Value::Nil)
            });
        }
    }

    fn define_native<F>(&self, class: ClassId, name: EcoString, body: F)
    where
        F: Fn(&Registry, &mut Instance, &[Value]) -> Result<Value, ObjectError>
            + Send
            + Sync
            + 'static,
    {
        let entry = MethodDef {
            name,
            context: MethodContext::Instance,
            location: None,
            body: MethodBody::Native(Arc::new(body)),
        };
        let mut classes = lock(&self.classes);
        let methods = &mut classes[class.index()].methods;
        match methods
            .iter_mut()
            .find(|m| m.name == entry.name && m.context == entry.context)
        {
            Some(existing) => *existing = entry,
            None => methods.push(entry),
        }
    }

    /// Returns true when the name has a declaration anywhere on the
    /// ancestor chain.
    #[must_use]
    pub fn is_declared(&self, class: ClassId, name: &str) -> bool {
        self.merged_declarations(class)
            .iter()
            .any(|d| d.name() == name)
    }

    /// The effective declaration set for a class: ancestor manifests
    /// merged least- to most-derived.
    pub(crate) fn merged_declarations(
        &self,
        class: ClassId,
    ) -> Vec<crate::declaration::Declaration> {
        let mut chain = self.ancestry(class);
        chain.reverse();
        let manifests = lock(&self.manifests);
        merge_declarations(chain.iter().filter_map(|id| manifests.get(id)))
    }

    pub(crate) fn record_implicit(&self, class: ClassId, name: &EcoString) {
        lock(&self.manifests)
            .entry(class)
            .or_insert_with(|| Manifest::new(class))
            .record_implicit(name);
    }

    /// Runs `f` with the manifest for `class`, if one has materialized.
    pub fn with_manifest<R>(&self, class: ClassId, f: impl FnOnce(&Manifest) -> R) -> Option<R> {
        lock(&self.manifests).get(&class).map(f)
    }

    // ── Method dispatch and wrapping ─────────────────────────────────────

    /// Invokes an instance method, resolving through the ancestor chain.
    pub fn call_method(
        &self,
        instance: &mut Instance,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ObjectError> {
        let resolved = self.resolve_method(instance.class(), name, MethodContext::Instance);
        let class = self.class_name(instance.class());
        match resolved {
            Some(MethodDef {
                body: MethodBody::Native(f),
                ..
            }) => f(self, instance, args),
            Some(_) => Err(ObjectError::NotCallable {
                class,
                method: EcoString::from(name),
            }),
            None => Err(ObjectError::UnknownMethod {
                class,
                method: EcoString::from(name),
            }),
        }
    }

    fn resolve_method(
        &self,
        class: ClassId,
        name: &str,
        context: MethodContext,
    ) -> Option<MethodDef> {
        let chain = self.ancestry(class);
        let classes = lock(&self.classes);
        for id in chain {
            if let Some(method) = classes[id.index()]
                .methods
                .iter()
                .find(|m| m.name == name && m.context == context)
            {
                return Some(method.clone());
            }
        }
        None
    }

    /// Replaces a method with a wrapper body, stashing the original source
    /// location first so analysis keeps resolving the true definition.
    /// Only the first wrap stashes; re-wrapping keeps the original entry.
    pub fn wrap_method(
        &self,
        class: ClassId,
        name: &str,
        context: MethodContext,
        body: NativeFn,
    ) -> Result<(), ObjectError> {
        let mut classes = lock(&self.classes);
        let def = &mut classes[class.index()];
        let Some(method) = def
            .methods
            .iter_mut()
            .find(|m| m.name == name && m.context == context)
        else {
            return Err(ObjectError::UnknownMethod {
                class: def.name.clone(),
                method: EcoString::from(name),
            });
        };

        if let Some(original) = method.location.take() {
            lock(&self.method_stash)
                .entry((class, method.name.clone(), context))
                .or_insert(original);
        }
        method.body = MethodBody::Native(body);
        Ok(())
    }

    pub(crate) fn stashed_location(
        &self,
        class: ClassId,
        name: &EcoString,
        context: MethodContext,
    ) -> Option<SourceLocation> {
        lock(&self.method_stash)
            .get(&(class, name.clone(), context))
            .cloned()
    }

    /// The directly-defined methods of a class: name, context, and own
    /// source location (before stash fallback).
    pub(crate) fn method_surface(
        &self,
        class: ClassId,
    ) -> Vec<(EcoString, MethodContext, Option<SourceLocation>)> {
        lock(&self.classes)[class.index()]
            .methods
            .iter()
            .map(|m| (m.name.clone(), m.context, m.location.clone()))
            .collect()
    }

    pub(crate) fn resolve_constructor(
        &self,
        class: ClassId,
    ) -> Option<(ClassId, super::class::CtorFn)> {
        let chain = self.ancestry(class);
        let classes = lock(&self.classes);
        for id in chain {
            for method in &classes[id.index()].methods {
                if method.name == "initialize" && method.context == MethodContext::Instance {
                    if let MethodBody::Constructor(f) = &method.body {
                        return Some((id, f.clone()));
                    }
                }
            }
        }
        None
    }

    // ── Construction and checking ────────────────────────────────────────

    /// Constructs an instance: pre-init (declared defaults and argument
    /// peel-off), the user constructor, then the reference check when the
    /// class is opted in.
    pub fn new_instance(&self, class: ClassId, args: CtorArgs) -> Result<Instance, ObjectError> {
        checked::construct(self, class, args)
    }

    /// Runs the next ancestor constructor above `below`, if one exists.
    ///
    /// `below` must be the class the *calling* constructor is defined on
    /// (handed to it as its second argument), not the instance's concrete
    /// class; otherwise a super-call from an inherited constructor would
    /// resolve itself again. The pre-init step is not re-entered; it ran
    /// once at the outermost construction.
    pub fn run_super_initialize(
        &self,
        instance: &mut Instance,
        below: ClassId,
        args: &CtorArgs,
    ) -> Result<(), ObjectError> {
        let Some(superclass) = self.superclass(below) else {
            return Ok(());
        };
        if let Some((defining, ctor)) = self.resolve_constructor(superclass) {
            ctor(self, defining, instance, args)?;
        }
        Ok(())
    }

    /// Re-runs the reference check against the instance's current slots.
    pub fn check_ivars(&self, instance: &mut Instance) -> Result<(), ObjectError> {
        checked::run_check(self, instance, None, &[])
    }

    /// Like [`Registry::check_ivars`], with an explicit policy and ad-hoc
    /// extra allowed names.
    pub fn check_ivars_with(
        &self,
        instance: &mut Instance,
        policy: Option<&CheckPolicy>,
        extra_allowed: &[&str],
    ) -> Result<(), ObjectError> {
        let extra: Vec<EcoString> = extra_allowed.iter().map(|n| EcoString::from(*n)).collect();
        checked::run_check(self, instance, policy, &extra)
    }

    // ── Analysis cache ───────────────────────────────────────────────────

    /// The memoized reference analysis for a class.
    pub fn analysis(&self, class: ClassId) -> Result<Arc<ClassAnalysis>, ObjectError> {
        if let Some(hit) = lock(&self.analysis_cache).get(&class) {
            return Ok(Arc::clone(hit));
        }
        tracing::debug!(class = %self.class_name(class), "analysis cache miss");
        let computed = Arc::new(analyze_class(self, class)?);
        let mut cache = lock(&self.analysis_cache);
        Ok(Arc::clone(cache.entry(class).or_insert(computed)))
    }

    /// Drops every cached analysis. Manifests persist; declarations are
    /// class-body-time facts, not per-run state.
    pub fn clear_analysis_cache(&self) {
        lock(&self.analysis_cache).clear();
    }

    // ── Policy configuration and collaborators ───────────────────────────

    /// The process-wide default policy.
    #[must_use]
    pub fn default_policy(&self) -> CheckPolicy {
        lock(&self.default_policy).clone()
    }

    /// Replaces the process-wide default policy.
    pub fn set_default_policy(&self, policy: CheckPolicy) {
        *lock(&self.default_policy) = policy;
    }

    /// Replaces the diagnostic sink (stderr by default).
    pub fn set_diagnostic_sink(&self, sink: Arc<dyn DiagnosticSink>) {
        *lock(&self.sink) = sink;
    }

    pub(crate) fn diagnostic_sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&lock(&self.sink))
    }

    /// Replaces the spelling-suggestion collaborator.
    pub fn set_suggester(&self, suggester: Arc<dyn SuggestionProvider>) {
        *lock(&self.suggester) = suggester;
    }

    pub(crate) fn suggester(&self) -> Arc<dyn SuggestionProvider> {
        Arc::clone(&lock(&self.suggester))
    }

    pub(crate) fn already_reported(&self, class: ClassId) -> bool {
        lock(&self.reported).contains(&class)
    }

    pub(crate) fn mark_reported(&self, class: ClassId) {
        lock(&self.reported).insert(class);
    }
}
