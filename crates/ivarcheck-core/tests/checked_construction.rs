// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios for checked construction: declarations, argument
//! peel-off, static reference analysis, and policy dispatch working
//! together against real fixture source files.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::Utf8PathBuf;
use ecow::EcoString;
use ivarcheck_core::error::ObjectError;
use ivarcheck_core::policy::DiagnosticSink;
use ivarcheck_core::prelude::*;

// ============================================================================
// Fixtures and helpers
// ============================================================================

#[derive(Default)]
struct CapturedSink(Mutex<Vec<String>>);

impl CapturedSink {
    fn lines(&self) -> Vec<String> {
        self.0.lock().expect("sink lock").clone()
    }
}

impl DiagnosticSink for CapturedSink {
    fn write_line(&self, line: &str) {
        self.0.lock().expect("sink lock").push(line.to_owned());
    }
}

fn unique_temp_dir(prefix: &str) -> Utf8PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), nanos));
    fs::create_dir_all(&dir).expect("create temp dir");
    Utf8PathBuf::from_path_buf(dir).expect("utf8 temp dir")
}

fn write_fixture(dir: &Utf8PathBuf, name: &str, contents: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(path.as_std_path(), contents).expect("write fixture");
    path
}

fn registry_with_sink() -> (Registry, Arc<CapturedSink>) {
    let registry = Registry::new();
    let sink = Arc::new(CapturedSink::default());
    registry.set_diagnostic_sink(sink.clone());
    (registry, sink)
}

/// The misspelled-sandwich fixture: `initialize` sets `@bread` and
/// `@cheese`; `to_s` references `@chese` (typo) and `@side` (never set).
const SANDWICH_SOURCE: &str = "\
class Sandwich
  def initialize
    @bread = 'wheat'
    @cheese = 'muenster'
  end

  def to_s
    \"a #{@chese} sandwich with a side of #{@side}\"
  end
end
";

fn define_sandwich(registry: &Registry, path: &Utf8PathBuf) -> ClassId {
    let class = registry.define(
        ClassBuilder::new("Sandwich")
            .source_file(path.clone())
            .constructor(2, |_, _, instance, _| {
                instance.set("@bread", "wheat");
                instance.set("@cheese", "muenster");
                Ok(())
            })
            .instance_method("to_s", 7),
    );
    registry.enable_checks(class);
    class
}

// ============================================================================
// Warn policies
// ============================================================================

#[test]
fn typo_warns_once_with_suggestion() {
    let dir = unique_temp_dir("ivarcheck_sandwich");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    let class = define_sandwich(&registry, &path);

    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!("{path}:8: warning: unknown instance variable @chese. Did you mean: @cheese?")
    );
    assert_eq!(
        lines[1],
        format!("{path}:8: warning: unknown instance variable @side. ")
    );

    // Second construction of the same class: no further output.
    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct again");
    assert_eq!(sink.lines().len(), 2);

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn warn_always_repeats_per_construction() {
    let dir = unique_temp_dir("ivarcheck_warn_always");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    registry.set_default_policy(CheckPolicy::WarnAlways);
    let class = define_sandwich(&registry, &path);

    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct again");
    assert_eq!(sink.lines().len(), 4);

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn none_policy_is_silent_and_recheck_can_warn() {
    let dir = unique_temp_dir("ivarcheck_none_policy");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    registry.set_default_policy(CheckPolicy::None);
    let class = define_sandwich(&registry, &path);

    let mut instance = registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    assert!(sink.lines().is_empty());

    // Manual re-check with an explicit policy re-evaluates the instance.
    registry
        .check_ivars_with(&mut instance, Some(&CheckPolicy::WarnAlways), &[])
        .expect("recheck");
    assert_eq!(sink.lines().len(), 2);

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn extra_allowed_names_suppress_findings() {
    let dir = unique_temp_dir("ivarcheck_extra_allowed");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    registry.set_default_policy(CheckPolicy::None);
    let class = define_sandwich(&registry, &path);

    let mut instance = registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    registry
        .check_ivars_with(
            &mut instance,
            Some(&CheckPolicy::WarnAlways),
            &["@chese", "@side"],
        )
        .expect("recheck");
    assert!(sink.lines().is_empty());

    let _ = fs::remove_dir_all(dir.as_std_path());
}

// ============================================================================
// Raise policy
// ============================================================================

#[test]
fn raise_policy_fails_construction_on_first_finding() {
    let dir = unique_temp_dir("ivarcheck_raise");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    let class = registry.define(
        ClassBuilder::new("Sandwich")
            .source_file(path.clone())
            .policy(CheckPolicy::Raise)
            .constructor(2, |_, _, instance, _| {
                instance.set("@bread", "wheat");
                instance.set("@cheese", "muenster");
                Ok(())
            })
            .instance_method("to_s", 7),
    );
    registry.enable_checks(class);

    let err = registry
        .new_instance(class, CtorArgs::new())
        .expect_err("should raise");
    let ObjectError::UnknownIvar(err) = err else {
        panic!("expected UnknownIvar, got {err:?}");
    };
    assert_eq!(err.name, "@chese");
    assert_eq!(err.line, 8);
    assert_eq!(err.suggestion, Some(EcoString::from("@cheese")));
    assert!(sink.lines().is_empty());

    let _ = fs::remove_dir_all(dir.as_std_path());
}

// ============================================================================
// Declarations and the pre-construction protocol
// ============================================================================

#[test]
fn subclass_default_overrides_ancestor() {
    let registry = Registry::new();
    let parent = registry.define(ClassBuilder::new("A"));
    registry
        .declare(parent, &["@name"], &IvarOptions::new().value(1_i64))
        .expect("declare parent");
    let child = registry.define(ClassBuilder::new("B").superclass(parent));
    registry
        .declare(child, &["@name"], &IvarOptions::new().value(2_i64))
        .expect("declare child");

    let b = registry
        .new_instance(child, CtorArgs::new())
        .expect("construct B");
    assert_eq!(b.get("@name"), Value::Integer(2));

    let a = registry
        .new_instance(parent, CtorArgs::new())
        .expect("construct A");
    assert_eq!(a.get("@name"), Value::Integer(1));
}

#[test]
fn positional_peel_off_spans_the_hierarchy() {
    let registry = Registry::new();
    let positional = IvarOptions::new().init(InitSource::Positional);
    let parent = registry.define(ClassBuilder::new("A"));
    registry
        .declare(parent, &["@x", "@y"], &positional)
        .expect("declare parent");
    let child = registry.define(ClassBuilder::new("B").superclass(parent));
    registry
        .declare(child, &["@z"], &positional)
        .expect("declare child");

    let instance = registry
        .new_instance(
            child,
            CtorArgs::positional([Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
        )
        .expect("construct");
    assert_eq!(instance.get("@x"), Value::Integer(1));
    assert_eq!(instance.get("@y"), Value::Integer(2));
    assert_eq!(instance.get("@z"), Value::Integer(3));
}

#[test]
fn keyword_peel_off_leaves_remainder_for_constructor() {
    let registry = Registry::new();
    let observed: Arc<Mutex<Vec<(EcoString, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let observed_in_ctor = Arc::clone(&observed);

    let class = registry.define(ClassBuilder::new("Order").native_constructor(
        move |_, _, _, args| {
            observed_in_ctor
                .lock()
                .expect("ctor lock")
                .extend(args.keyword_args().iter().cloned());
            Ok(())
        },
    ));
    registry
        .declare(
            class,
            &["@foo"],
            &IvarOptions::new().init("kwarg".parse().expect("legacy alias")),
        )
        .expect("declare");

    let instance = registry
        .new_instance(
            class,
            CtorArgs::new()
                .with_keyword("foo", 1_i64)
                .with_keyword("bar", 2_i64),
        )
        .expect("construct");

    assert_eq!(instance.get("@foo"), Value::Integer(1));
    assert_eq!(
        observed.lock().expect("lock").clone(),
        vec![(EcoString::from("bar"), Value::Integer(2))]
    );
}

#[test]
fn kwargs_only_class_needs_no_constructor_body() {
    let registry = Registry::new();
    let class = registry.define(ClassBuilder::new("Sandwich"));
    registry
        .declare(
            class,
            &["@bread", "@cheese", "@condiments"],
            &IvarOptions::new().init(InitSource::Keyword),
        )
        .expect("declare");

    let instance = registry
        .new_instance(
            class,
            CtorArgs::new()
                .with_keyword("bread", "rye")
                .with_keyword("cheese", "brie")
                .with_keyword("condiments", vec![Value::from("mustard")]),
        )
        .expect("construct");

    assert_eq!(instance.get("@bread"), Value::from("rye"));
    assert_eq!(instance.get("@cheese"), Value::from("brie"));
    assert_eq!(
        instance.get("@condiments"),
        Value::List(vec![Value::from("mustard")])
    );
}

#[test]
fn declared_counter_increments_without_warnings() {
    let dir = unique_temp_dir("ivarcheck_counter");
    let source = "\
class Queue
  def bump
    @minutes_waiting += 1
  end
end
";
    let path = write_fixture(&dir, "queue.rb", source);
    let (registry, sink) = registry_with_sink();
    let class = registry.define(
        ClassBuilder::new("Queue")
            .source_file(path)
            .instance_method("bump", 2),
    );
    registry
        .declare(class, &["@minutes_waiting"], &IvarOptions::new().value(0_i64))
        .expect("declare");

    for _ in 0..3 {
        let instance = registry
            .new_instance(class, CtorArgs::new())
            .expect("construct");
        assert_eq!(instance.get("@minutes_waiting"), Value::Integer(0));
    }
    assert!(sink.lines().is_empty());

    let _ = fs::remove_dir_all(dir.as_std_path());
}

// ============================================================================
// No false positives
// ============================================================================

#[test]
fn set_and_declared_names_never_unmatched() {
    let dir = unique_temp_dir("ivarcheck_clean");
    let source = "\
class Report
  def initialize
    @answer = 42
  end

  def summary
    \"answer: #{@answer}, label: #{@label}\"
  end
end
";
    let path = write_fixture(&dir, "report.rb", source);
    let (registry, sink) = registry_with_sink();
    let class = registry.define(
        ClassBuilder::new("Report")
            .source_file(path)
            .constructor(2, |_, _, instance, _| {
                instance.set("@answer", 42_i64);
                Ok(())
            })
            .instance_method("summary", 6),
    );
    registry
        .declare(class, &["@label"], &IvarOptions::new())
        .expect("declare");

    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    assert!(sink.lines().is_empty());

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn constructed_slots_become_implicit_declarations() {
    let dir = unique_temp_dir("ivarcheck_implicit");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, _sink) = registry_with_sink();
    registry.set_default_policy(CheckPolicy::None);
    let class = define_sandwich(&registry, &path);

    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");

    let implicit = registry
        .with_manifest(class, |manifest| {
            manifest
                .declarations()
                .iter()
                .filter(|d| !d.is_explicit())
                .map(|d| d.name().clone())
                .collect::<Vec<_>>()
        })
        .expect("manifest materialized");
    assert!(implicit.contains(&EcoString::from("@bread")));
    assert!(implicit.contains(&EcoString::from("@cheese")));

    let _ = fs::remove_dir_all(dir.as_std_path());
}

// ============================================================================
// Analysis behavior through the registry
// ============================================================================

#[test]
fn analysis_is_deterministic_across_cache_resets() {
    let dir = unique_temp_dir("ivarcheck_determinism");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, _sink) = registry_with_sink();
    registry.set_default_policy(CheckPolicy::None);
    let class = define_sandwich(&registry, &path);

    let first = registry.analysis(class).expect("first analysis");
    let second = registry.analysis(class).expect("cached analysis");
    assert_eq!(first.references, second.references);

    registry.clear_analysis_cache();
    let third = registry.analysis(class).expect("recomputed analysis");
    assert_eq!(first.references, third.references);
    assert!(first.ivars.contains(&EcoString::from("@chese")));

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn wrapped_method_still_resolves_through_the_stash() {
    let dir = unique_temp_dir("ivarcheck_wrap");
    let path = write_fixture(&dir, "sandwich.rb", SANDWICH_SOURCE);
    let (registry, sink) = registry_with_sink();
    let class = define_sandwich(&registry, &path);

    registry
        .wrap_method(
            class,
            "to_s",
            MethodContext::Instance,
            Arc::new(|_, _, _| Ok(Value::from("[wrapped]"))),
        )
        .expect("wrap");

    // The wrapper has no location of its own; the original source still
    // drives the warnings.
    registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    assert_eq!(sink.lines().len(), 2);

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn unparsable_source_is_fatal() {
    let dir = unique_temp_dir("ivarcheck_bad_source");
    let path = write_fixture(&dir, "broken.rb", "class Broken\n  def oops\nend\n");
    let (registry, _sink) = registry_with_sink();
    let class = registry.define(
        ClassBuilder::new("Broken")
            .source_file(path)
            .instance_method("oops", 2),
    );
    registry.enable_checks(class);

    let err = registry
        .new_instance(class, CtorArgs::new())
        .expect_err("analysis should fail");
    assert!(matches!(err, ObjectError::Analysis(_)));

    let _ = fs::remove_dir_all(dir.as_std_path());
}

#[test]
fn method_without_location_contributes_nothing() {
    let (registry, sink) = registry_with_sink();
    let class = registry.define(ClassBuilder::new("Ghost").native_constructor(|_, _, instance, _| {
        instance.set("@present", true);
        Ok(())
    }));
    registry.enable_checks(class);

    let instance = registry
        .new_instance(class, CtorArgs::new())
        .expect("construct");
    assert_eq!(instance.get("@present"), Value::Bool(true));
    assert!(sink.lines().is_empty());
}

// ============================================================================
// Super-call chain
// ============================================================================

#[test]
fn super_initialize_runs_without_reentering_pre_init() {
    let registry = Registry::new();
    let parent = registry.define(ClassBuilder::new("Lunch").native_constructor(
        |_, _, instance, _| {
            instance.set("@course", "main");
            Ok(())
        },
    ));
    registry
        .declare(parent, &["@tray"], &IvarOptions::new().value("plastic"))
        .expect("declare");

    let child = registry.define(
        ClassBuilder::new("Sandwich")
            .superclass(parent)
            .native_constructor(|registry, own_class, instance, args| {
                instance.set("@bread", "wheat");
                registry.run_super_initialize(instance, own_class, args)
            }),
    );

    let instance = registry
        .new_instance(child, CtorArgs::new())
        .expect("construct");
    assert_eq!(instance.get("@bread"), Value::from("wheat"));
    assert_eq!(instance.get("@course"), Value::from("main"));
    assert_eq!(instance.get("@tray"), Value::from("plastic"));
}

#[test]
fn inherited_super_calling_constructor_runs_each_level_once() {
    // Leaf has no constructor of its own: construction resolves Middle's,
    // whose super-call must step to Base rather than resolve Middle again
    // on the Leaf instance.
    let registry = Registry::new();
    let base = registry.define(ClassBuilder::new("Base").native_constructor(
        |_, _, instance, _| {
            let count = match instance.get("@base_runs") {
                Value::Integer(n) => n,
                _ => 0,
            };
            instance.set("@base_runs", count + 1);
            Ok(())
        },
    ));
    let middle = registry.define(
        ClassBuilder::new("Middle")
            .superclass(base)
            .native_constructor(|registry, own_class, instance, args| {
                let count = match instance.get("@middle_runs") {
                    Value::Integer(n) => n,
                    _ => 0,
                };
                instance.set("@middle_runs", count + 1);
                registry.run_super_initialize(instance, own_class, args)
            }),
    );
    let leaf = registry.define(ClassBuilder::new("Leaf").superclass(middle));

    let instance = registry
        .new_instance(leaf, CtorArgs::new())
        .expect("construct");
    assert_eq!(instance.get("@middle_runs"), Value::Integer(1));
    assert_eq!(instance.get("@base_runs"), Value::Integer(1));
}
