// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Instances and constructor arguments.
//!
//! Each instance owns an explicit slot map (`name -> Value`); there is no
//! reflective field storage. Reading a slot that was never written yields
//! `nil`, which is exactly the silent-typo hazard the checker exists to
//! catch.

use std::collections::BTreeMap;

use ecow::EcoString;

use super::class::ClassId;
use super::value::Value;

/// Where an instance is in its construction lifecycle.
///
/// Construction drives the states strictly left to right. The state also
/// serves as the re-entrancy guard: a superclass constructor invoked from
/// a subclass constructor finds the instance already past
/// [`ConstructionState::PreInitApplied`] and must not re-run declared
/// defaults or argument peel-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionState {
    /// Freshly allocated, no slots populated.
    Uninitialized,
    /// Declared defaults and argument peel-off have been applied.
    PreInitApplied,
    /// The user-authored constructor body has run.
    UserInitRan,
    /// The post-construction reference check has run at least once.
    Checked,
}

/// One object of the modeled system: a class reference plus a slot map.
#[derive(Debug, Clone)]
pub struct Instance {
    class: ClassId,
    slots: BTreeMap<EcoString, Value>,
    state: ConstructionState,
}

impl Instance {
    pub(crate) fn new(class: ClassId) -> Self {
        Self {
            class,
            slots: BTreeMap::new(),
            state: ConstructionState::Uninitialized,
        }
    }

    /// The instance's concrete class.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Reads a slot; an unset slot yields [`Value::Nil`].
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.slots.get(name).cloned().unwrap_or_default()
    }

    /// Writes a slot.
    pub fn set(&mut self, name: impl Into<EcoString>, value: impl Into<Value>) {
        self.slots.insert(name.into(), value.into());
    }

    /// Returns true if the slot has been written (even with `nil`).
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The names of all set slots, in sorted order.
    #[must_use]
    pub fn set_names(&self) -> Vec<EcoString> {
        self.slots.keys().cloned().collect()
    }

    /// The current construction state.
    #[must_use]
    pub fn state(&self) -> ConstructionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ConstructionState) {
        self.state = state;
    }
}

/// The arguments handed to a constructor call.
///
/// Pre-construction peel-off consumes values from the front of the
/// positional list and removes matched keyword entries, so the
/// user-authored constructor body observes only the remainder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtorArgs {
    positional: Vec<Value>,
    keywords: Vec<(EcoString, Value)>,
}

impl CtorArgs {
    /// No arguments at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only.
    #[must_use]
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Vec::new(),
        }
    }

    /// Adds a keyword argument (builder style).
    #[must_use]
    pub fn with_keyword(mut self, name: impl Into<EcoString>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// The remaining positional arguments, front first.
    #[must_use]
    pub fn positional_args(&self) -> &[Value] {
        &self.positional
    }

    /// The remaining keyword arguments, in insertion order.
    #[must_use]
    pub fn keyword_args(&self) -> &[(EcoString, Value)] {
        &self.keywords
    }

    /// Looks up a remaining keyword argument without consuming it.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Removes and returns the front positional argument, if one remains.
    pub(crate) fn shift(&mut self) -> Option<Value> {
        if self.positional.is_empty() {
            return None;
        }
        Some(self.positional.remove(0))
    }

    /// Removes and returns the keyword argument with the given name.
    pub(crate) fn take_keyword(&mut self, name: &str) -> Option<Value> {
        let index = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(index).1)
    }
}
