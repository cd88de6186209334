// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Runtime values for the modeled object system.
//!
//! The modeled language is dynamically typed; reading a slot that was
//! never written yields [`Value::Nil`] rather than an error. Values are
//! plain data — object references are out of scope for the checker, which
//! only cares about which *slots* hold something.

use ecow::EcoString;

/// A runtime value stored in an instance slot or passed as an argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The absent value. Reading an unset slot yields this.
    #[default]
    Nil,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Integer(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(EcoString),
    /// An interned symbol.
    Symbol(EcoString),
    /// An ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns true for [`Value::Nil`].
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Truthiness in the modeled language: everything except `nil` and
    /// `false` is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(EcoString::from(value))
    }
}

impl From<EcoString> for Value {
    fn from(value: EcoString) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
