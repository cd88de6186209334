// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declarations: recorded intent about one instance variable.
//!
//! An [`Declaration::Explicit`] entry comes from the declaration call in a
//! class body and may carry a default, a default-generating function, an
//! initialization source, and accessor flags. An [`Declaration::Implicit`]
//! entry records a name that was observed set during construction without
//! ever being declared; it carries no behavior but keeps the name out of
//! future unmatched lists.

use std::str::FromStr;
use std::sync::Arc;

use ecow::EcoString;

use crate::error::DeclarationError;
use crate::object_model::Value;

/// A function computing a per-instance default, given the slot name.
pub type DefaultFn = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Where a declared slot's initial value comes from at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitSource {
    /// Defaults only; nothing is peeled from the constructor arguments.
    #[default]
    None,
    /// One value is shifted off the front of the positional arguments.
    Positional,
    /// The matching keyword argument (sigil-stripped name) is consumed.
    Keyword,
}

impl FromStr for InitSource {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "positional" => Ok(Self::Positional),
            // `kwarg` is the legacy spelling of `keyword`.
            "keyword" | "kwarg" => Ok(Self::Keyword),
            other => Err(DeclarationError::UnknownInitSource(EcoString::from(other))),
        }
    }
}

/// One recorded declaration.
#[derive(Clone)]
pub enum Declaration {
    /// A user-authored declaration with behavior attached.
    Explicit {
        /// The slot name, sigil included.
        name: EcoString,
        /// The scalar default, absent when unset.
        default: Option<Value>,
        /// A default-generating function called with the name.
        default_fn: Option<DefaultFn>,
        /// Where the initial value comes from.
        init: InitSource,
        /// Whether a reader accessor was generated.
        reader: bool,
        /// Whether a writer accessor was generated.
        writer: bool,
    },
    /// A name observed set during construction but never declared.
    Implicit {
        /// The slot name, sigil included.
        name: EcoString,
    },
}

impl Declaration {
    /// The declared name, sigil included.
    #[must_use]
    pub fn name(&self) -> &EcoString {
        match self {
            Self::Explicit { name, .. } | Self::Implicit { name } => name,
        }
    }

    /// Returns true for explicit declarations.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit { .. })
    }
}

impl std::fmt::Debug for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit {
                name,
                default,
                default_fn,
                init,
                reader,
                writer,
            } => f
                .debug_struct("Explicit")
                .field("name", name)
                .field("default", default)
                .field("default_fn", &default_fn.as_ref().map(|_| ".."))
                .field("init", init)
                .field("reader", reader)
                .field("writer", writer)
                .finish(),
            Self::Implicit { name } => f.debug_struct("Implicit").field("name", name).finish(),
        }
    }
}

/// Options accepted by the declaration call, builder style.
///
/// When both a scalar default and a default function are supplied, the
/// function runs first and the scalar overwrites its result.
#[derive(Clone, Default)]
pub struct IvarOptions {
    pub(crate) default: Option<Value>,
    pub(crate) default_fn: Option<DefaultFn>,
    pub(crate) init: InitSource,
    pub(crate) reader: bool,
    pub(crate) writer: bool,
}

impl IvarOptions {
    /// No default, no peel-off, no accessors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scalar default value.
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the default-generating function.
    #[must_use]
    pub fn value_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.default_fn = Some(Arc::new(f));
        self
    }

    /// Sets the initialization source.
    #[must_use]
    pub fn init(mut self, init: InitSource) -> Self {
        self.init = init;
        self
    }

    /// Requests a generated reader accessor.
    #[must_use]
    pub fn reader(mut self) -> Self {
        self.reader = true;
        self
    }

    /// Requests a generated writer accessor.
    #[must_use]
    pub fn writer(mut self) -> Self {
        self.writer = true;
        self
    }

    /// Requests both accessors.
    #[must_use]
    pub fn accessor(self) -> Self {
        self.reader().writer()
    }

    /// Builds the explicit declaration for one name.
    pub(crate) fn to_declaration(&self, name: &str) -> Declaration {
        Declaration::Explicit {
            name: EcoString::from(name),
            default: self.default.clone(),
            default_fn: self.default_fn.clone(),
            init: self.init,
            reader: self.reader,
            writer: self.writer,
        }
    }
}

impl std::fmt::Debug for IvarOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IvarOptions")
            .field("default", &self.default)
            .field("default_fn", &self.default_fn.as_ref().map(|_| ".."))
            .field("init", &self.init)
            .field("reader", &self.reader)
            .field("writer", &self.writer)
            .finish()
    }
}

/// Validates a declared slot name: `@` sigil followed by a non-empty
/// identifier. `@@` names (class variables) are rejected.
pub(crate) fn validate_name(name: &str) -> Result<(), DeclarationError> {
    let invalid = || DeclarationError::InvalidName(EcoString::from(name));
    let Some(rest) = name.strip_prefix('@') else {
        return Err(invalid());
    };
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return Err(invalid());
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    Ok(())
}

/// Strips the `@` sigil for accessor and keyword matching.
pub(crate) fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Name validation ---

    #[test]
    fn valid_names() {
        assert!(validate_name("@bread").is_ok());
        assert!(validate_name("@_private").is_ok());
        assert!(validate_name("@item2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("bread").is_err());
        assert!(validate_name("@").is_err());
        assert!(validate_name("@@klass").is_err());
        assert!(validate_name("@with space").is_err());
        assert!(validate_name("@2nd").is_err());
        assert!(validate_name("").is_err());
    }

    // --- Init source parsing ---

    #[test]
    fn init_source_spellings() {
        assert_eq!("none".parse::<InitSource>(), Ok(InitSource::None));
        assert_eq!("positional".parse::<InitSource>(), Ok(InitSource::Positional));
        assert_eq!("keyword".parse::<InitSource>(), Ok(InitSource::Keyword));
        // Legacy alias.
        assert_eq!("kwarg".parse::<InitSource>(), Ok(InitSource::Keyword));
        assert!("kw".parse::<InitSource>().is_err());
    }

    // --- Options ---

    #[test]
    fn options_build_explicit_declaration() {
        let options = IvarOptions::new()
            .value(0_i64)
            .init(InitSource::Keyword)
            .reader();
        let decl = options.to_declaration("@count");
        let Declaration::Explicit {
            name,
            default,
            init,
            reader,
            writer,
            ..
        } = decl
        else {
            panic!("expected explicit declaration");
        };
        assert_eq!(name, "@count");
        assert_eq!(default, Some(Value::Integer(0)));
        assert_eq!(init, InitSource::Keyword);
        assert!(reader);
        assert!(!writer);
    }

    #[test]
    fn sigil_stripping() {
        assert_eq!(strip_sigil("@cheese"), "cheese");
        assert_eq!(strip_sigil("cheese"), "cheese");
    }
}
