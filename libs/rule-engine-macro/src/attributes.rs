//! Attribute parsing for the rule macro
//!
//! This module uses `darling` to parse the `#[rule(...)]` arguments and the
//! markers placed on methods and parameters inside the annotated impl block.

use darling::{ast::NestedMeta, FromMeta};
use proc_macro2::TokenStream;
use syn::{Attribute, LitStr, Meta};

/// Rule-level arguments (#[rule(...)])
///
/// # Examples
///
/// ```ignore
/// #[rule(name = "weather", description = "umbrella advice", priority = 1)]
/// impl WeatherRule { /* ... */ }
/// ```
#[derive(Debug, Default, FromMeta)]
pub struct RuleArgs {
    /// Rule name (default: host type name)
    pub name: Option<String>,

    /// Rule description (default: generated from method names)
    pub description: Option<String>,

    /// Rule priority (default: the engine's default priority)
    pub priority: Option<i32>,
}

impl RuleArgs {
    pub fn parse(args: TokenStream) -> darling::Result<Self> {
        if args.is_empty() {
            return Ok(Self::default());
        }
        let items = NestedMeta::parse_meta_list(args)?;
        Self::from_list(&items)
    }
}

/// Action arguments (#[action] or #[action(order = N)])
#[derive(Debug, Default, Clone, Copy, FromMeta)]
pub struct ActionArgs {
    /// Execution order, ascending (default: 0)
    #[darling(default)]
    pub order: i32,
}

impl ActionArgs {
    pub fn from_attribute(attr: &Attribute) -> darling::Result<Self> {
        match &attr.meta {
            Meta::Path(_) => Ok(Self::default()),
            meta => Self::from_meta(meta),
        }
    }
}

/// Method markers recognised inside a `#[rule]` impl block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Condition,
    Action,
    Name,
    Description,
    Priority,
}

impl Marker {
    pub fn of(attr: &Attribute) -> Option<Self> {
        let path = attr.path();
        if path.is_ident("condition") {
            Some(Marker::Condition)
        } else if path.is_ident("action") {
            Some(Marker::Action)
        } else if path.is_ident("name") {
            Some(Marker::Name)
        } else if path.is_ident("description") {
            Some(Marker::Description)
        } else if path.is_ident("priority") {
            Some(Marker::Priority)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Marker::Condition => "#[condition]",
            Marker::Action => "#[action]",
            Marker::Name => "#[name]",
            Marker::Description => "#[description]",
            Marker::Priority => "#[priority]",
        }
    }
}

/// Whether a parameter attribute is a fact binding (#[fact("name")])
pub fn is_fact(attr: &Attribute) -> bool {
    attr.path().is_ident("fact")
}

/// Fact name from #[fact("name")]
pub fn fact_name(attr: &Attribute) -> darling::Result<String> {
    let name: LitStr = attr.parse_args().map_err(darling::Error::from)?;
    let value = name.value();
    if value.trim().is_empty() {
        return Err(darling::Error::custom("fact name must not be empty").with_span(&name));
    }
    Ok(value)
}
