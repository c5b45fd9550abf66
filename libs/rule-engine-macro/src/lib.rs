//! Rule Engine Macro - Declarative rules
//!
//! This proc-macro crate turns an annotated inherent `impl` block into a
//! rule for the `rule-engine` crate. Validation happens at compile time:
//! a malformed declaration never produces a rule.
//!
//! Use it through the re-export `rule_engine::rule`; generated code refers
//! to `::rule_engine` paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use rule_engine::{rule, Facts};
//!
//! struct Thermostat;
//!
//! #[rule(name = "heating", priority = 1)]
//! impl Thermostat {
//!     #[condition]
//!     fn too_cold(&self, #[fact("temperature")] temperature: i32) -> bool {
//!         temperature < 18
//!     }
//!
//!     #[action(order = 1)]
//!     fn heat(&self, facts: &mut Facts) {
//!         facts.put("heating", true);
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemImpl};

mod attributes;
mod codegen;
mod expand;
mod model;
mod utils;

/// Attribute macro deriving a rule from marked methods
///
/// # Rule arguments
///
/// - `name = "..."` - Rule name (default: host type name)
/// - `description = "..."` - Description (default: `"When <condition> then <action1>, <action2>"`)
/// - `priority = N` - Priority, lower runs first (default: the engine's default priority)
///
/// # Method markers
///
/// - `#[condition]` - Exactly one; returns `bool` or `Result<bool, E>`
/// - `#[action]` / `#[action(order = N)]` - At least one; returns `()` or `Result<(), E>`.
///   Runs in ascending order, ties in declaration order
/// - `#[name]`, `#[description]`, `#[priority]` - Optional overrides computed from `&self`
///
/// Every marked method takes `&self`.
///
/// # Parameters
///
/// Condition and action parameters are either:
///
/// - `#[fact("name")] value: T` - Fact cloned out of the store
/// - `#[fact("name")] value: &T` - Fact borrowed from the store
/// - `facts: &Facts` - The whole store
/// - `facts: &mut Facts` - The whole store, mutably (actions only, and then
///   no other view of the store)
///
/// A missing or mistyped fact makes the condition evaluate to "not accepted"
/// and makes an action fail.
#[proc_macro_attribute]
pub fn rule(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemImpl);

    expand::expand_rule(args.into(), item)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
