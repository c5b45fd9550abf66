//! Rule Engine Library
//!
//! Evaluates prioritized condition/action rules against a mutable fact store:
//! - Ordered, duplicate-free rule registry
//! - Single-pass and forward-chaining (inference) engines
//! - ALL / ANY composite rules
//! - Listener hooks that observe evaluation and can stop it early
//! - `#[rule]` attribute turning an annotated `impl` block into a rule
//! - Rule definitions built through a pluggable expression compiler
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ RuleBuilder  │────▶│    Rules    │────▶│  RuleEngine  │
//! │ #[rule] host │     │ (priority,  │     │ default /    │
//! │ RulesFactory │     │   name)     │     │ inference    │
//! └──────────────┘     └─────────────┘     └──────────────┘
//!                                             │        │
//!                                             ▼        ▼
//!                                      ┌──────────┐ ┌──────────────┐
//!                                      │  Facts   │ │ RuleListener │
//!                                      │ (mutable)│ │ (hooks/stop) │
//!                                      └──────────┘ └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use rule_engine::{Facts, RuleBuilder, RuleEngine, RuleEngineBuilder};
//!
//! let engine = RuleEngineBuilder::new()
//!     .rule(
//!         RuleBuilder::new("umbrella")
//!             .when_fact("rain", |rain: &bool| *rain)
//!             .then(|facts: &mut Facts| {
//!                 facts.put("advice", "take an umbrella".to_string());
//!                 Ok(())
//!             })
//!             .build()
//!             .unwrap(),
//!     )
//!     .build_default();
//!
//! let mut facts = Facts::new().with("rain", true);
//! engine.evaluate(&mut facts);
//! assert_eq!(facts.value::<String>("advice").unwrap(), "take an umbrella");
//! ```

// Lets `#[rule]` expansions refer to `::rule_engine` inside this crate too
extern crate self as rule_engine;

mod builder;
mod composite;
pub mod config;
mod declared;
mod definition;
mod engine;
mod error;
mod facts;
mod inference;
pub mod listener;
pub mod logging;
mod registry;
mod rule;

// Re-export public API
pub use builder::RuleBuilder;
pub use composite::{AllCompositeRule, AnyCompositeRule, CompositeRuleBuilder};
pub use config::{load_config, load_config_from_file, EngineConfig, EngineMode, LogConfig};
pub use declared::{
    as_rule, ActionOutcome, ConditionOutcome, DeclarativeRule, DeclaredRule, RuleDeclaration,
};
pub use definition::{ExpressionCompiler, RuleDefinition, RulesFactory};
pub use engine::{DefaultRuleEngine, RuleEngine, RuleEngineBuilder};
pub use error::{Result, RuleError};
pub use facts::Facts;
pub use inference::InferenceRuleEngine;
pub use listener::{CompositeListener, NoOpListener, RuleListener, RuleOutcome};
pub use registry::Rules;
pub use rule::{
    Action, Condition, DefaultRule, EvaluationContext, Rule, RuleKey, DEFAULT_PRIORITY,
};

// Declarative rules
pub use rule_engine_macro::rule;
