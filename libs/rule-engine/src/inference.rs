//! Inference (forward-chaining) engine

use std::fmt;
use std::sync::Arc;

use crate::engine::{run_pass, RuleEngine};
use crate::facts::Facts;
use crate::listener::RuleListener;
use crate::registry::Rules;
use crate::rule::EvaluationContext;

/// Fires rules until none of their conditions hold
///
/// Each round selects the rules whose condition currently holds and runs a
/// default pass over exactly those; conditions are checked again inside the
/// pass. Listeners observe the passes only, not the selection step.
///
/// There is no iteration bound. A rule set whose actions keep some condition
/// true forever makes `evaluate` loop forever; callers must make sure their
/// rules converge.
pub struct InferenceRuleEngine {
    listener: Box<dyn RuleListener>,
    rules: Rules,
}

impl InferenceRuleEngine {
    pub fn new<L: RuleListener + 'static>(listener: L, rules: Rules) -> Self {
        Self::from_boxed(Box::new(listener), rules)
    }

    pub fn from_boxed(listener: Box<dyn RuleListener>, rules: Rules) -> Self {
        Self { listener, rules }
    }

    fn select_candidates(&self, facts: &Facts, ctx: &mut EvaluationContext) -> Rules {
        self.rules
            .iter()
            .filter(|rule| match rule.accept(facts, ctx) {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(
                        "Rule {} excluded from candidates, condition failed: {}",
                        rule.key(),
                        err
                    );
                    false
                },
            })
            .map(Arc::clone)
            .collect()
    }
}

impl RuleEngine for InferenceRuleEngine {
    fn rules(&self) -> &Rules {
        &self.rules
    }

    fn evaluate(&self, facts: &mut Facts) {
        let mut ctx = EvaluationContext::new();
        let mut round = 0_u64;

        loop {
            ctx.clear();
            tracing::debug!("Selecting candidate rules: {:?}", facts);
            let candidates = self.select_candidates(facts, &mut ctx);
            if candidates.is_empty() {
                tracing::debug!("No candidate rules after {} round(s)", round);
                break;
            }

            round += 1;
            tracing::debug!("Round {}: {} candidate rule(s)", round, candidates.len());
            run_pass(&candidates, self.listener.as_ref(), facts, &mut ctx);
        }
    }
}

impl fmt::Debug for InferenceRuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceRuleEngine")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
