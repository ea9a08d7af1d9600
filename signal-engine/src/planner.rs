//! Subscription Planner (C8, §4.8): from the engine's registered instances,
//! computes the set of upstream `(timeframe -> symbols)` subscriptions C9
//! must open. An empty result is a startup error — there is nothing for the
//! orchestrator to subscribe to.

use std::collections::{HashMap, HashSet};

use signal_core::EngineError;

/// `timeframe -> set<symbol>`, the union over every registered instance's
/// declared `(timeframes, symbols)`.
pub type SubscriptionPlan = HashMap<String, HashSet<String>>;

pub(crate) fn plan_from_instances<'a>(
    instances: impl IntoIterator<Item = (&'a [String], &'a [String])>,
) -> SubscriptionPlan {
    let mut plan: SubscriptionPlan = HashMap::new();
    for (timeframes, symbols) in instances {
        for tf in timeframes {
            let entry = plan.entry(tf.clone()).or_default();
            for sym in symbols {
                entry.insert(sym.clone());
            }
        }
    }
    plan
}

/// Validates a computed plan is non-empty, per §4.8 ("empty result is a
/// startup error").
pub fn require_non_empty(plan: SubscriptionPlan) -> Result<SubscriptionPlan, EngineError> {
    if plan.is_empty() {
        Err(EngineError::NoActiveStrategies)
    } else {
        Ok(plan)
    }
}
