//! Strategy Engine (C5), Execution Forwarder (C6), Subscriber Hub (C7), and
//! Subscription Planner (C8) — the runtime core that drives every registered
//! [`signal_strategy::Strategy`] instance against incoming candles.

mod bookkeeping;
mod engine;
mod forwarder;
mod hub;
mod limiter;
mod planner;

pub use engine::StrategyEngine;
pub use forwarder::ExecutionForwarder;
pub use hub::{SignalFilter, SignalSubscription, SubscriberHub, MIN_QUEUE_BOUND};
pub use limiter::RateLimiter;
pub use planner::SubscriptionPlan;
