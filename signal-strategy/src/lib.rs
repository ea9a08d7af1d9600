//! The Strategy Registry (C1), the Strategy contract and shared scaffolding
//! (C4 — §4.4), and the built-in reference strategies.

extern crate self as signal_strategy;

mod instance;
mod logic;
mod registry;
mod strategies;

pub use instance::{Strategy, StrategyInstance};
pub use logic::{EntryDecision, ExitDecision, StrategyLogic};
pub use registry::{
    create_strategy, register_strategy_factory, registered_names, GenericStrategyFactory,
    StrategyFactory,
};
pub use strategies::{BollingerBreakout, RsiReversion, SmaCross};

pub use signal_strategy_macros::register_strategy;
