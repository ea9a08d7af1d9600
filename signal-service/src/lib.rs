//! Service Orchestrator (C9): the binary-facing wiring that turns the
//! library crates (signal-core/-store/-strategy/-engine/-rpc/-config) into
//! a running Signal Engine Core process.

pub mod fanout_service;
pub mod orchestrator;
pub mod shutdown;

pub use fanout_service::FanoutGrpcService;
pub use orchestrator::ServiceOrchestrator;
pub use shutdown::ShutdownSignal;
