//! PaperBroker core engine
//!
//! A deterministic, step-driven execution simulator: the virtual
//! counterpart of a live broker client. It replays bid/ask bar data,
//! decides whether resting orders cross the synthetic market, and emits
//! an ordered stream of order, position, and account events.

pub mod domain;
pub mod engine;
pub mod events;
pub mod services;
