//! Execution engine: bar cursor and the simulated execution client.

pub mod cursor;
pub mod simulator;

pub use cursor::{BarCursor, CursorError};
pub use simulator::{ExecutionClient, ExecutionError, SimulatedExecClient, SimulatorConfig};
