//! Typed identifiers.
//!
//! Broker, execution, and ticket identifiers are derived from the order id
//! with fixed prefixes (`B`, `E`, `ET`); these strings are part of the
//! event-stream contract and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Instrument symbol, e.g. `EURUSD`.
    Symbol
);
string_id!(
    /// Client-side order identifier.
    OrderId
);
string_id!(
    /// Account identifier.
    AccountId
);
string_id!(
    /// Strategy identifier for order ownership.
    StrategyId
);
string_id!(
    /// Unique event identifier.
    EventId
);
string_id!(
    /// Venue-side order identifier (`"B" + order_id`).
    BrokerOrderId
);
string_id!(
    /// Execution identifier (`"E" + order_id`).
    ExecutionId
);
string_id!(
    /// Execution ticket (`"ET" + order_id`).
    ExecutionTicket
);
string_id!(
    /// Position identifier (`<symbol>-<N>`).
    PositionId
);

impl BrokerOrderId {
    pub fn from_order(order_id: &OrderId) -> Self {
        Self(format!("B{order_id}"))
    }
}

impl ExecutionId {
    pub fn from_order(order_id: &OrderId) -> Self {
        Self(format!("E{order_id}"))
    }
}

impl ExecutionTicket {
    pub fn from_order(order_id: &OrderId) -> Self {
        Self(format!("ET{order_id}"))
    }
}

impl PositionId {
    /// Position ids number the positions ever opened for a symbol.
    pub fn from_sequence(symbol: &Symbol, sequence: usize) -> Self {
        Self(format!("{symbol}-{sequence}"))
    }
}
