//! Domain value types and entities.

pub mod account;
pub mod bar;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod position;
pub mod price;

pub use account::Account;
pub use bar::{Bar, BarError, BarSeries, Tick};
pub use ids::{
    AccountId, BrokerOrderId, EventId, ExecutionId, ExecutionTicket, OrderId, PositionId,
    StrategyId, Symbol,
};
pub use instrument::{CatalogueError, Instrument, InstrumentCatalogue};
pub use order::{Order, OrderError, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use position::Position;
pub use price::{Money, Price, PriceError, Quantity};
