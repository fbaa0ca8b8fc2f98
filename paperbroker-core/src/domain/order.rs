//! Order entity and its lifecycle state machine.
//!
//! An `Order` mutates only by applying events, in arrival order. Each
//! event kind is legal in a fixed set of states:
//!
//! ```text
//! Initialized → Submitted → Accepted ─┬→ Rejected
//!                                     ├→ Filled            (market)
//!                                     └→ Working ─┬→ Filled
//!                                                 ├→ Cancelled
//!                                                 ├→ Expired
//!                                                 └→ Modified → Working
//! ```
//!
//! Applying an event that is not legal in the current state fails with
//! `OrderError::InvalidTransition` and leaves the order untouched.

use crate::domain::ids::{BrokerOrderId, OrderId, Symbol};
use crate::domain::price::{Price, Quantity};
use crate::events::OrderEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {order_id}: {event} is not a legal event in state {from}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        event: &'static str,
    },

    #[error("order quantity must be positive")]
    ZeroQuantity,

    #[error("GTD order requires an expire time")]
    MissingExpireTime,
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order execution type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
    /// Market-if-touched; treated as a stop-market by the simulator.
    MarketIfTouched,
}

impl OrderType {
    /// All types except market rest at a price.
    pub fn requires_price(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::StopMarket => write!(f, "STOP_MARKET"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
            OrderType::MarketIfTouched => write!(f, "MIT"),
        }
    }
}

/// How long an order remains active if not filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good-till-cancelled.
    Gtc,
    /// Good-till-date; requires an expire time.
    Gtd,
    /// Expires at end of trading day.
    Day,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-cancel.
    Foc,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Gtd => write!(f, "GTD"),
            TimeInForce::Day => write!(f, "DAY"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Foc => write!(f, "FOC"),
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Initialized,
    Submitted,
    Accepted,
    Rejected,
    Working,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Initialized => write!(f, "INITIALIZED"),
            OrderStatus::Submitted => write!(f, "SUBMITTED"),
            OrderStatus::Accepted => write!(f, "ACCEPTED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Working => write!(f, "WORKING"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A client order. Immutable except through `apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    label: Option<String>,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    price: Option<Price>,
    time_in_force: TimeInForce,
    expire_time: Option<DateTime<Utc>>,

    status: OrderStatus,
    broker_id: Option<BrokerOrderId>,
    filled_quantity: Quantity,
    average_price: Option<Price>,
    event_count: usize,
}

impl Order {
    fn new(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        if quantity.is_zero() {
            return Err(OrderError::ZeroQuantity);
        }
        if time_in_force == TimeInForce::Gtd && expire_time.is_none() {
            return Err(OrderError::MissingExpireTime);
        }
        debug_assert_eq!(order_type.requires_price(), price.is_some());
        Ok(Self {
            id,
            symbol,
            label,
            side,
            order_type,
            quantity,
            price,
            time_in_force,
            expire_time,
            status: OrderStatus::Initialized,
            broker_id: None,
            filled_quantity: Quantity::new(0),
            average_price: None,
            event_count: 0,
        })
    }

    pub fn market(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        Self::new(
            id,
            symbol,
            side,
            OrderType::Market,
            quantity,
            None,
            TimeInForce::Gtc,
            None,
            label,
        )
    }

    pub fn limit(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        Self::new(
            id,
            symbol,
            side,
            OrderType::Limit,
            quantity,
            Some(price),
            time_in_force,
            expire_time,
            label,
        )
    }

    pub fn stop_market(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        Self::new(
            id,
            symbol,
            side,
            OrderType::StopMarket,
            quantity,
            Some(price),
            time_in_force,
            expire_time,
            label,
        )
    }

    pub fn stop_limit(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        Self::new(
            id,
            symbol,
            side,
            OrderType::StopLimit,
            quantity,
            Some(price),
            time_in_force,
            expire_time,
            label,
        )
    }

    pub fn market_if_touched(
        id: OrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
        label: Option<String>,
    ) -> Result<Self, OrderError> {
        Self::new(
            id,
            symbol,
            side,
            OrderType::MarketIfTouched,
            quantity,
            Some(price),
            time_in_force,
            expire_time,
            label,
        )
    }

    // ── Observables ────────────────────────────────────────────────────

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn price(&self) -> Option<Price> {
        self.price
    }

    pub fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    pub fn expire_time(&self) -> Option<DateTime<Utc>> {
        self.expire_time
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn broker_id(&self) -> Option<&BrokerOrderId> {
        self.broker_id.as_ref()
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    pub fn average_price(&self) -> Option<Price> {
        self.average_price
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn is_working(&self) -> bool {
        self.status == OrderStatus::Working
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    // ── State machine ──────────────────────────────────────────────────

    /// Apply a lifecycle event, validating it against the current state.
    pub fn apply(&mut self, event: &OrderEvent) -> Result<(), OrderError> {
        debug_assert_eq!(event.order_id(), &self.id);
        match (self.status, event) {
            (OrderStatus::Initialized, OrderEvent::Submitted(_)) => {
                self.status = OrderStatus::Submitted;
            }
            (OrderStatus::Submitted, OrderEvent::Accepted(_)) => {
                self.status = OrderStatus::Accepted;
            }
            (OrderStatus::Submitted | OrderStatus::Accepted, OrderEvent::Rejected(_)) => {
                self.status = OrderStatus::Rejected;
            }
            (OrderStatus::Accepted, OrderEvent::Working(e)) => {
                self.status = OrderStatus::Working;
                self.broker_id = Some(e.broker_id.clone());
            }
            (OrderStatus::Working, OrderEvent::Modified(e)) => {
                self.price = Some(e.new_price);
            }
            (OrderStatus::Working, OrderEvent::CancelReject(_)) => {
                // Refused modify; the order keeps its price and state.
            }
            (OrderStatus::Working, OrderEvent::Cancelled(_)) => {
                self.status = OrderStatus::Cancelled;
            }
            (OrderStatus::Working, OrderEvent::Expired(_)) => {
                self.status = OrderStatus::Expired;
            }
            (OrderStatus::Accepted | OrderStatus::Working, OrderEvent::Filled(e)) => {
                self.status = OrderStatus::Filled;
                self.filled_quantity = e.quantity;
                self.average_price = Some(e.fill_price);
            }
            (from, event) => {
                return Err(OrderError::InvalidTransition {
                    order_id: self.id.clone(),
                    from,
                    event: event.kind(),
                });
            }
        }
        self.event_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::EventId;
    use crate::events::{
        OrderAccepted, OrderCancelled, OrderFilled, OrderSubmitted, OrderWorking,
    };
    use crate::domain::ids::{ExecutionId, ExecutionTicket};
    use chrono::TimeZone;

    // ── Test helpers ───────────────────────────────────────────────────

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn price(value: f64) -> Price {
        Price::from_f64(value, 4).unwrap()
    }

    fn buy_stop(id: &str, stop: f64) -> Order {
        Order::stop_market(
            OrderId::new(id),
            Symbol::new("EURUSD"),
            OrderSide::Buy,
            Quantity::new(100_000),
            price(stop),
            TimeInForce::Gtc,
            None,
            None,
        )
        .unwrap()
    }

    fn submitted(order: &Order) -> OrderEvent {
        OrderEvent::Submitted(OrderSubmitted {
            event_id: EventId::new("ev-submitted"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            submitted_time: t0(),
        })
    }

    fn accepted(order: &Order) -> OrderEvent {
        OrderEvent::Accepted(OrderAccepted {
            event_id: EventId::new("ev-accepted"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            accepted_time: t0(),
        })
    }

    fn working(order: &Order) -> OrderEvent {
        OrderEvent::Working(OrderWorking {
            event_id: EventId::new("ev-working"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            broker_id: BrokerOrderId::from_order(order.id()),
            label: None,
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price().unwrap(),
            time_in_force: order.time_in_force(),
            working_time: t0(),
            expire_time: None,
        })
    }

    fn filled(order: &Order, fill_price: f64) -> OrderEvent {
        OrderEvent::Filled(OrderFilled {
            event_id: EventId::new("ev-filled"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            execution_id: ExecutionId::from_order(order.id()),
            execution_ticket: ExecutionTicket::from_order(order.id()),
            side: order.side(),
            quantity: order.quantity(),
            fill_price: price(fill_price),
            execution_time: t0(),
        })
    }

    fn cancelled(order: &Order) -> OrderEvent {
        OrderEvent::Cancelled(OrderCancelled {
            event_id: EventId::new("ev-cancelled"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            cancelled_time: t0(),
        })
    }

    // ── Construction ───────────────────────────────────────────────────

    #[test]
    fn zero_quantity_rejected_at_construction() {
        let result = Order::market(
            OrderId::new("O-1"),
            Symbol::new("EURUSD"),
            OrderSide::Buy,
            Quantity::new(0),
            None,
        );
        assert!(matches!(result, Err(OrderError::ZeroQuantity)));
    }

    #[test]
    fn gtd_requires_expire_time() {
        let result = Order::limit(
            OrderId::new("O-1"),
            Symbol::new("EURUSD"),
            OrderSide::Buy,
            Quantity::new(100_000),
            price(1.0990),
            TimeInForce::Gtd,
            None,
            None,
        );
        assert!(matches!(result, Err(OrderError::MissingExpireTime)));
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    #[test]
    fn full_working_lifecycle() {
        let mut order = buy_stop("O-1", 1.1010);
        assert_eq!(order.status(), OrderStatus::Initialized);

        order.apply(&submitted(&order)).unwrap();
        order.apply(&accepted(&order)).unwrap();
        order.apply(&working(&order)).unwrap();

        assert!(order.is_working());
        assert_eq!(order.broker_id().unwrap().as_str(), "BO-1");

        order.apply(&filled(&order, 1.1011)).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert!(order.is_complete());
        assert_eq!(order.filled_quantity(), Quantity::new(100_000));
        assert_eq!(order.average_price().unwrap(), price(1.1011));
        assert_eq!(order.event_count(), 4);
    }

    #[test]
    fn cancel_from_working() {
        let mut order = buy_stop("O-1", 1.1010);
        order.apply(&submitted(&order)).unwrap();
        order.apply(&accepted(&order)).unwrap();
        order.apply(&working(&order)).unwrap();
        order.apply(&cancelled(&order)).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn modify_keeps_order_working_with_new_price() {
        use crate::events::OrderModified;

        let mut order = buy_stop("O-1", 1.1010);
        order.apply(&submitted(&order)).unwrap();
        order.apply(&accepted(&order)).unwrap();
        order.apply(&working(&order)).unwrap();

        let modify = OrderEvent::Modified(OrderModified {
            event_id: EventId::new("ev-modified"),
            timestamp: t0(),
            symbol: order.symbol().clone(),
            order_id: order.id().clone(),
            broker_id: BrokerOrderId::from_order(order.id()),
            new_price: price(1.1020),
            modified_time: t0(),
        });
        order.apply(&modify).unwrap();

        assert!(order.is_working());
        assert_eq!(order.price().unwrap(), price(1.1020));
    }

    // ── Invalid transitions ────────────────────────────────────────────

    #[test]
    fn fill_before_submit_is_invalid() {
        let mut order = buy_stop("O-1", 1.1010);
        let event = filled(&order, 1.1011);
        let err = order.apply(&event).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(order.status(), OrderStatus::Initialized);
    }

    #[test]
    fn terminal_states_accept_no_events() {
        let mut order = buy_stop("O-1", 1.1010);
        order.apply(&submitted(&order)).unwrap();
        order.apply(&accepted(&order)).unwrap();
        order.apply(&working(&order)).unwrap();
        order.apply(&cancelled(&order)).unwrap();

        let event = filled(&order, 1.1011);
        assert!(order.apply(&event).is_err());
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn double_cancel_is_invalid() {
        let mut order = buy_stop("O-1", 1.1010);
        order.apply(&submitted(&order)).unwrap();
        order.apply(&accepted(&order)).unwrap();
        order.apply(&working(&order)).unwrap();
        order.apply(&cancelled(&order)).unwrap();
        assert!(order.apply(&cancelled(&order)).is_err());
    }
}
