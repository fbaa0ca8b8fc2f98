//! Event taxonomy.
//!
//! Events are immutable, timestamped records and are the only legitimate
//! means of mutating order, position, and account state. Every record
//! carries its own `event_id` and `timestamp`; the remaining fields are
//! the domain payload delivered to the event sink.

use crate::domain::ids::{
    AccountId, BrokerOrderId, EventId, ExecutionId, ExecutionTicket, OrderId, Symbol,
};
use crate::domain::order::{OrderSide, OrderType, TimeInForce};
use crate::domain::price::{Money, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order was handed to the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub submitted_time: DateTime<Utc>,
}

/// Venue acknowledged the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAccepted {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub accepted_time: DateTime<Utc>,
}

/// Venue refused the order (admission price check failed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub rejected_time: DateTime<Utc>,
    pub reason: String,
}

/// Order is resting at the venue awaiting a fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWorking {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub broker_id: BrokerOrderId,
    pub label: Option<String>,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Price,
    pub time_in_force: TimeInForce,
    pub working_time: DateTime<Utc>,
    pub expire_time: Option<DateTime<Utc>>,
}

/// A working order's price was amended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderModified {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub broker_id: BrokerOrderId,
    pub new_price: Price,
    pub modified_time: DateTime<Utc>,
}

/// A working order was cancelled on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub cancelled_time: DateTime<Utc>,
}

/// A modify request was refused; the order keeps working unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelReject {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub rejected_time: DateTime<Utc>,
    pub reason_code: String,
    pub reason_text: String,
}

/// A working order lapsed at its expire time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExpired {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub expired_time: DateTime<Utc>,
}

/// The order traded in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFilled {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub execution_id: ExecutionId,
    pub execution_ticket: ExecutionTicket,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub fill_price: Price,
    pub execution_time: DateTime<Utc>,
}

/// Snapshot of the account ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub account_id: AccountId,
    pub broker: String,
    pub account_number: String,
    pub currency: String,
    pub cash_balance: Money,
    pub cash_start_day: Money,
    pub cash_activity_day: Money,
    pub margin_used_liquidation: Money,
    pub margin_used_maintenance: Money,
    pub margin_ratio: Decimal,
    pub margin_call_status: String,
}

/// Order lifecycle events, applied to `Order` entities in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    Submitted(OrderSubmitted),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Working(OrderWorking),
    Modified(OrderModified),
    Cancelled(OrderCancelled),
    CancelReject(OrderCancelReject),
    Expired(OrderExpired),
    Filled(OrderFilled),
}

impl OrderEvent {
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderEvent::Submitted(e) => &e.order_id,
            OrderEvent::Accepted(e) => &e.order_id,
            OrderEvent::Rejected(e) => &e.order_id,
            OrderEvent::Working(e) => &e.order_id,
            OrderEvent::Modified(e) => &e.order_id,
            OrderEvent::Cancelled(e) => &e.order_id,
            OrderEvent::CancelReject(e) => &e.order_id,
            OrderEvent::Expired(e) => &e.order_id,
            OrderEvent::Filled(e) => &e.order_id,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            OrderEvent::Submitted(e) => &e.symbol,
            OrderEvent::Accepted(e) => &e.symbol,
            OrderEvent::Rejected(e) => &e.symbol,
            OrderEvent::Working(e) => &e.symbol,
            OrderEvent::Modified(e) => &e.symbol,
            OrderEvent::Cancelled(e) => &e.symbol,
            OrderEvent::CancelReject(e) => &e.symbol,
            OrderEvent::Expired(e) => &e.symbol,
            OrderEvent::Filled(e) => &e.symbol,
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            OrderEvent::Submitted(e) => &e.event_id,
            OrderEvent::Accepted(e) => &e.event_id,
            OrderEvent::Rejected(e) => &e.event_id,
            OrderEvent::Working(e) => &e.event_id,
            OrderEvent::Modified(e) => &e.event_id,
            OrderEvent::Cancelled(e) => &e.event_id,
            OrderEvent::CancelReject(e) => &e.event_id,
            OrderEvent::Expired(e) => &e.event_id,
            OrderEvent::Filled(e) => &e.event_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Submitted(e) => e.timestamp,
            OrderEvent::Accepted(e) => e.timestamp,
            OrderEvent::Rejected(e) => e.timestamp,
            OrderEvent::Working(e) => e.timestamp,
            OrderEvent::Modified(e) => e.timestamp,
            OrderEvent::Cancelled(e) => e.timestamp,
            OrderEvent::CancelReject(e) => e.timestamp,
            OrderEvent::Expired(e) => e.timestamp,
            OrderEvent::Filled(e) => e.timestamp,
        }
    }

    /// Wire-style name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderEvent::Submitted(_) => "OrderSubmitted",
            OrderEvent::Accepted(_) => "OrderAccepted",
            OrderEvent::Rejected(_) => "OrderRejected",
            OrderEvent::Working(_) => "OrderWorking",
            OrderEvent::Modified(_) => "OrderModified",
            OrderEvent::Cancelled(_) => "OrderCancelled",
            OrderEvent::CancelReject(_) => "OrderCancelReject",
            OrderEvent::Expired(_) => "OrderExpired",
            OrderEvent::Filled(_) => "OrderFilled",
        }
    }
}

/// Everything the event sink can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Order(OrderEvent),
    Account(AccountEvent),
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Event::Order(event)
    }
}

impl From<AccountEvent> for Event {
    fn from(event: AccountEvent) -> Self {
        Event::Account(event)
    }
}
