//! Position — net directional exposure accumulated from fills.

use crate::domain::ids::{EventId, PositionId, Symbol};
use crate::domain::order::OrderSide;
use crate::domain::price::Price;
use crate::events::OrderFilled;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exposure for one symbol, created lazily on the first fill and mutated
/// only by applying fill events. Exits when net quantity returns to zero;
/// an exited position is never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    symbol: Symbol,
    /// Signed net quantity: buys add, sells subtract.
    quantity: i64,
    average_entry_price: Option<Price>,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
    /// Largest absolute exposure seen over the position's life.
    peak_quantity: u64,
    /// Fill events applied, in arrival order.
    event_ids: Vec<EventId>,
}

impl Position {
    pub fn new(id: PositionId, symbol: Symbol, entry_time: DateTime<Utc>) -> Self {
        Self {
            id,
            symbol,
            quantity: 0,
            average_entry_price: None,
            entry_time,
            exit_time: None,
            peak_quantity: 0,
            event_ids: Vec::new(),
        }
    }

    /// Apply a fill: update signed net quantity and, while exposure is
    /// being built in one direction, the volume-weighted entry price.
    pub fn apply(&mut self, fill: &OrderFilled) {
        debug_assert_eq!(fill.symbol, self.symbol);

        let qty = fill.quantity.value() as i64;
        let signed = match fill.side {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        };

        let building = self.quantity == 0 || self.quantity.signum() == signed.signum();
        if building {
            let held = Decimal::from(self.quantity.unsigned_abs());
            let added = Decimal::from(fill.quantity.value());
            let entry = match self.average_entry_price {
                Some(current) => {
                    (current.value() * held + fill.fill_price.value() * added) / (held + added)
                }
                None => fill.fill_price.value(),
            };
            self.average_entry_price = Some(Price::new(entry, fill.fill_price.precision()));
        }

        self.quantity += signed;
        self.peak_quantity = self.peak_quantity.max(self.quantity.unsigned_abs());
        self.event_ids.push(fill.event_id.clone());

        if self.quantity == 0 {
            self.exit_time = Some(fill.execution_time);
        }
    }

    pub fn id(&self) -> &PositionId {
        &self.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn average_entry_price(&self) -> Option<Price> {
        self.average_entry_price
    }

    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        self.exit_time
    }

    pub fn peak_quantity(&self) -> u64 {
        self.peak_quantity
    }

    pub fn event_ids(&self) -> &[EventId] {
        &self.event_ids
    }

    /// True once net quantity has returned to zero.
    pub fn is_exited(&self) -> bool {
        self.exit_time.is_some()
    }
}
