//! Simulated execution client — the core backtest state machine.
//!
//! Strategies talk to an `ExecutionClient`; in a backtest that client is
//! `SimulatedExecClient`, which replays bar data one timestamp at a time
//! and decides whether resting orders cross the synthetic market. All
//! state changes surface as events delivered synchronously to the sink.

use crate::domain::account::Account;
use crate::domain::bar::Tick;
use crate::domain::ids::{
    AccountId, BrokerOrderId, ExecutionId, ExecutionTicket, OrderId, PositionId, StrategyId,
    Symbol,
};
use crate::domain::instrument::{CatalogueError, InstrumentCatalogue};
use crate::domain::order::{Order, OrderError, OrderSide, OrderType};
use crate::domain::position::Position;
use crate::domain::price::{Money, Price};
use crate::engine::cursor::{BarCursor, CursorError};
use crate::events::{
    AccountEvent, Event, OrderAccepted, OrderCancelReject, OrderCancelled, OrderEvent,
    OrderExpired, OrderFilled, OrderModified, OrderRejected, OrderSubmitted, OrderWorking,
};
use crate::services::{Clock, EventSink, IdFactory};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REASON_INVALID_PRICE: &str = "INVALID PRICE";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("starting capital must be positive, got {0}")]
    InvalidStartingCapital(Money),

    #[error("order {0} is already working")]
    DuplicateOrder(OrderId),

    #[error("order {0} is unknown")]
    UnknownOrder(OrderId),

    #[error("order {0} is not working")]
    OrderNotWorking(OrderId),

    #[error("order {0} has no price")]
    MissingPrice(OrderId),

    #[error("price arithmetic overflow")]
    PriceOverflow,

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Construction parameters for the simulated venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub account_number: String,
    pub currency: String,
    pub starting_capital: Money,
    /// Ticks of slippage applied against the trader on every fill.
    pub slippage_ticks: u32,
}

/// The execution interface strategies are written against. A live broker
/// client and the simulator both implement it.
pub trait ExecutionClient {
    fn connect(&mut self);
    fn disconnect(&mut self);

    /// Emit an account snapshot event.
    fn collateral_inquiry(&mut self) -> Result<(), ExecutionError>;

    /// Register and evaluate a new order. Emits `OrderSubmitted` and
    /// `OrderAccepted`, then either fills (market), rejects (admission
    /// check), or parks the order as working.
    fn submit_order(&mut self, order: Order, strategy_id: StrategyId)
        -> Result<(), ExecutionError>;

    /// Cancel a working order.
    fn cancel_order(&mut self, order_id: &OrderId, reason: &str) -> Result<(), ExecutionError>;

    /// Amend a working order's price. An admission-check failure surfaces
    /// as an `OrderCancelReject` event, not an error.
    fn modify_order(&mut self, order_id: &OrderId, new_price: Price)
        -> Result<(), ExecutionError>;
}

/// Virtual counterpart of a live broker execution client.
pub struct SimulatedExecClient {
    config: SimulatorConfig,
    instruments: InstrumentCatalogue,
    cursor: BarCursor,
    ticks: IndexMap<Symbol, Vec<Tick>>,
    /// Per-symbol slippage: `tick_size * slippage_ticks`.
    slippage: IndexMap<Symbol, Price>,
    /// Orders keyed by id, in submission order. The working set is the
    /// subset still in the `Working` state; once an order reaches a
    /// terminal state its id may be resubmitted, replacing the record.
    orders: IndexMap<OrderId, Order>,
    owners: IndexMap<OrderId, StrategyId>,
    open_positions: IndexMap<Symbol, Position>,
    completed_positions: IndexMap<PositionId, Position>,
    /// Count of positions ever opened, per symbol.
    position_counts: IndexMap<Symbol, usize>,
    account: Account,
    day: Option<NaiveDate>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdFactory>,
    sink: Box<dyn EventSink>,
}

impl SimulatedExecClient {
    pub fn new(
        config: SimulatorConfig,
        instruments: InstrumentCatalogue,
        cursor: BarCursor,
        ticks: IndexMap<Symbol, Vec<Tick>>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdFactory>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, ExecutionError> {
        if !config.starting_capital.is_positive() {
            return Err(ExecutionError::InvalidStartingCapital(
                config.starting_capital,
            ));
        }

        let mut slippage = IndexMap::with_capacity(instruments.len());
        for instrument in instruments.iter() {
            let offset = instrument
                .tick_size
                .checked_mul(config.slippage_ticks)
                .ok_or(ExecutionError::PriceOverflow)?;
            slippage.insert(instrument.symbol.clone(), offset);
        }

        let account = Account::new(
            AccountId::new(format!(
                "{}-{}",
                crate::domain::account::SIMULATED_BROKER,
                config.account_number
            )),
            config.account_number.clone(),
            config.currency.clone(),
            config.starting_capital,
        );

        Ok(Self {
            config,
            instruments,
            cursor,
            ticks,
            slippage,
            orders: IndexMap::new(),
            owners: IndexMap::new(),
            open_positions: IndexMap::new(),
            completed_positions: IndexMap::new(),
            position_counts: IndexMap::new(),
            account,
            day: None,
            clock,
            ids,
            sink,
        })
    }

    // ── Driver operations ──────────────────────────────────────────────

    /// Wind the bar cursor to the strategy's warm-up point and set the
    /// injected clock to the resulting wall-clock value.
    pub fn set_initial_iteration(
        &mut self,
        to_time: DateTime<Utc>,
        step: Duration,
    ) -> Result<(), ExecutionError> {
        let wall_clock = self.cursor.set_initial_iteration(to_time, step)?;
        self.clock.set_time(wall_clock);
        Ok(())
    }

    /// Advance one simulated timestamp: roll the daily cash anchor on a
    /// calendar-day change, resolve working orders against the current
    /// bar, then step the cursor.
    pub fn iterate(&mut self, time: DateTime<Utc>) -> Result<(), ExecutionError> {
        self.clock.set_time(time);

        let day = time.date_naive();
        if self.day != Some(day) {
            self.day = Some(day);
            tracing::debug!(%day, "day rollover");
            let snapshot = self.account_snapshot(self.account.cash_balance(), Money::zero());
            self.apply_account_event(snapshot);
        }

        // Snapshot of the working set; mutations during the scan affect
        // only subsequent iterations.
        let working: Vec<OrderId> = self
            .orders
            .values()
            .filter(|order| order.is_working())
            .map(|order| order.id().clone())
            .collect();

        for order_id in working {
            let order = self
                .orders
                .get(&order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            if !order.is_working() {
                continue;
            }
            let symbol = order.symbol().clone();
            let side = order.side();
            let order_type = order.order_type();
            let expire_time = order.expire_time();
            let price = order
                .price()
                .ok_or_else(|| ExecutionError::MissingPrice(order_id.clone()))?;

            let triggered = match (side, order_type) {
                (
                    OrderSide::Buy,
                    OrderType::StopMarket | OrderType::StopLimit | OrderType::MarketIfTouched,
                ) => self.cursor.highest_ask(&symbol)? >= price,
                (OrderSide::Buy, OrderType::Limit) => self.cursor.highest_ask(&symbol)? < price,
                (
                    OrderSide::Sell,
                    OrderType::StopMarket | OrderType::StopLimit | OrderType::MarketIfTouched,
                ) => self.cursor.lowest_bid(&symbol)? <= price,
                (OrderSide::Sell, OrderType::Limit) => self.cursor.lowest_bid(&symbol)? > price,
                // Market orders never rest in the working set.
                (_, OrderType::Market) => false,
            };

            if triggered {
                let fill_price = self.slipped_price(&symbol, side, price)?;
                self.fill_order(&order_id, fill_price, time)?;
            } else if let Some(expire) = expire_time {
                // Fills take precedence over expiry within an iteration.
                if time >= expire {
                    self.expire_order(&order_id, time)?;
                }
            }
        }

        self.cursor.advance();
        Ok(())
    }

    // ── Inspection ─────────────────────────────────────────────────────

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn instruments(&self) -> &InstrumentCatalogue {
        &self.instruments
    }

    pub fn iteration(&self) -> usize {
        self.cursor.iteration()
    }

    pub fn time_now(&self) -> DateTime<Utc> {
        self.clock.time_now()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn order_strategy(&self, order_id: &OrderId) -> Option<&StrategyId> {
        self.owners.get(order_id)
    }

    /// Orders currently resting at the venue, in submission order.
    pub fn working_orders(&self) -> Vec<&Order> {
        self.orders.values().filter(|o| o.is_working()).collect()
    }

    pub fn open_positions(&self) -> &IndexMap<Symbol, Position> {
        &self.open_positions
    }

    pub fn completed_positions(&self) -> &IndexMap<PositionId, Position> {
        &self.completed_positions
    }

    pub fn slippage(&self, symbol: &Symbol) -> Option<Price> {
        self.slippage.get(symbol).copied()
    }

    pub fn ticks(&self, symbol: &Symbol) -> Option<&[Tick]> {
        self.ticks.get(symbol).map(Vec::as_slice)
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Admission price check applied on submit and modify. `None` means
    /// the price is acceptable; otherwise the rejection reason.
    fn admission_failure(
        side: OrderSide,
        order_type: OrderType,
        price: Price,
        closing_bid: Price,
        closing_ask: Price,
    ) -> Option<String> {
        match (side, order_type) {
            (
                OrderSide::Buy,
                OrderType::StopMarket | OrderType::StopLimit | OrderType::MarketIfTouched,
            ) if price < closing_ask => Some(format!(
                "BUY {order_type} order price {price} is below the ask {closing_ask}"
            )),
            (OrderSide::Buy, OrderType::Limit) if price > closing_ask => Some(format!(
                "BUY LIMIT order price {price} is above the ask {closing_ask}"
            )),
            (
                OrderSide::Sell,
                OrderType::StopMarket | OrderType::StopLimit | OrderType::MarketIfTouched,
            ) if price > closing_bid => Some(format!(
                "SELL {order_type} order price {price} is above the bid {closing_bid}"
            )),
            (OrderSide::Sell, OrderType::Limit) if price < closing_bid => Some(format!(
                "SELL LIMIT order price {price} is below the bid {closing_bid}"
            )),
            _ => None,
        }
    }

    /// Fill price with slippage applied against the order side.
    fn slipped_price(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        price: Price,
    ) -> Result<Price, ExecutionError> {
        let offset = *self
            .slippage
            .get(symbol)
            .ok_or_else(|| CatalogueError::UnknownSymbol(symbol.clone()))?;
        match side {
            OrderSide::Buy => price.checked_add(offset),
            OrderSide::Sell => price.checked_sub(offset),
        }
        .ok_or(ExecutionError::PriceOverflow)
    }

    fn emit_order_event(
        &mut self,
        order_id: &OrderId,
        event: OrderEvent,
    ) -> Result<(), ExecutionError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
        order.apply(&event)?;
        tracing::debug!(kind = event.kind(), order_id = %order_id, "order event");
        self.sink.on_event(&Event::Order(event));
        Ok(())
    }

    fn account_snapshot(&mut self, cash_start_day: Money, cash_activity_day: Money) -> AccountEvent {
        AccountEvent {
            event_id: self.ids.generate(),
            timestamp: self.clock.time_now(),
            account_id: self.account.id().clone(),
            broker: self.account.broker().to_string(),
            account_number: self.account.account_number().to_string(),
            currency: self.account.currency().to_string(),
            cash_balance: self.account.cash_balance(),
            cash_start_day,
            cash_activity_day,
            margin_used_liquidation: self.account.margin_used_liquidation(),
            margin_used_maintenance: self.account.margin_used_maintenance(),
            margin_ratio: self.account.margin_ratio(),
            margin_call_status: self.account.margin_call_status().to_string(),
        }
    }

    fn apply_account_event(&mut self, event: AccountEvent) {
        self.account.apply(&event);
        self.sink.on_event(&Event::Account(event));
    }

    fn fill_order(
        &mut self,
        order_id: &OrderId,
        fill_price: Price,
        time: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        let (symbol, side, quantity) = {
            let order = self
                .orders
                .get(order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            (order.symbol().clone(), order.side(), order.quantity())
        };

        let filled = OrderFilled {
            event_id: self.ids.generate(),
            timestamp: time,
            symbol: symbol.clone(),
            order_id: order_id.clone(),
            execution_id: ExecutionId::from_order(order_id),
            execution_ticket: ExecutionTicket::from_order(order_id),
            side,
            quantity,
            fill_price,
            execution_time: time,
        };
        tracing::info!(
            order_id = %order_id,
            %symbol,
            %side,
            %quantity,
            price = %fill_price,
            "order filled"
        );
        let position_fill = filled.clone();
        self.emit_order_event(order_id, OrderEvent::Filled(filled))?;

        let snapshot = self.account_snapshot(
            self.account.cash_start_day(),
            self.account.cash_activity_day(),
        );
        self.apply_account_event(snapshot);

        self.adjust_positions(&position_fill);
        Ok(())
    }

    /// Route a fill into the position maps, then snapshot the account
    /// again (the hook where P&L accounting would land).
    fn adjust_positions(&mut self, fill: &OrderFilled) {
        if !self.open_positions.contains_key(&fill.symbol) {
            let count = self
                .position_counts
                .entry(fill.symbol.clone())
                .or_insert(0);
            *count += 1;
            let id = PositionId::from_sequence(&fill.symbol, *count);
            tracing::debug!(position_id = %id, "position opened");
            self.open_positions.insert(
                fill.symbol.clone(),
                Position::new(id, fill.symbol.clone(), fill.execution_time),
            );
        }

        let mut exited = false;
        if let Some(position) = self.open_positions.get_mut(&fill.symbol) {
            position.apply(fill);
            exited = position.is_exited();
        }
        if exited {
            if let Some(position) = self.open_positions.shift_remove(&fill.symbol) {
                tracing::debug!(position_id = %position.id(), "position exited");
                self.completed_positions
                    .insert(position.id().clone(), position);
            }
        }

        let snapshot = self.account_snapshot(
            self.account.cash_start_day(),
            self.account.cash_activity_day(),
        );
        self.apply_account_event(snapshot);
    }

    fn expire_order(
        &mut self,
        order_id: &OrderId,
        time: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        let symbol = {
            let order = self
                .orders
                .get(order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            order.symbol().clone()
        };
        tracing::info!(order_id = %order_id, %symbol, "order expired");
        let event_id = self.ids.generate();
        self.emit_order_event(
            order_id,
            OrderEvent::Expired(OrderExpired {
                event_id,
                timestamp: time,
                symbol,
                order_id: order_id.clone(),
                expired_time: time,
            }),
        )
    }
}

impl ExecutionClient for SimulatedExecClient {
    fn connect(&mut self) {
        tracing::info!("connected to the simulated execution client");
    }

    fn disconnect(&mut self) {
        tracing::info!("disconnected from the simulated execution client");
    }

    fn collateral_inquiry(&mut self) -> Result<(), ExecutionError> {
        let snapshot = self.account_snapshot(
            self.account.cash_start_day(),
            self.account.cash_activity_day(),
        );
        self.apply_account_event(snapshot);
        Ok(())
    }

    fn submit_order(
        &mut self,
        order: Order,
        strategy_id: StrategyId,
    ) -> Result<(), ExecutionError> {
        if self.orders.get(order.id()).is_some_and(Order::is_working) {
            return Err(ExecutionError::DuplicateOrder(order.id().clone()));
        }

        let time = self.clock.time_now();
        let order_id = order.id().clone();
        let symbol = order.symbol().clone();
        self.instruments.get(&symbol)?;

        tracing::debug!(order_id = %order_id, %symbol, strategy = %strategy_id, "submit order");
        self.owners.insert(order_id.clone(), strategy_id);
        self.orders.insert(order_id.clone(), order);

        let event_id = self.ids.generate();
        self.emit_order_event(
            &order_id,
            OrderEvent::Submitted(OrderSubmitted {
                event_id,
                timestamp: time,
                symbol: symbol.clone(),
                order_id: order_id.clone(),
                submitted_time: time,
            }),
        )?;
        let event_id = self.ids.generate();
        self.emit_order_event(
            &order_id,
            OrderEvent::Accepted(OrderAccepted {
                event_id,
                timestamp: time,
                symbol: symbol.clone(),
                order_id: order_id.clone(),
                accepted_time: time,
            }),
        )?;

        let closing_ask = self.cursor.closing_ask(&symbol)?;
        let closing_bid = self.cursor.closing_bid(&symbol)?;
        let (side, order_type, quantity, price, time_in_force, expire_time, label) = {
            let order = self
                .orders
                .get(&order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            (
                order.side(),
                order.order_type(),
                order.quantity(),
                order.price(),
                order.time_in_force(),
                order.expire_time(),
                order.label().map(String::from),
            )
        };

        if order_type == OrderType::Market {
            let market_price = match side {
                OrderSide::Buy => closing_ask,
                OrderSide::Sell => closing_bid,
            };
            let fill_price = self.slipped_price(&symbol, side, market_price)?;
            return self.fill_order(&order_id, fill_price, time);
        }

        let price = price.ok_or_else(|| ExecutionError::MissingPrice(order_id.clone()))?;
        if let Some(reason) =
            Self::admission_failure(side, order_type, price, closing_bid, closing_ask)
        {
            tracing::info!(order_id = %order_id, %reason, "order rejected");
            let event_id = self.ids.generate();
            return self.emit_order_event(
                &order_id,
                OrderEvent::Rejected(OrderRejected {
                    event_id,
                    timestamp: time,
                    symbol,
                    order_id: order_id.clone(),
                    rejected_time: time,
                    reason,
                }),
            );
        }

        let event_id = self.ids.generate();
        self.emit_order_event(
            &order_id,
            OrderEvent::Working(OrderWorking {
                event_id,
                timestamp: time,
                symbol,
                order_id: order_id.clone(),
                broker_id: BrokerOrderId::from_order(&order_id),
                label,
                side,
                order_type,
                quantity,
                price,
                time_in_force,
                working_time: time,
                expire_time,
            }),
        )
    }

    fn cancel_order(&mut self, order_id: &OrderId, reason: &str) -> Result<(), ExecutionError> {
        let symbol = {
            let order = self
                .orders
                .get(order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            if !order.is_working() {
                return Err(ExecutionError::OrderNotWorking(order_id.clone()));
            }
            order.symbol().clone()
        };

        let time = self.clock.time_now();
        tracing::info!(order_id = %order_id, %reason, "cancel order");
        let event_id = self.ids.generate();
        self.emit_order_event(
            order_id,
            OrderEvent::Cancelled(OrderCancelled {
                event_id,
                timestamp: time,
                symbol,
                order_id: order_id.clone(),
                cancelled_time: time,
            }),
        )
    }

    fn modify_order(
        &mut self,
        order_id: &OrderId,
        new_price: Price,
    ) -> Result<(), ExecutionError> {
        let (symbol, side, order_type) = {
            let order = self
                .orders
                .get(order_id)
                .ok_or_else(|| ExecutionError::UnknownOrder(order_id.clone()))?;
            if !order.is_working() {
                return Err(ExecutionError::OrderNotWorking(order_id.clone()));
            }
            (order.symbol().clone(), order.side(), order.order_type())
        };

        let time = self.clock.time_now();
        let closing_ask = self.cursor.closing_ask(&symbol)?;
        let closing_bid = self.cursor.closing_bid(&symbol)?;

        // The requested price goes through the same admission predicates
        // as a fresh submit; the order keeps working either way.
        if let Some(reason) =
            Self::admission_failure(side, order_type, new_price, closing_bid, closing_ask)
        {
            tracing::info!(order_id = %order_id, %reason, "modify rejected");
            let event_id = self.ids.generate();
            return self.emit_order_event(
                order_id,
                OrderEvent::CancelReject(OrderCancelReject {
                    event_id,
                    timestamp: time,
                    symbol,
                    order_id: order_id.clone(),
                    rejected_time: time,
                    reason_code: REASON_INVALID_PRICE.to_string(),
                    reason_text: format!("modified {reason}"),
                }),
            );
        }

        tracing::info!(order_id = %order_id, price = %new_price, "order modified");
        let event_id = self.ids.generate();
        self.emit_order_event(
            order_id,
            OrderEvent::Modified(OrderModified {
                event_id,
                timestamp: time,
                symbol,
                order_id: order_id.clone(),
                broker_id: BrokerOrderId::from_order(order_id),
                new_price,
                modified_time: time,
            }),
        )
    }
}
