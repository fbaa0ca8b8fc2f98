//! Property tests for price quantisation and the order state machine.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use paperbroker_core::domain::{
    BrokerOrderId, EventId, ExecutionId, ExecutionTicket, Order, OrderId, OrderSide, OrderStatus,
    Price, Quantity, Symbol, TimeInForce,
};
use paperbroker_core::events::{
    OrderAccepted, OrderCancelled, OrderEvent, OrderExpired, OrderFilled, OrderSubmitted,
    OrderWorking,
};

// ─── Quantisation ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn quantised_price_carries_exactly_the_tick_precision(
        value in 0.0001f64..10_000.0,
        precision in 0u32..8,
    ) {
        let price = Price::from_f64(value, precision).unwrap();
        prop_assert_eq!(price.value().scale(), precision);
        prop_assert_eq!(price.precision(), precision);
    }

    #[test]
    fn quantisation_is_idempotent(
        value in 0.0001f64..10_000.0,
        precision in 0u32..8,
    ) {
        let once = Price::from_f64(value, precision).unwrap();
        let twice = Price::new(once.value(), precision);
        prop_assert_eq!(once, twice);
    }
}

// ─── Order state machine ──────────────────────────────────────────────

fn order() -> Order {
    Order::stop_market(
        OrderId::new("O-1"),
        Symbol::new("EURUSD"),
        OrderSide::Buy,
        Quantity::new(100_000),
        Price::from_f64(1.1010, 4).unwrap(),
        TimeInForce::Gtc,
        None,
        None,
    )
    .unwrap()
}

fn event_for(order: &Order, code: u8) -> OrderEvent {
    let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let event_id = EventId::new(format!("ev-{code}"));
    let symbol = order.symbol().clone();
    let order_id = order.id().clone();
    match code % 6 {
        0 => OrderEvent::Submitted(OrderSubmitted {
            event_id,
            timestamp: t,
            symbol,
            order_id,
            submitted_time: t,
        }),
        1 => OrderEvent::Accepted(OrderAccepted {
            event_id,
            timestamp: t,
            symbol,
            order_id,
            accepted_time: t,
        }),
        2 => OrderEvent::Working(OrderWorking {
            event_id,
            timestamp: t,
            symbol,
            order_id: order_id.clone(),
            broker_id: BrokerOrderId::from_order(&order_id),
            label: None,
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price().unwrap(),
            time_in_force: order.time_in_force(),
            working_time: t,
            expire_time: None,
        }),
        3 => OrderEvent::Cancelled(OrderCancelled {
            event_id,
            timestamp: t,
            symbol,
            order_id,
            cancelled_time: t,
        }),
        4 => OrderEvent::Expired(OrderExpired {
            event_id,
            timestamp: t,
            symbol,
            order_id,
            expired_time: t,
        }),
        _ => OrderEvent::Filled(OrderFilled {
            event_id,
            timestamp: t,
            symbol,
            order_id: order_id.clone(),
            execution_id: ExecutionId::from_order(&order_id),
            execution_ticket: ExecutionTicket::from_order(&order_id),
            side: order.side(),
            quantity: order.quantity(),
            fill_price: Price::from_f64(1.1011, 4).unwrap(),
            execution_time: t,
        }),
    }
}

proptest! {
    /// Whatever sequence of events arrives, a rejected apply leaves the
    /// order untouched and a terminal order accepts nothing further.
    #[test]
    fn random_event_sequences_never_corrupt_an_order(codes in prop::collection::vec(0u8..6, 1..24)) {
        let mut order = order();
        for code in codes {
            let before = order.status();
            let was_complete = order.is_complete();
            let event = event_for(&order, code);
            match order.apply(&event) {
                Ok(()) => {
                    prop_assert!(!was_complete, "terminal order accepted {}", event.kind());
                }
                Err(_) => {
                    prop_assert_eq!(before, order.status());
                }
            }
        }
    }

    /// A filled order must have passed through Submitted and Accepted.
    #[test]
    fn fills_only_happen_after_acceptance(codes in prop::collection::vec(0u8..6, 1..24)) {
        let mut order = order();
        let mut seen_accepted = false;
        for code in codes {
            let event = event_for(&order, code);
            let is_accept = matches!(event, OrderEvent::Accepted(_));
            if order.apply(&event).is_ok() {
                seen_accepted |= is_accept;
                if order.status() == OrderStatus::Filled {
                    prop_assert!(seen_accepted);
                }
            }
        }
    }
}
