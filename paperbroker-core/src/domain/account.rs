//! Account ledger — a snapshot mutated only by account events.

use crate::domain::ids::AccountId;
use crate::domain::price::Money;
use crate::events::AccountEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SIMULATED_BROKER: &str = "SIMULATED";

/// The run's single account. The simulator constructs `AccountEvent`s;
/// applying one overwrites the snapshot fields. No ledger math happens
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    broker: String,
    account_number: String,
    currency: String,
    cash_balance: Money,
    cash_start_day: Money,
    cash_activity_day: Money,
    margin_used_liquidation: Money,
    margin_used_maintenance: Money,
    margin_ratio: Decimal,
    margin_call_status: String,
    event_count: usize,
}

impl Account {
    pub fn new(
        id: AccountId,
        account_number: impl Into<String>,
        currency: impl Into<String>,
        starting_capital: Money,
    ) -> Self {
        Self {
            id,
            broker: SIMULATED_BROKER.to_string(),
            account_number: account_number.into(),
            currency: currency.into(),
            cash_balance: starting_capital,
            cash_start_day: starting_capital,
            cash_activity_day: Money::zero(),
            margin_used_liquidation: Money::zero(),
            margin_used_maintenance: Money::zero(),
            margin_ratio: Decimal::ZERO,
            margin_call_status: String::new(),
            event_count: 0,
        }
    }

    /// Overwrite the snapshot with the event's values.
    pub fn apply(&mut self, event: &AccountEvent) {
        debug_assert_eq!(event.account_id, self.id);
        self.cash_balance = event.cash_balance;
        self.cash_start_day = event.cash_start_day;
        self.cash_activity_day = event.cash_activity_day;
        self.margin_used_liquidation = event.margin_used_liquidation;
        self.margin_used_maintenance = event.margin_used_maintenance;
        self.margin_ratio = event.margin_ratio;
        self.margin_call_status = event.margin_call_status.clone();
        self.event_count += 1;
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn cash_balance(&self) -> Money {
        self.cash_balance
    }

    pub fn cash_start_day(&self) -> Money {
        self.cash_start_day
    }

    pub fn cash_activity_day(&self) -> Money {
        self.cash_activity_day
    }

    pub fn margin_used_liquidation(&self) -> Money {
        self.margin_used_liquidation
    }

    pub fn margin_used_maintenance(&self) -> Money {
        self.margin_used_maintenance
    }

    pub fn margin_ratio(&self) -> Decimal {
        self.margin_ratio
    }

    pub fn margin_call_status(&self) -> &str {
        &self.margin_call_status
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::EventId;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn account() -> Account {
        Account::new(
            AccountId::new("SIMULATED-001"),
            "001",
            "USD",
            Money::new(dec!(1000000)),
        )
    }

    fn snapshot(account: &Account, cash_start_day: Money) -> AccountEvent {
        AccountEvent {
            event_id: EventId::new("ev-account"),
            timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            account_id: account.id().clone(),
            broker: account.broker().to_string(),
            account_number: account.account_number().to_string(),
            currency: account.currency().to_string(),
            cash_balance: account.cash_balance(),
            cash_start_day,
            cash_activity_day: Money::zero(),
            margin_used_liquidation: Money::zero(),
            margin_used_maintenance: Money::zero(),
            margin_ratio: Decimal::ZERO,
            margin_call_status: String::new(),
        }
    }

    #[test]
    fn new_account_starts_at_capital() {
        let account = account();
        assert_eq!(account.broker(), "SIMULATED");
        assert_eq!(account.cash_balance(), Money::new(dec!(1000000)));
        assert_eq!(account.cash_start_day(), Money::new(dec!(1000000)));
        assert_eq!(account.event_count(), 0);
    }

    #[test]
    fn apply_overwrites_snapshot_fields() {
        let mut account = account();
        let event = snapshot(&account, Money::new(dec!(999500)));
        account.apply(&event);

        assert_eq!(account.cash_start_day(), Money::new(dec!(999500)));
        assert_eq!(account.event_count(), 1);
    }
}
