//! OHLC bars, quantised bar series, and quote ticks.

use crate::domain::instrument::Instrument;
use crate::domain::price::{Price, PriceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarError {
    #[error("invalid bar range: high {high} below low {low}")]
    InvalidRange { high: Price, low: Price },

    #[error("open price outside high/low range")]
    OpenOutOfRange,

    #[error("close price outside high/low range")]
    CloseOutOfRange,

    #[error(transparent)]
    Price(#[from] PriceError),
}

/// Single OHLC bar at the instrument's precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

impl Bar {
    pub fn new(open: Price, high: Price, low: Price, close: Price) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Validate bar invariants.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.high < self.low {
            return Err(BarError::InvalidRange {
                high: self.high,
                low: self.low,
            });
        }
        if self.open < self.low || self.open > self.high {
            return Err(BarError::OpenOutOfRange);
        }
        if self.close < self.low || self.close > self.high {
            return Err(BarError::CloseOutOfRange);
        }
        Ok(())
    }
}

/// A single bid/ask quote observation. Tick series are accepted alongside
/// bar frames for interface parity with the live client; the fill logic
/// consumes bars only, so tick maps may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bid: Price,
    pub ask: Price,
}

/// Dense per-symbol bar sequence, aligned to the shared datetime index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Quantise raw floating-point OHLC rows to the instrument's tick
    /// precision and validate every bar.
    pub fn from_rows(instrument: &Instrument, rows: &[[f64; 4]]) -> Result<Self, BarError> {
        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let bar = Bar::new(
                instrument.make_price(row[0])?,
                instrument.make_price(row[1])?,
                instrument.make_price(row[2])?,
                instrument.make_price(row[3])?,
            );
            bar.validate()?;
            bars.push(bar);
        }
        Ok(Self { bars })
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
