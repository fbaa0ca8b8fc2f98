//! Bar cursor — random access into precomputed per-symbol OHLC series.
//!
//! Bid and ask series for every symbol are dense arrays aligned to one
//! shared datetime index. The cursor tracks the current iteration; the
//! simulator advances it once per stepped timestamp.

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::ids::Symbol;
use crate::domain::price::Price;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("datetime index is empty")]
    EmptyIndex,

    #[error("step must be positive")]
    InvalidStep,

    #[error("no bar data for symbol {0}")]
    UnknownSymbol(Symbol),

    #[error("series for {symbol} has {actual} bars, index has {expected}")]
    LengthMismatch {
        symbol: Symbol,
        expected: usize,
        actual: usize,
    },

    #[error("bid and ask series cover different symbol sets")]
    SymbolSetMismatch,

    #[error("iteration {iteration} past end of index ({len} entries)")]
    IndexExhausted { iteration: usize, len: usize },
}

/// Which side of the book a series describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteSide {
    Bid,
    Ask,
}

/// Random-access view over the bar data, stepped by the simulator.
#[derive(Debug, Clone)]
pub struct BarCursor {
    index: Vec<DateTime<Utc>>,
    bid: IndexMap<Symbol, BarSeries>,
    ask: IndexMap<Symbol, BarSeries>,
    iteration: usize,
}

impl BarCursor {
    pub fn new(
        index: Vec<DateTime<Utc>>,
        bid: IndexMap<Symbol, BarSeries>,
        ask: IndexMap<Symbol, BarSeries>,
    ) -> Result<Self, CursorError> {
        if index.is_empty() {
            return Err(CursorError::EmptyIndex);
        }
        if bid.len() != ask.len() || bid.keys().any(|symbol| !ask.contains_key(symbol)) {
            return Err(CursorError::SymbolSetMismatch);
        }
        for (symbol, series) in bid.iter().chain(ask.iter()) {
            if series.len() != index.len() {
                return Err(CursorError::LengthMismatch {
                    symbol: symbol.clone(),
                    expected: index.len(),
                    actual: series.len(),
                });
            }
        }
        Ok(Self {
            index,
            bid,
            ask,
            iteration: 0,
        })
    }

    /// Wind the cursor forward to the strategy's warm-up point.
    ///
    /// An internal wall clock starts at `index[0]` and advances in `step`
    /// increments until it reaches `to_time`; each time it lands exactly
    /// on the next index entry the iteration advances. If `to_time`
    /// precedes `index[0]` no steps are produced. Returns the final
    /// wall-clock value for the caller to install on the injected clock.
    pub fn set_initial_iteration(
        &mut self,
        to_time: DateTime<Utc>,
        step: Duration,
    ) -> Result<DateTime<Utc>, CursorError> {
        if step <= Duration::zero() {
            return Err(CursorError::InvalidStep);
        }
        let mut wall_clock = self.index[0];
        while wall_clock < to_time {
            wall_clock += step;
            if let Some(next) = self.index.get(self.iteration + 1) {
                if wall_clock == *next {
                    self.iteration += 1;
                }
            }
        }
        Ok(wall_clock)
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Index timestamp of the current iteration.
    pub fn timestamp(&self) -> Result<DateTime<Utc>, CursorError> {
        self.index
            .get(self.iteration)
            .copied()
            .ok_or(CursorError::IndexExhausted {
                iteration: self.iteration,
                len: self.index.len(),
            })
    }

    /// Step to the next iteration.
    pub fn advance(&mut self) {
        self.iteration += 1;
    }

    // ── Current-bar accessors ──────────────────────────────────────────

    pub fn highest_bid(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Bid, symbol)?.high)
    }

    pub fn lowest_bid(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Bid, symbol)?.low)
    }

    pub fn closing_bid(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Bid, symbol)?.close)
    }

    pub fn highest_ask(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Ask, symbol)?.high)
    }

    pub fn lowest_ask(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Ask, symbol)?.low)
    }

    pub fn closing_ask(&self, symbol: &Symbol) -> Result<Price, CursorError> {
        Ok(self.bar(QuoteSide::Ask, symbol)?.close)
    }

    fn bar(&self, side: QuoteSide, symbol: &Symbol) -> Result<&Bar, CursorError> {
        let series = match side {
            QuoteSide::Bid => &self.bid,
            QuoteSide::Ask => &self.ask,
        };
        let series = series
            .get(symbol)
            .ok_or_else(|| CursorError::UnknownSymbol(symbol.clone()))?;
        series
            .get(self.iteration)
            .ok_or(CursorError::IndexExhausted {
                iteration: self.iteration,
                len: self.index.len(),
            })
    }
}
