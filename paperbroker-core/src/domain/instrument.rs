//! Instrument metadata and the immutable catalogue keyed by symbol.

use crate::domain::ids::Symbol;
use crate::domain::price::{Price, PriceError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("duplicate instrument symbol {0}")]
    DuplicateSymbol(Symbol),

    #[error("unknown instrument symbol {0}")]
    UnknownSymbol(Symbol),
}

/// Per-symbol trading metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    /// Smallest price increment, at the instrument's precision.
    pub tick_size: Price,
    /// Number of fractional digits in any price for this symbol.
    pub tick_precision: u32,
}

impl Instrument {
    pub fn new(symbol: Symbol, tick_size: Price, tick_precision: u32) -> Self {
        Self {
            symbol,
            tick_size,
            tick_precision,
        }
    }

    /// Quantise a raw floating-point value to this instrument's precision.
    pub fn make_price(&self, value: f64) -> Result<Price, PriceError> {
        Price::from_f64(value, self.tick_precision)
    }
}

/// Immutable instrument container, built once and handed to the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentCatalogue {
    instruments: IndexMap<Symbol, Instrument>,
}

impl InstrumentCatalogue {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, CatalogueError> {
        let mut map = IndexMap::with_capacity(instruments.len());
        for instrument in instruments {
            let symbol = instrument.symbol.clone();
            if map.insert(symbol.clone(), instrument).is_some() {
                return Err(CatalogueError::DuplicateSymbol(symbol));
            }
        }
        Ok(Self { instruments: map })
    }

    pub fn get(&self, symbol: &Symbol) -> Result<&Instrument, CatalogueError> {
        self.instruments
            .get(symbol)
            .ok_or_else(|| CatalogueError::UnknownSymbol(symbol.clone()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.instruments.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eurusd() -> Instrument {
        Instrument::new(
            Symbol::new("EURUSD"),
            Price::from_f64(0.0001, 4).unwrap(),
            4,
        )
    }

    #[test]
    fn make_price_quantises_to_instrument_precision() {
        let instrument = eurusd();
        let price = instrument.make_price(1.10006).unwrap();
        assert_eq!(price.to_string(), "1.1001");
    }

    #[test]
    fn catalogue_rejects_duplicate_symbols() {
        let result = InstrumentCatalogue::new(vec![eurusd(), eurusd()]);
        assert!(matches!(result, Err(CatalogueError::DuplicateSymbol(_))));
    }

    #[test]
    fn catalogue_lookup() {
        let catalogue = InstrumentCatalogue::new(vec![eurusd()]).unwrap();
        assert!(catalogue.get(&Symbol::new("EURUSD")).is_ok());
        assert!(matches!(
            catalogue.get(&Symbol::new("GBPUSD")),
            Err(CatalogueError::UnknownSymbol(_))
        ));
        assert_eq!(catalogue.len(), 1);
    }
}
