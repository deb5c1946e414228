//! Catalog Service - price lookup at order creation
//!
//! Orders copy `{name, unitPrice}` when they are created and never look the
//! catalog up again, so later price changes leave existing orders alone.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Price snapshot source
pub trait Catalog: Send + Sync {
    /// Current unit price of `name`, if the catalog knows it
    fn unit_price(&self, name: &str) -> Option<Decimal>;
}

/// In-memory catalog keyed by product name
#[derive(Debug, Default)]
pub struct CatalogService {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let service = Self::new();
        {
            let mut map = service.prices.write();
            for (name, price) in prices {
                map.insert(name.into(), price);
            }
        }
        service
    }

    /// Insert or replace a price
    pub fn set_price(&self, name: impl Into<String>, price: Decimal) {
        self.prices.write().insert(name.into(), price);
    }

    pub fn remove(&self, name: &str) -> Option<Decimal> {
        self.prices.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}

impl Catalog for CatalogService {
    fn unit_price(&self, name: &str) -> Option<Decimal> {
        self.prices.read().get(name).copied()
    }
}
