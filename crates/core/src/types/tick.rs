use serde::Serialize;

use super::primitives::{CurrencyAmount, Price};

/// A price level. `next_price` is a key into the same auction's ticks, never
/// an owning link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub price: Price,
    pub next_price: Price,
    pub currency_demand: CurrencyAmount,
    pub num_bids: u32,
}

impl Tick {
    pub fn is_last(&self) -> bool {
        self.next_price.is_sentinel()
    }
}
