use alloy::primitives::U256;
use serde::Serialize;

use super::primitives::{BlockNumber, Mps, Price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub block: BlockNumber,
    pub clearing_price: Price,
    pub cumulative_mps: Mps,
    /// Running sum of mps / price, Q96.
    pub cumulative_mps_per_price: U256,
    /// Currency raised at the clearing price so far, Q96 scaled by 1e7.
    pub currency_raised_at_clearing_price_x7: U256,
}

impl Checkpoint {
    pub fn remaining_mps(&self) -> Mps {
        self.cumulative_mps.remaining()
    }

    pub fn is_sold_out(&self) -> bool {
        self.cumulative_mps.is_sold_out()
    }
}
