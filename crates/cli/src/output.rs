//! JSON rendering of store snapshots.

use alloy::primitives::U256;
use mirror_core::{
    Auction, AuctionDetail, AuctionPhase, Bid, BidStatus, BlockNumber, Checkpoint, Price, Step,
    Tick, math::RESOLUTION,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Fractional digits kept when showing Q96 prices.
const PRICE_SCALE: u32 = 12;

/// Largest mantissa a `Decimal` can hold.
const DECIMAL_MANTISSA_BITS: usize = 96;

/// Q96 price as a raw currency-per-token ratio, in base units of each side.
/// `None` when the value does not fit a `Decimal`.
pub fn q96_to_decimal(price: Price) -> Option<Decimal> {
    if price.is_sentinel() {
        return None;
    }
    let scaled = price
        .as_u256()
        .checked_mul(U256::from(10u64).pow(U256::from(PRICE_SCALE)))?
        >> RESOLUTION;
    if scaled.bit_len() > DECIMAL_MANTISSA_BITS {
        return None;
    }
    let mantissa = i128::try_from(scaled.to::<u128>()).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, PRICE_SCALE)
        .ok()
        .map(|value| value.normalize())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    #[serde(flatten)]
    pub auction: Auction,
    pub phase: AuctionPhase,
    pub graduated: bool,
    pub clearing_price_ratio: Option<Decimal>,
    pub floor_price_ratio: Option<Decimal>,
}

impl AuctionView {
    pub fn new(auction: Auction, head: BlockNumber) -> Self {
        Self {
            phase: auction.phase(head),
            graduated: auction.is_graduated(),
            clearing_price_ratio: q96_to_decimal(auction.last_clearing_price),
            floor_price_ratio: q96_to_decimal(auction.floor_price),
            auction,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    #[serde(flatten)]
    pub bid: Bid,
    /// Position against the auction's current clearing price.
    pub status: BidStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetailView {
    #[serde(flatten)]
    pub auction: AuctionView,
    pub bids: Vec<BidView>,
    pub checkpoints: Vec<Checkpoint>,
    pub steps: Vec<Step>,
    pub ticks: Vec<Tick>,
    pub halted: Option<String>,
}

impl AuctionDetailView {
    pub fn new(detail: AuctionDetail, ticks: Vec<Tick>, head: BlockNumber) -> Self {
        let AuctionDetail {
            auction,
            bids,
            checkpoints,
            steps,
            halted,
        } = detail;
        let clearing_price = auction.last_clearing_price;

        Self {
            auction: AuctionView::new(auction, head),
            bids: bids
                .into_iter()
                .map(|bid| BidView {
                    status: bid.status(clearing_price),
                    bid,
                })
                .collect(),
            checkpoints,
            steps,
            ticks,
            halted,
        }
    }
}

/// Pretty JSON for terminal output.
pub fn render<T: Serialize>(value: &T) -> eyre::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
