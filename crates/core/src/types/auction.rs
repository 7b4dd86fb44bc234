use alloy::primitives::{Address, U256};
use serde::Serialize;

use super::{
    event::EventPosition,
    primitives::{BlockNumber, CurrencyAmount, Mps, Price, TickSpacing, TokenAmount},
    step::CurrentStep,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuctionPhase {
    NotStarted,
    Active,
    Ended,
    Claimable,
}

/// One row per auction deployed by the factory. The first block of fields is
/// configuration, the rest is derived from the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub address: Address,
    pub token: Address,
    pub currency: Address,
    pub tokens_recipient: Address,
    pub funds_recipient: Address,
    pub amount: TokenAmount,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub claim_block: BlockNumber,
    pub total_supply: TokenAmount,
    pub floor_price: Price,
    pub tick_spacing: TickSpacing,
    pub validation_hook: Option<Address>,
    pub required_currency_raised: CurrencyAmount,
    pub created_at: BlockNumber,

    pub last_checkpointed_block: BlockNumber,
    pub last_clearing_price: Price,
    pub currency_raised: CurrencyAmount,
    pub total_cleared: TokenAmount,
    pub cumulative_mps: Mps,
    pub remaining_mps: Mps,
    pub available_supply: TokenAmount,
    pub current_step: Option<CurrentStep>,
    pub num_bids: u64,
    pub num_bidders: u64,
    pub total_bid_amount: CurrencyAmount,
    /// Last auction-emitted log applied to this row.
    pub last_event: Option<EventPosition>,
}

impl Auction {
    /// A freshly created row with every derived field at its starting value.
    pub fn new(address: Address, token: Address, amount: TokenAmount, created_at: BlockNumber) -> Self {
        Self {
            address,
            token,
            currency: Address::ZERO,
            tokens_recipient: Address::ZERO,
            funds_recipient: Address::ZERO,
            amount,
            start_block: BlockNumber::ZERO,
            end_block: BlockNumber::ZERO,
            claim_block: BlockNumber::ZERO,
            total_supply: TokenAmount::ZERO,
            floor_price: Price::ZERO,
            tick_spacing: TickSpacing::ZERO,
            validation_hook: None,
            required_currency_raised: CurrencyAmount::ZERO,
            created_at,
            last_checkpointed_block: BlockNumber::ZERO,
            last_clearing_price: Price::ZERO,
            currency_raised: CurrencyAmount::ZERO,
            total_cleared: TokenAmount::ZERO,
            cumulative_mps: Mps::ZERO,
            remaining_mps: Mps::FULL,
            available_supply: TokenAmount::ZERO,
            current_step: None,
            num_bids: 0,
            num_bidders: 0,
            total_bid_amount: CurrencyAmount::ZERO,
            last_event: None,
        }
    }

    /// Total supply is the backfill marker: the contract never reports zero
    /// once deployed.
    pub fn needs_backfill(&self) -> bool {
        self.total_supply.is_zero()
    }

    pub fn is_graduated(&self) -> bool {
        self.currency_raised >= self.required_currency_raised
    }

    pub fn phase(&self, current_block: BlockNumber) -> AuctionPhase {
        if current_block < self.start_block {
            AuctionPhase::NotStarted
        } else if current_block < self.end_block {
            AuctionPhase::Active
        } else if current_block < self.claim_block {
            AuctionPhase::Ended
        } else {
            AuctionPhase::Claimable
        }
    }

    /// Supply not yet committed by the emission schedule, recomputed after
    /// each checkpoint.
    pub(crate) fn refresh_available_supply(&mut self) {
        let remaining = U256::from(self.remaining_mps.as_u32());
        self.available_supply = if remaining.is_zero() {
            TokenAmount::ZERO
        } else {
            let supply = self.total_supply.as_u256();
            TokenAmount::new(supply - supply / remaining)
        };
    }
}
