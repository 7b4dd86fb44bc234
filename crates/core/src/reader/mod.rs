//! Point-in-time reads of auction contract state.
//!
//! Every read is pinned to the block of the event that triggered it, so the
//! values match what the contract held when the log was emitted.

pub mod rpc;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::{
    error::ReadError,
    types::primitives::{BlockNumber, CurrencyAmount, Mps, Price, TickSpacing, TokenAmount},
};

pub use rpc::RpcReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionConfigSnapshot {
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub claim_block: BlockNumber,
    pub floor_price: Price,
    pub tick_spacing: TickSpacing,
    pub total_supply: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSnapshot {
    pub next: Price,
    pub currency_demand_q96: U256,
}

impl TickSnapshot {
    pub fn currency_demand(&self) -> CurrencyAmount {
        CurrencyAmount::from_q96(self.currency_demand_q96)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointSnapshot {
    pub clearing_price: Price,
    pub cumulative_mps: Mps,
    pub cumulative_mps_per_price: U256,
    pub currency_raised_at_clearing_price_x7: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionTotals {
    pub currency_raised: CurrencyAmount,
    pub total_cleared: TokenAmount,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn auction_config(
        &self,
        auction: Address,
        at: BlockNumber,
    ) -> Result<AuctionConfigSnapshot, ReadError>;

    /// Packed step records, without any storage prefix. Empty when the
    /// pointer holds no data.
    async fn steps_data(&self, auction: Address, at: BlockNumber) -> Result<Bytes, ReadError>;

    async fn tick(
        &self,
        auction: Address,
        price: Price,
        at: BlockNumber,
    ) -> Result<TickSnapshot, ReadError>;

    async fn checkpoint(
        &self,
        auction: Address,
        checkpoint_block: BlockNumber,
        at: BlockNumber,
    ) -> Result<CheckpointSnapshot, ReadError>;

    async fn totals(&self, auction: Address, at: BlockNumber) -> Result<AuctionTotals, ReadError>;
}
