use alloy::primitives::{Address, B256};
use serde::Serialize;

use super::primitives::{BidId, BlockNumber, CurrencyAmount, Price, TokenAmount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BidStatus {
    /// Max price above the clearing price: filling every checkpoint.
    ITM,
    /// Max price at the clearing price: competing pro-rata at its tick.
    ATM,
    /// Max price below the clearing price.
    OTM,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: BidId,
    pub owner: Address,
    pub amount: CurrencyAmount,
    pub max_price: Price,
    /// Submission block, also the checkpoint fills are measured from.
    pub start_block: BlockNumber,
    pub tx_hash: B256,
    pub tokens_filled: TokenAmount,
    pub amount_filled: CurrencyAmount,
    pub last_fully_filled_checkpoint_block: BlockNumber,
    pub outbid_checkpoint_block: Option<BlockNumber>,
    pub exited: bool,
    pub exited_block: Option<BlockNumber>,
    pub exit_tx_hash: Option<B256>,
    pub claimed: bool,
    pub claimed_block: Option<BlockNumber>,
    pub claim_tx_hash: Option<B256>,
    pub tokens_claimed: TokenAmount,
    pub amount_refunded: CurrencyAmount,
}

impl Bid {
    pub fn new(
        id: BidId,
        owner: Address,
        amount: CurrencyAmount,
        max_price: Price,
        start_block: BlockNumber,
        tx_hash: B256,
    ) -> Self {
        Self {
            id,
            owner,
            amount,
            max_price,
            start_block,
            tx_hash,
            tokens_filled: TokenAmount::ZERO,
            amount_filled: CurrencyAmount::ZERO,
            last_fully_filled_checkpoint_block: start_block,
            outbid_checkpoint_block: None,
            exited: false,
            exited_block: None,
            exit_tx_hash: None,
            claimed: false,
            claimed_block: None,
            claim_tx_hash: None,
            tokens_claimed: TokenAmount::ZERO,
            amount_refunded: CurrencyAmount::ZERO,
        }
    }

    pub fn status(&self, clearing_price: Price) -> BidStatus {
        if self.max_price > clearing_price {
            BidStatus::ITM
        } else if self.max_price == clearing_price {
            BidStatus::ATM
        } else {
            BidStatus::OTM
        }
    }

    pub fn is_outbid(&self) -> bool {
        self.outbid_checkpoint_block.is_some()
    }

    /// Still eligible for fill updates.
    pub fn is_filling(&self) -> bool {
        !self.exited && !self.is_outbid()
    }
}
