use alloy::primitives::{Address, B256, Bytes};

use super::primitives::{BidId, BlockNumber, CurrencyAmount, Mps, Price, TokenAmount};

/// Position of a log in the chain's total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct EventPosition {
    pub block: BlockNumber,
    pub log_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    pub block: BlockNumber,
    pub log_index: u64,
    pub tx_hash: B256,
}

impl EventMeta {
    pub fn position(&self) -> EventPosition {
        EventPosition {
            block: self.block,
            log_index: self.log_index,
        }
    }
}

/// A decoded log from the factory or from one of its auctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionEvent {
    /// Contract that emitted the log.
    pub emitter: Address,
    pub meta: EventMeta,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    AuctionCreated {
        auction: Address,
        token: Address,
        amount: TokenAmount,
        config_data: Bytes,
    },
    StepRecorded {
        start_block: BlockNumber,
        end_block: BlockNumber,
        mps: u32,
    },
    TickInitialized {
        price: Price,
    },
    BidSubmitted {
        id: BidId,
        owner: Address,
        price: Price,
        amount: CurrencyAmount,
    },
    CheckpointUpdated {
        block: BlockNumber,
        clearing_price: Price,
        cumulative_mps: Mps,
    },
    BidExited {
        bid_id: BidId,
        owner: Address,
        tokens_filled: TokenAmount,
        currency_refunded: CurrencyAmount,
    },
    TokensClaimed {
        bid_id: BidId,
        owner: Address,
        tokens_filled: TokenAmount,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AuctionCreated { .. } => "AuctionCreated",
            EventKind::StepRecorded { .. } => "AuctionStepRecorded",
            EventKind::TickInitialized { .. } => "TickInitialized",
            EventKind::BidSubmitted { .. } => "BidSubmitted",
            EventKind::CheckpointUpdated { .. } => "CheckpointUpdated",
            EventKind::BidExited { .. } => "BidExited",
            EventKind::TokensClaimed { .. } => "TokensClaimed",
        }
    }
}

impl AuctionEvent {
    /// The auction whose state this event belongs to. Factory events name it
    /// in their payload, everything else is scoped by the emitter.
    pub fn auction(&self) -> Address {
        match &self.kind {
            EventKind::AuctionCreated { auction, .. } => *auction,
            _ => self.emitter,
        }
    }

    pub fn position(&self) -> EventPosition {
        self.meta.position()
    }

    pub fn is_creation(&self) -> bool {
        matches!(self.kind, EventKind::AuctionCreated { .. })
    }
}
