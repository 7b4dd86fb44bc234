//! Read-only views over the store.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    ledger::AuctionLedger,
    store::MemoryStore,
    types::{auction::Auction, bid::Bid, checkpoint::Checkpoint, step::Step, tick::Tick},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct BidQuery {
    pub owner: Option<Address>,
    pub order: Order,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    pub auction: Auction,
    /// Most recent first.
    pub bids: Vec<Bid>,
    /// Most recent first.
    pub checkpoints: Vec<Checkpoint>,
    pub steps: Vec<Step>,
    pub halted: Option<String>,
}

fn ordered<T>(mut items: Vec<T>, order: Order) -> Vec<T> {
    if order == Order::Desc {
        items.reverse();
    }
    items
}

fn bids_by_submission(ledger: &AuctionLedger) -> Vec<&Bid> {
    let mut bids: Vec<&Bid> = ledger.bids.values().collect();
    bids.sort_by_key(|bid| (bid.start_block, bid.id));
    bids
}

impl MemoryStore {
    /// All auctions ordered by creation block.
    pub async fn auctions(&self, order: Order) -> Vec<Auction> {
        let auctions = self
            .with_all(|ledgers| {
                let mut auctions: Vec<Auction> =
                    ledgers.values().map(|ledger| ledger.auction.clone()).collect();
                auctions.sort_by_key(|auction| (auction.created_at, auction.address));
                auctions
            })
            .await;
        ordered(auctions, order)
    }

    pub async fn auction(&self, address: Address) -> Result<Auction, StoreError> {
        self.read(address, |ledger| ledger.auction.clone()).await
    }

    pub async fn auction_detail(
        &self,
        address: Address,
        recent_bids: usize,
        recent_checkpoints: usize,
    ) -> Result<AuctionDetail, StoreError> {
        self.read(address, |ledger| AuctionDetail {
            auction: ledger.auction.clone(),
            bids: bids_by_submission(ledger)
                .into_iter()
                .rev()
                .take(recent_bids)
                .cloned()
                .collect(),
            checkpoints: ledger
                .checkpoints
                .values()
                .rev()
                .take(recent_checkpoints)
                .copied()
                .collect(),
            steps: ledger.steps.clone(),
            halted: ledger.halted.clone(),
        })
        .await
    }

    /// Bids of one auction ordered by submission block.
    pub async fn bids(&self, address: Address, query: BidQuery) -> Result<Vec<Bid>, StoreError> {
        self.read(address, |ledger| {
            let matching = bids_by_submission(ledger)
                .into_iter()
                .filter(|bid| query.owner.is_none_or(|owner| bid.owner == owner))
                .cloned()
                .collect();
            let mut bids = ordered(matching, query.order);
            if let Some(limit) = query.limit {
                bids.truncate(limit);
            }
            bids
        })
        .await
    }

    /// Ticks in linked order, lowest price first.
    pub async fn ticks(&self, address: Address) -> Result<Vec<Tick>, StoreError> {
        self.read(address, AuctionLedger::ticks_in_order).await
    }

    pub async fn steps(&self, address: Address) -> Result<Vec<Step>, StoreError> {
        self.read(address, |ledger| ledger.steps.clone()).await
    }

    pub async fn checkpoints(&self, address: Address) -> Result<Vec<Checkpoint>, StoreError> {
        self.read(address, |ledger| ledger.checkpoints.values().copied().collect())
            .await
    }
}
