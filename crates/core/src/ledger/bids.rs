use alloy::primitives::B256;
use tracing::{debug, warn};

use crate::{
    error::{ConsistencyError, Error},
    types::{
        bid::Bid,
        checkpoint::Checkpoint,
        event::EventMeta,
        primitives::{BidId, BlockNumber, CurrencyAmount, Price, TokenAmount},
    },
};

use super::{
    AuctionLedger, Reads,
    fills::{self, FillUpdate},
    ticks::TickEffect,
};

#[derive(Debug, Clone)]
pub(crate) struct BidEffect {
    bid: Bid,
    tick: TickEffect,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ExitEffect {
    bid: BidId,
    block: BlockNumber,
    tx_hash: B256,
    tokens_filled: TokenAmount,
    currency_refunded: CurrencyAmount,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ClaimEffect {
    bid: BidId,
    block: BlockNumber,
    tx_hash: B256,
    tokens_filled: TokenAmount,
}

/// Bid changes caused by one checkpoint.
#[derive(Debug, Clone, Default)]
pub(crate) struct FillPlan {
    pub(crate) updates: Vec<FillUpdate>,
    pub(crate) outbid: Vec<BidId>,
}

impl AuctionLedger {
    pub(crate) fn submit_bid(&self, bid: Bid, reads: &Reads) -> Result<BidEffect, Error> {
        let tick = self.upsert_tick(bid.max_price, reads)?;
        Ok(BidEffect { bid, tick })
    }

    pub(crate) fn commit_bid(&mut self, effect: BidEffect) {
        let BidEffect { bid, tick } = effect;
        self.commit_tick(tick);

        let auction = &mut self.auction;
        auction.num_bids += 1;
        auction.total_bid_amount = auction.total_bid_amount.saturating_add(bid.amount);
        self.bidders.insert(bid.owner);
        auction.num_bidders = self.bidders.len() as u64;

        self.bids.insert(bid.id, bid);
    }

    /// Whether any bid still filling sits exactly at `clearing_price`.
    pub(crate) fn has_marginal_bids(&self, clearing_price: Price) -> bool {
        self.bids
            .values()
            .any(|bid| bid.max_price == clearing_price && bid.is_filling())
    }

    fn reference_checkpoint(&self, bid: &Bid) -> Result<&Checkpoint, ConsistencyError> {
        self.checkpoints
            .get(&bid.start_block)
            .ok_or(ConsistencyError::MissingCheckpoint {
                bid: bid.id,
                block: bid.start_block,
            })
    }

    /// Recomputes fills for every bid still in play against `new`, and
    /// collects bids the new clearing price has passed.
    pub(crate) fn plan_fills(&self, new: &Checkpoint, reads: &Reads) -> Result<FillPlan, Error> {
        let price = new.clearing_price;
        let mut plan = FillPlan::default();
        let mut marginal = Vec::new();

        for bid in self.bids.values().filter(|bid| !bid.exited) {
            if bid.max_price < price {
                if !bid.is_outbid() {
                    plan.outbid.push(bid.id);
                }
                continue;
            }
            if bid.is_outbid() {
                continue;
            }
            if bid.max_price == price {
                marginal.push(bid);
                continue;
            }

            let start = self.reference_checkpoint(bid)?;
            plan.updates.push(FillUpdate {
                bid: bid.id,
                fill: fills::fully_filled(bid.amount, start, new)?,
                fully_filled_through: Some(new.block),
            });
        }

        if marginal.is_empty() {
            return Ok(plan);
        }

        let last_below = self
            .last_below_price(price)
            .ok_or(ConsistencyError::MissingClearingHistory { price })?;
        let demand = Reads::require(reads.clearing_tick, "ticks(clearingPrice)")?;

        for bid in marginal {
            let start = self.reference_checkpoint(bid)?;
            plan.updates.push(FillUpdate {
                bid: bid.id,
                fill: fills::partially_filled(
                    bid.amount,
                    bid.max_price,
                    start,
                    last_below,
                    new,
                    demand.currency_demand_q96,
                )?,
                fully_filled_through: None,
            });
        }

        Ok(plan)
    }

    pub(crate) fn commit_fills(&mut self, plan: FillPlan, block: BlockNumber) {
        for update in plan.updates {
            if let Some(bid) = self.bids.get_mut(&update.bid) {
                bid.tokens_filled = update.fill.tokens;
                bid.amount_filled = update.fill.currency;
                if let Some(through) = update.fully_filled_through {
                    bid.last_fully_filled_checkpoint_block = through;
                }
            }
        }

        for id in plan.outbid {
            if let Some(bid) = self.bids.get_mut(&id) {
                bid.outbid_checkpoint_block = Some(block);
                debug!(auction = %self.auction.address, bid = %id, %block, "bid outbid");
            }
        }
    }

    pub(crate) fn exit_bid(
        &self,
        id: BidId,
        tokens_filled: TokenAmount,
        currency_refunded: CurrencyAmount,
        meta: &EventMeta,
    ) -> Result<Option<ExitEffect>, Error> {
        let bid = self
            .bids
            .get(&id)
            .ok_or(ConsistencyError::UnknownBid { bid: id })?;
        if bid.exited {
            return Ok(None);
        }

        Ok(Some(ExitEffect {
            bid: id,
            block: meta.block,
            tx_hash: meta.tx_hash,
            tokens_filled,
            currency_refunded,
        }))
    }

    pub(crate) fn commit_exit(&mut self, effect: ExitEffect) {
        let Some(bid) = self.bids.get_mut(&effect.bid) else {
            return;
        };
        bid.exited = true;
        bid.exited_block = Some(effect.block);
        bid.exit_tx_hash = Some(effect.tx_hash);
        bid.tokens_filled = effect.tokens_filled;
        bid.amount_refunded = effect.currency_refunded;
        bid.amount_filled = bid.amount.saturating_sub(effect.currency_refunded);

        self.auction.total_bid_amount = self
            .auction
            .total_bid_amount
            .saturating_sub(effect.currency_refunded);
    }

    pub(crate) fn claim_tokens(
        &self,
        id: BidId,
        tokens_filled: TokenAmount,
        meta: &EventMeta,
    ) -> Result<Option<ClaimEffect>, Error> {
        let bid = self
            .bids
            .get(&id)
            .ok_or(ConsistencyError::UnknownBid { bid: id })?;
        if bid.claimed {
            return Ok(None);
        }
        if meta.block < self.auction.claim_block {
            warn!(
                auction = %self.auction.address,
                bid = %id,
                block = %meta.block,
                claim_block = %self.auction.claim_block,
                "tokens claimed before claim block"
            );
        }

        Ok(Some(ClaimEffect {
            bid: id,
            block: meta.block,
            tx_hash: meta.tx_hash,
            tokens_filled,
        }))
    }

    pub(crate) fn commit_claim(&mut self, effect: ClaimEffect) {
        if let Some(bid) = self.bids.get_mut(&effect.bid) {
            bid.claimed = true;
            bid.claimed_block = Some(effect.block);
            bid.claim_tx_hash = Some(effect.tx_hash);
            bid.tokens_claimed = effect.tokens_filled;
            bid.tokens_filled = effect.tokens_filled;
        }
    }
}
