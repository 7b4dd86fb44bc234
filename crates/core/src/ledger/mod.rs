//! Per-auction derived state and the event handlers that mutate it.
//!
//! Applying an event is split in two: every handler first computes an
//! [`Effect`] from the current ledger plus the contract reads fetched for the
//! event, and only then is the effect committed. A handler that fails leaves
//! the ledger untouched.

pub mod bids;
pub mod checkpoints;
pub mod fills;
pub mod registry;
pub mod steps;
pub mod ticks;

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::{Address, Bytes};
use tracing::debug;

use crate::{
    error::{ConsistencyError, Error},
    reader::{AuctionConfigSnapshot, AuctionTotals, CheckpointSnapshot, TickSnapshot},
    types::{
        auction::Auction,
        bid::Bid,
        checkpoint::Checkpoint,
        event::{AuctionEvent, EventKind, EventPosition},
        primitives::{BidId, BlockNumber, Price},
        step::{CurrentStep, Step},
        tick::Tick,
    },
};

use self::{bids::BidEffect, checkpoints::CheckpointEffect, ticks::TickEffect};

/// Everything mirrored for one auction.
#[derive(Debug, Clone)]
pub struct AuctionLedger {
    pub(crate) auction: Auction,
    pub(crate) bids: BTreeMap<BidId, Bid>,
    pub(crate) ticks: BTreeMap<Price, Tick>,
    pub(crate) steps: Vec<Step>,
    pub(crate) checkpoints: BTreeMap<BlockNumber, Checkpoint>,
    pub(crate) bidders: BTreeSet<Address>,
    pub(crate) halted: Option<String>,
}

/// Position of an incoming event relative to the ledger's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Not applied yet.
    Ahead,
    /// At or before the cursor within the cursor's block.
    Redelivered,
    /// From a block before the cursor's: a re-delivered window or an event
    /// that arrived out of order.
    Behind { last: EventPosition },
}

/// Contract state an event needs, named by the ledger before anything is
/// fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPlan {
    pub backfill: bool,
    /// The schedule blob is only read when no steps are known yet.
    pub backfill_steps: bool,
    pub tick: Option<Price>,
    pub predecessor: Option<Price>,
    pub checkpoint: Option<BlockNumber>,
    pub totals: bool,
    /// Demand at the new clearing price, when bids sit exactly on it.
    pub clearing_tick: Option<Price>,
}

impl ReadPlan {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Results of a [`ReadPlan`], all taken at the event's block.
#[derive(Debug, Clone, Default)]
pub struct Reads {
    pub config: Option<AuctionConfigSnapshot>,
    pub steps_data: Option<Bytes>,
    pub tick: Option<TickSnapshot>,
    pub predecessor: Option<TickSnapshot>,
    pub checkpoint: Option<CheckpointSnapshot>,
    pub totals: Option<AuctionTotals>,
    pub clearing_tick: Option<TickSnapshot>,
}

impl Reads {
    pub(crate) fn require<T: Copy>(value: Option<T>, what: &'static str) -> Result<T, Error> {
        value.ok_or_else(|| ConsistencyError::MissingRead(what).into())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Effect {
    Step(CurrentStep),
    Tick(TickEffect),
    Bid(BidEffect),
    Checkpoint(CheckpointEffect),
    Exit(bids::ExitEffect),
    Claim(bids::ClaimEffect),
    /// Re-delivered by key; nothing to write.
    Unchanged,
}

impl AuctionLedger {
    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn address(&self) -> Address {
        self.auction.address
    }

    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub(crate) fn halt(&mut self, reason: String) {
        if self.halted.is_none() {
            self.halted = Some(reason);
        }
    }

    /// Where `position` falls relative to the last applied event.
    pub fn cursor(&self, position: EventPosition) -> Cursor {
        match self.auction.last_event {
            Some(last) if position <= last && position.block == last.block => Cursor::Redelivered,
            Some(last) if position <= last => Cursor::Behind { last },
            _ => Cursor::Ahead,
        }
    }

    pub fn read_plan(&self, event: &AuctionEvent) -> ReadPlan {
        let backfill = self.auction.needs_backfill();
        let mut plan = ReadPlan {
            backfill,
            backfill_steps: backfill && self.steps.is_empty(),
            ..ReadPlan::default()
        };

        match &event.kind {
            EventKind::TickInitialized { price } | EventKind::BidSubmitted { price, .. } => {
                plan.tick = Some(*price);
                plan.predecessor = self.predecessor(*price).map(|tick| tick.price);
            }
            EventKind::CheckpointUpdated {
                block,
                clearing_price,
                ..
            } => {
                plan.checkpoint = Some(*block);
                plan.totals = true;
                if self.has_marginal_bids(*clearing_price) {
                    plan.clearing_tick = Some(*clearing_price);
                }
            }
            EventKind::AuctionCreated { .. }
            | EventKind::StepRecorded { .. }
            | EventKind::BidExited { .. }
            | EventKind::TokensClaimed { .. } => {}
        }

        plan
    }

    /// Applies one auction-scoped event. Nothing is written unless the whole
    /// event succeeds.
    pub fn apply(&mut self, event: &AuctionEvent, reads: Reads) -> Result<(), Error> {
        let backfill = if self.auction.needs_backfill() {
            Some(self.backfill(&reads)?)
        } else {
            None
        };
        let effect = self.effect(event, &reads)?;

        if let Some(backfill) = backfill {
            self.commit_backfill(backfill);
        }
        self.commit(event, effect);
        self.auction.last_event = Some(event.position());

        debug!(
            auction = %self.auction.address,
            block = %event.meta.block,
            log_index = event.meta.log_index,
            kind = event.kind.name(),
            "applied event"
        );
        Ok(())
    }

    fn effect(&self, event: &AuctionEvent, reads: &Reads) -> Result<Effect, Error> {
        let meta = &event.meta;
        match &event.kind {
            // Registration happens before a ledger exists.
            EventKind::AuctionCreated { .. } => Ok(Effect::Unchanged),
            EventKind::StepRecorded {
                start_block,
                end_block,
                mps,
            } => Ok(Effect::Step(self.record_step(*start_block, *end_block, *mps))),
            EventKind::TickInitialized { price } => {
                Ok(Effect::Tick(self.initialize_tick(*price, reads)?))
            }
            EventKind::BidSubmitted {
                id,
                owner,
                price,
                amount,
            } => {
                if self.bids.contains_key(id) {
                    return Ok(Effect::Unchanged);
                }
                let bid = Bid::new(*id, *owner, *amount, *price, meta.block, meta.tx_hash);
                Ok(Effect::Bid(self.submit_bid(bid, reads)?))
            }
            EventKind::CheckpointUpdated {
                block,
                clearing_price,
                cumulative_mps,
            } => Ok(Effect::Checkpoint(self.append_checkpoint(
                *block,
                *clearing_price,
                *cumulative_mps,
                reads,
            )?)),
            EventKind::BidExited {
                bid_id,
                tokens_filled,
                currency_refunded,
                ..
            } => Ok(self
                .exit_bid(*bid_id, *tokens_filled, *currency_refunded, meta)?
                .map_or(Effect::Unchanged, Effect::Exit)),
            EventKind::TokensClaimed {
                bid_id,
                tokens_filled,
                ..
            } => Ok(self
                .claim_tokens(*bid_id, *tokens_filled, meta)?
                .map_or(Effect::Unchanged, Effect::Claim)),
        }
    }

    fn commit(&mut self, event: &AuctionEvent, effect: Effect) {
        match effect {
            Effect::Step(step) => self.auction.current_step = Some(step),
            Effect::Tick(effect) => self.commit_tick(effect),
            Effect::Bid(effect) => self.commit_bid(effect),
            Effect::Checkpoint(effect) => self.commit_checkpoint(effect),
            Effect::Exit(effect) => self.commit_exit(effect),
            Effect::Claim(effect) => self.commit_claim(effect),
            Effect::Unchanged => {
                debug!(
                    auction = %self.auction.address,
                    kind = event.kind.name(),
                    "event already reflected, nothing to write"
                );
            }
        }
    }

    pub fn bid(&self, id: BidId) -> Option<&Bid> {
        self.bids.get(&id)
    }

    pub fn tick(&self, price: Price) -> Option<&Tick> {
        self.ticks.get(&price)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn checkpoint(&self, block: BlockNumber) -> Option<&Checkpoint> {
        self.checkpoints.get(&block)
    }
}
