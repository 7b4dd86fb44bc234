use tracing::{debug, info};

use crate::{
    error::{Error, OrderingError},
    reader::AuctionTotals,
    types::{
        checkpoint::Checkpoint,
        primitives::{BlockNumber, Mps, Price},
    },
};

use super::{AuctionLedger, Reads, bids::FillPlan};

#[derive(Debug, Clone)]
pub(crate) struct CheckpointEffect {
    checkpoint: Checkpoint,
    totals: AuctionTotals,
    fills: FillPlan,
}

impl AuctionLedger {
    pub fn latest_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.values().next_back()
    }

    /// Most recent checkpoint that cleared strictly below `price`.
    pub fn last_below_price(&self, price: Price) -> Option<&Checkpoint> {
        self.checkpoints
            .values()
            .rev()
            .find(|checkpoint| checkpoint.clearing_price < price)
    }

    pub(crate) fn append_checkpoint(
        &self,
        block: BlockNumber,
        clearing_price: Price,
        cumulative_mps: Mps,
        reads: &Reads,
    ) -> Result<CheckpointEffect, Error> {
        if let Some(latest) = self.latest_checkpoint() {
            if block <= latest.block {
                return Err(OrderingError::CheckpointNotIncreasing {
                    block,
                    last: latest.block,
                }
                .into());
            }
        }
        if cumulative_mps < self.auction.cumulative_mps {
            return Err(OrderingError::CumulativeMpsDecreased {
                previous: self.auction.cumulative_mps.as_u32(),
                next: cumulative_mps.as_u32(),
            }
            .into());
        }

        let snapshot = Reads::require(reads.checkpoint, "checkpoints(block)")?;
        let totals = Reads::require(reads.totals, "auction totals")?;

        let checkpoint = Checkpoint {
            block,
            clearing_price,
            cumulative_mps,
            cumulative_mps_per_price: snapshot.cumulative_mps_per_price,
            currency_raised_at_clearing_price_x7: snapshot.currency_raised_at_clearing_price_x7,
        };
        let fills = self.plan_fills(&checkpoint, reads)?;

        Ok(CheckpointEffect {
            checkpoint,
            totals,
            fills,
        })
    }

    pub(crate) fn commit_checkpoint(&mut self, effect: CheckpointEffect) {
        let CheckpointEffect {
            checkpoint,
            totals,
            fills,
        } = effect;

        let auction = &mut self.auction;
        if checkpoint.is_sold_out() && !auction.cumulative_mps.is_sold_out() {
            info!(auction = %auction.address, block = %checkpoint.block, "emission complete");
        }
        auction.last_checkpointed_block = checkpoint.block;
        auction.last_clearing_price = checkpoint.clearing_price;
        auction.cumulative_mps = checkpoint.cumulative_mps;
        auction.remaining_mps = checkpoint.remaining_mps();
        auction.currency_raised = totals.currency_raised;
        auction.total_cleared = totals.total_cleared;
        auction.refresh_available_supply();

        debug!(
            auction = %auction.address,
            block = %checkpoint.block,
            clearing_price = %checkpoint.clearing_price,
            cumulative_mps = %checkpoint.cumulative_mps,
            fills = fills.updates.len(),
            outbid = fills.outbid.len(),
            "checkpoint appended"
        );

        self.checkpoints.insert(checkpoint.block, checkpoint);
        self.commit_fills(fills, checkpoint.block);
    }
}
