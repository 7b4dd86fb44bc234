use tracing::warn;

use crate::{
    error::Error,
    types::{primitives::Price, tick::Tick},
};

use super::{AuctionLedger, Reads};

#[derive(Debug, Clone, Copy)]
pub(crate) struct TickEffect {
    tick: Tick,
    /// Highest tick below the new one and its refreshed `next` pointer.
    relink: Option<(Price, Price)>,
}

impl AuctionLedger {
    /// Highest known tick strictly below `price`.
    pub fn predecessor(&self, price: Price) -> Option<&Tick> {
        self.ticks.range(..price).next_back().map(|(_, tick)| tick)
    }

    /// Ticks from the lowest price, following `next` pointers until the
    /// sentinel.
    pub fn ticks_in_order(&self) -> Vec<Tick> {
        let mut ordered = Vec::with_capacity(self.ticks.len());
        let mut cursor = self.ticks.values().next();

        while let Some(tick) = cursor {
            ordered.push(*tick);
            if tick.is_last() || tick.next_price <= tick.price {
                break;
            }
            cursor = self.ticks.get(&tick.next_price);
        }

        ordered
    }

    /// Whether `price` sits on the auction's tick grid. Spacing comes from
    /// the pending backfill when the row has not been backfilled yet; an
    /// unknown spacing accepts every price.
    pub(crate) fn is_on_grid(&self, price: Price, reads: &Reads) -> bool {
        let spacing = reads
            .config
            .map_or(self.auction.tick_spacing, |config| config.tick_spacing);
        spacing.as_u256().is_zero() || price.is_sentinel() || price.is_aligned(spacing)
    }

    pub(crate) fn initialize_tick(&self, price: Price, reads: &Reads) -> Result<TickEffect, Error> {
        let snapshot = Reads::require(reads.tick, "ticks(price)")?;
        if !self.is_on_grid(price, reads) {
            warn!(
                auction = %self.auction.address,
                %price,
                "tick price is not a multiple of tick spacing"
            );
        }
        let num_bids = self.ticks.get(&price).map_or(0, |tick| tick.num_bids);

        Ok(TickEffect {
            tick: Tick {
                price,
                next_price: snapshot.next,
                currency_demand: snapshot.currency_demand(),
                num_bids,
            },
            relink: self.relink(price, reads)?,
        })
    }

    /// Tick state after one more bid at `price`. Demand and the next pointer
    /// come from the contract; several bids in a block can move them.
    pub(crate) fn upsert_tick(&self, price: Price, reads: &Reads) -> Result<TickEffect, Error> {
        let mut effect = self.initialize_tick(price, reads)?;
        effect.tick.num_bids = effect.tick.num_bids.saturating_add(1);
        Ok(effect)
    }

    fn relink(&self, price: Price, reads: &Reads) -> Result<Option<(Price, Price)>, Error> {
        match self.predecessor(price) {
            Some(previous) => {
                let snapshot = Reads::require(reads.predecessor, "ticks(predecessor)")?;
                Ok(Some((previous.price, snapshot.next)))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn commit_tick(&mut self, effect: TickEffect) {
        self.ticks.insert(effect.tick.price, effect.tick);
        if let Some((price, next)) = effect.relink {
            if let Some(previous) = self.ticks.get_mut(&price) {
                previous.next_price = next;
            }
        }
    }
}
