use alloy::primitives::Address;
use futures::try_join;
use tracing::{Instrument, error, info_span, warn};

use crate::{
    error::{Error, ReadError, StoreError},
    ledger::{AuctionLedger, Cursor, ReadPlan, Reads},
    reader::ChainReader,
    store::MemoryStore,
    types::{event::{AuctionEvent, EventKind}, primitives::BlockNumber},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Registered,
    Applied,
    /// Already reflected in the store.
    Duplicate,
}

/// Applies decoded events to the store, one at a time.
pub struct Dispatcher<R> {
    store: MemoryStore,
    reader: R,
}

impl<R> Dispatcher<R>
where
    R: ChainReader,
{
    pub fn new(store: MemoryStore, reader: R) -> Self {
        Self { store, reader }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub async fn dispatch(&self, event: &AuctionEvent) -> Result<Outcome, Error> {
        let span = info_span!(
            "dispatch",
            kind = event.kind.name(),
            auction = %event.auction(),
            block = %event.meta.block,
            log_index = event.meta.log_index,
        );
        self.dispatch_inner(event).instrument(span).await
    }

    async fn dispatch_inner(&self, event: &AuctionEvent) -> Result<Outcome, Error> {
        if let EventKind::AuctionCreated {
            auction,
            token,
            amount,
            config_data,
        } = &event.kind
        {
            let ledger = AuctionLedger::register(&event.meta, *auction, *token, *amount, config_data);
            let outcome = if self.store.insert(ledger).await {
                Outcome::Registered
            } else {
                Outcome::Duplicate
            };
            return Ok(outcome);
        }

        let auction = event.auction();
        let plan = self
            .store
            .read(auction, |ledger| {
                if let Some(reason) = ledger.halted() {
                    return Err(StoreError::Halted {
                        auction,
                        reason: reason.to_owned(),
                    });
                }
                match ledger.cursor(event.position()) {
                    Cursor::Ahead => Ok(Some(ledger.read_plan(event))),
                    Cursor::Redelivered => Ok(None),
                    Cursor::Behind { last } => {
                        warn!(
                            %auction,
                            cursor_block = %last.block,
                            cursor_log_index = last.log_index,
                            "event from before the last applied block, skipping"
                        );
                        Ok(None)
                    }
                }
            })
            .await??;

        let Some(plan) = plan else {
            return Ok(Outcome::Duplicate);
        };

        // Reads happen outside the store lock; nothing else writes this
        // auction while its events are being dispatched.
        let reads = match self.fetch(auction, &plan, event.meta.block).await {
            Ok(reads) => reads,
            Err(err) => {
                let err = Error::from(err);
                if !err.is_transient() {
                    self.store.update(auction, |ledger| halt(ledger, &err)).await?;
                }
                return Err(err);
            }
        };

        self.store
            .update(auction, |ledger| match ledger.apply(event, reads) {
                Ok(()) => Ok(Outcome::Applied),
                Err(err) => {
                    if !err.is_transient() {
                        halt(ledger, &err);
                    }
                    Err(err)
                }
            })
            .await?
    }

    async fn fetch(
        &self,
        auction: Address,
        plan: &ReadPlan,
        at: BlockNumber,
    ) -> Result<Reads, ReadError> {
        let reader = &self.reader;

        let config = async {
            if plan.backfill {
                reader.auction_config(auction, at).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let steps_data = async {
            if plan.backfill_steps {
                reader.steps_data(auction, at).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let tick = async {
            match plan.tick {
                Some(price) => reader.tick(auction, price, at).await.map(Some),
                None => Ok(None),
            }
        };
        let predecessor = async {
            match plan.predecessor {
                Some(price) => reader.tick(auction, price, at).await.map(Some),
                None => Ok(None),
            }
        };
        let checkpoint = async {
            match plan.checkpoint {
                Some(block) => reader.checkpoint(auction, block, at).await.map(Some),
                None => Ok(None),
            }
        };
        let totals = async {
            if plan.totals {
                reader.totals(auction, at).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let clearing_tick = async {
            match plan.clearing_tick {
                Some(price) => reader.tick(auction, price, at).await.map(Some),
                None => Ok(None),
            }
        };

        let (config, steps_data, tick, predecessor, checkpoint, totals, clearing_tick) = try_join!(
            config,
            steps_data,
            tick,
            predecessor,
            checkpoint,
            totals,
            clearing_tick
        )?;

        Ok(Reads {
            config,
            steps_data,
            tick,
            predecessor,
            checkpoint,
            totals,
            clearing_tick,
        })
    }
}

fn halt(ledger: &mut AuctionLedger, err: &Error) {
    error!(auction = %ledger.address(), error = %err, "halting auction");
    ledger.halt(err.to_string());
}
