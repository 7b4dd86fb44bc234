use std::{collections::BTreeMap, future::Future, time::Duration};

use alloy::{primitives::Address, providers::Provider};
use futures::{StreamExt, future::join_all};
use tracing::{debug, error, info, warn};

use crate::{
    blocks::BlockStream,
    dispatcher::{Dispatcher, Outcome},
    error::{Error, StoreError},
    reader::ChainReader,
    source::LogSource,
    store::MemoryStore,
    types::{event::AuctionEvent, primitives::BlockNumber},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Exponential: `backoff`, `2 * backoff`, `4 * backoff`, ...
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub factory: Address,
    pub start_block: BlockNumber,
    /// Largest block span requested from `eth_getLogs` at once.
    pub max_block_range: u64,
    pub retry: RetryPolicy,
}

/// Walks the chain in block windows and feeds every window's events to the
/// dispatcher.
pub struct Indexer<P, R>
where
    P: Provider + Clone,
{
    source: LogSource<P>,
    dispatcher: Dispatcher<R>,
    config: IndexerConfig,
    next_block: BlockNumber,
}

impl<P, R> Indexer<P, R>
where
    P: Provider + Clone,
    R: ChainReader,
{
    pub fn new(provider: P, reader: R, store: MemoryStore, config: IndexerConfig) -> Self {
        Self {
            source: LogSource::new(provider, config.factory),
            dispatcher: Dispatcher::new(store, reader),
            next_block: config.start_block,
            config,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        self.dispatcher.store()
    }

    /// First block not yet indexed.
    pub fn next_block(&self) -> BlockNumber {
        self.next_block
    }

    /// Follows new heads until the stream ends. A window that fails is
    /// retried on the next head.
    pub async fn run<B>(&mut self, mut blocks: B) -> Result<(), Error>
    where
        B: BlockStream,
    {
        while let Some(head) = blocks.next().await {
            let head = head?;
            if let Err(err) = self.sync_to(head).await {
                error!(%head, next_block = %self.next_block, error = %err, "indexing stalled");
            }
        }

        info!(next_block = %self.next_block, "block stream ended");
        Ok(())
    }

    /// Indexes everything up to and including `target`, then returns.
    pub async fn run_until(&mut self, target: BlockNumber) -> Result<(), Error> {
        self.sync_to(target).await
    }

    async fn sync_to(&mut self, head: BlockNumber) -> Result<(), Error> {
        let range = self.config.max_block_range.max(1);

        while self.next_block <= head {
            let from = self.next_block;
            let to = BlockNumber::new(
                from.as_u64()
                    .saturating_add(range - 1)
                    .min(head.as_u64()),
            );

            self.index_window(from, to).await?;
            self.next_block = BlockNumber::new(to.as_u64().saturating_add(1));
        }

        Ok(())
    }

    async fn index_window(&self, from: BlockNumber, to: BlockNumber) -> Result<(), Error> {
        let created = self
            .with_retry("factory logs", || async {
                self.source
                    .factory_events(from, to)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        let mut auctions = self.store().addresses().await;
        auctions.extend(created.iter().map(AuctionEvent::auction));
        auctions.sort();
        auctions.dedup();

        let scoped = self
            .with_retry("auction logs", || async {
                self.source
                    .auction_events(auctions.clone(), from, to)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        let groups = group_by_auction(created.into_iter().chain(scoped));
        debug!(%from, %to, auctions = groups.len(), "indexing window");

        let results = join_all(
            groups
                .into_iter()
                .map(|(auction, events)| self.apply_group(auction, events)),
        )
        .await;

        // A transient failure leaves the rest of that auction's events for the
        // next attempt at this window.
        results.into_iter().collect()
    }

    async fn apply_group(&self, auction: Address, events: Vec<AuctionEvent>) -> Result<(), Error> {
        for event in &events {
            match self.with_retry(event.kind.name(), || self.dispatcher.dispatch(event)).await {
                Ok(Outcome::Duplicate) => {
                    debug!(%auction, position = ?event.position(), "skipping applied event");
                }
                Ok(_) => {}
                Err(err) if err.is_transient() => return Err(err),
                Err(Error::Store(StoreError::Halted { reason, .. })) => {
                    debug!(%auction, %reason, "auction halted, skipping events");
                    return Ok(());
                }
                Err(err) => {
                    error!(%auction, error = %err, "auction processing stopped");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            match op().await {
                Err(err) if err.is_transient() && attempt < policy.attempts => {
                    let delay = policy.delay(attempt);
                    warn!(what, attempt, ?delay, error = %err, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Splits a window's events per auction, each group in chain order with the
/// auction's creation first. Constructor logs precede the factory's
/// `AuctionCreated` in the same transaction.
fn group_by_auction(
    events: impl IntoIterator<Item = AuctionEvent>,
) -> BTreeMap<Address, Vec<AuctionEvent>> {
    let mut groups: BTreeMap<Address, Vec<AuctionEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(event.auction()).or_default().push(event);
    }
    for events in groups.values_mut() {
        events.sort_by_key(|event| (!event.is_creation(), event.position()));
    }
    groups
}
