use alloy::{
    consensus::BlockHeader,
    providers::Provider,
    transports::{TransportError, TransportErrorKind},
};
use futures::{Stream, StreamExt, future, stream::BoxStream};
use tracing::{debug, info};

use crate::{error::BlockStreamError, types::primitives::BlockNumber};

pub type BlockStreamItem = Result<BlockNumber, BlockStreamError>;

pub trait BlockStream: Stream<Item = BlockStreamItem> + Send + Unpin {}

impl<T> BlockStream for T where T: Stream<Item = BlockStreamItem> + Send + Unpin {}

pub type BoxBlockStream = BoxStream<'static, BlockStreamItem>;

/// Chain heads for the indexer: a new-heads subscription when the transport
/// supports it, block polling otherwise.
#[derive(Clone)]
pub struct BlockProducer<P>
where
    P: Provider + Clone,
{
    provider: P,
}

impl<P> BlockProducer<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn into_stream(self) -> Result<BoxBlockStream, BlockStreamError> {
        let heads = match self.subscribe().await {
            Ok(stream) => stream,
            Err(BlockStreamError::Transport(TransportError::Transport(
                TransportErrorKind::PubsubUnavailable,
            ))) => {
                info!("pubsub unavailable, polling for blocks");
                self.poll().await?
            }
            Err(err) => return Err(err),
        };
        Ok(advancing(heads).boxed())
    }

    async fn subscribe(&self) -> Result<BoxBlockStream, BlockStreamError> {
        let subscription = self.provider.subscribe_blocks().await?;
        Ok(subscription
            .into_stream()
            .map(|header| Ok(BlockNumber::new(header.number())))
            .boxed())
    }

    async fn poll(&self) -> Result<BoxBlockStream, BlockStreamError> {
        let watcher = self.provider.watch_full_blocks().await?;
        Ok(watcher
            .into_stream()
            .map(|result| {
                result
                    .map_err(BlockStreamError::from)
                    .map(|block| BlockNumber::new(block.header.number()))
            })
            .boxed())
    }
}

/// Drops heads that do not move past the highest one seen. Reorged or
/// repeated heads would only re-deliver windows already indexed.
pub fn advancing<S>(heads: S) -> impl Stream<Item = BlockStreamItem> + Send + Unpin
where
    S: Stream<Item = BlockStreamItem> + Send + Unpin,
{
    let mut highest: Option<BlockNumber> = None;
    heads.filter(move |item| {
        let keep = match item {
            Ok(head) if highest.is_some_and(|seen| *head <= seen) => {
                debug!(%head, "ignoring stale head");
                false
            }
            Ok(head) => {
                highest = Some(*head);
                true
            }
            Err(_) => true,
        };
        future::ready(keep)
    })
}
