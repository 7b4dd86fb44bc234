use alloy::{primitives::Address, providers::Provider};
use mirror_core::{BlockNumber, Indexer, MemoryStore, Order, RpcReader, blocks::BlockProducer};
use tracing::info;

use crate::{
    config::Settings,
    output::{AuctionDetailView, AuctionView, render},
    provider,
};

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Stop after this block instead of following new heads.
    pub until_block: Option<u64>,
    /// Stop at the chain head as of startup.
    pub once: bool,
    /// Print one auction in detail instead of the auction list.
    pub auction: Option<Address>,
}

/// Indexes the factory's auctions and returns the resulting snapshot as JSON.
pub async fn index(settings: &Settings, options: IndexOptions) -> eyre::Result<String> {
    let provider = provider::connect(&settings.rpc_url).await?;
    provider::check_chain_id(&provider, settings.chain_id).await?;

    let store = MemoryStore::new();
    let reader = RpcReader::new(provider.clone());
    let mut indexer = Indexer::new(provider.clone(), reader, store.clone(), settings.indexer.clone());

    info!(
        factory = %settings.indexer.factory,
        start_block = %settings.indexer.start_block,
        "indexing"
    );

    let target = match options.until_block {
        Some(target) => Some(target),
        None if options.once => Some(provider.get_block_number().await?),
        None => None,
    };

    match target {
        Some(target) => indexer.run_until(BlockNumber::new(target)).await?,
        None => {
            let blocks = BlockProducer::new(provider.clone()).into_stream().await?;
            tokio::select! {
                result = indexer.run(blocks) => result?,
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
    }

    let head = BlockNumber::new(indexer.next_block().as_u64().saturating_sub(1));
    info!(%head, auctions = store.addresses().await.len(), "indexed");

    match options.auction {
        Some(address) => {
            let detail = store
                .auction_detail(address, settings.recent_bids, settings.recent_checkpoints)
                .await?;
            let ticks = store.ticks(address).await?;
            render(&AuctionDetailView::new(detail, ticks, head))
        }
        None => {
            let views: Vec<AuctionView> = store
                .auctions(Order::Asc)
                .await
                .into_iter()
                .map(|auction| AuctionView::new(auction, head))
                .collect();
            render(&views)
        }
    }
}

