use alloy::{
    eips::BlockId,
    primitives::{Address, Bytes, U256},
    providers::Provider,
};
use async_trait::async_trait;
use mirror_abi::IContinuousClearingAuction;
use tracing::warn;

use crate::{
    error::ReadError,
    types::primitives::{BlockNumber, CurrencyAmount, Mps, Price, TickSpacing, TokenAmount},
};

use super::{AuctionConfigSnapshot, AuctionTotals, ChainReader, CheckpointSnapshot, TickSnapshot};

/// [`ChainReader`] backed by an alloy provider.
#[derive(Clone)]
pub struct RpcReader<P>
where
    P: Provider + Clone,
{
    provider: P,
}

impl<P> RpcReader<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

fn pinned(at: BlockNumber) -> BlockId {
    BlockId::number(at.as_u64())
}

#[async_trait]
impl<P> ChainReader for RpcReader<P>
where
    P: Provider + Clone + Send + Sync,
{
    async fn auction_config(
        &self,
        auction: Address,
        at: BlockNumber,
    ) -> Result<AuctionConfigSnapshot, ReadError> {
        let cca = IContinuousClearingAuction::new(auction, &self.provider);

        let (start_block, end_block, claim_block, floor_price, tick_spacing, total_supply) = self
            .provider
            .multicall()
            .add(cca.startBlock())
            .add(cca.endBlock())
            .add(cca.claimBlock())
            .add(cca.floorPrice())
            .add(cca.tickSpacing())
            .add(cca.totalSupply())
            .block(pinned(at))
            .aggregate()
            .await?;

        Ok(AuctionConfigSnapshot {
            start_block: BlockNumber::new(start_block),
            end_block: BlockNumber::new(end_block),
            claim_block: BlockNumber::new(claim_block),
            floor_price: Price::new(floor_price),
            tick_spacing: TickSpacing::new(tick_spacing),
            total_supply: TokenAmount::new(U256::from(total_supply)),
        })
    }

    async fn steps_data(&self, auction: Address, at: BlockNumber) -> Result<Bytes, ReadError> {
        let cca = IContinuousClearingAuction::new(auction, &self.provider);
        let pointer = cca.pointer().block(pinned(at)).call().await?;
        let code = self.provider.get_code_at(pointer).block_id(pinned(at)).await?;

        // SSTORE2 data contracts start with a STOP byte.
        match code.get(1..) {
            Some(data) if !data.is_empty() => Ok(Bytes::copy_from_slice(data)),
            _ => {
                warn!(%auction, %pointer, "schedule pointer holds no data");
                Ok(Bytes::new())
            }
        }
    }

    async fn tick(
        &self,
        auction: Address,
        price: Price,
        at: BlockNumber,
    ) -> Result<TickSnapshot, ReadError> {
        let cca = IContinuousClearingAuction::new(auction, &self.provider);
        let tick = cca.ticks(price.as_u256()).block(pinned(at)).call().await?;

        Ok(TickSnapshot {
            next: Price::new(tick.next),
            currency_demand_q96: tick.currencyDemandQ96,
        })
    }

    async fn checkpoint(
        &self,
        auction: Address,
        checkpoint_block: BlockNumber,
        at: BlockNumber,
    ) -> Result<CheckpointSnapshot, ReadError> {
        let cca = IContinuousClearingAuction::new(auction, &self.provider);
        let raw = cca
            .checkpoints(checkpoint_block.as_u64())
            .block(pinned(at))
            .call()
            .await?;

        Ok(CheckpointSnapshot {
            clearing_price: Price::new(raw.clearingPrice),
            cumulative_mps: Mps::from_raw(raw.cumulativeMps)
                .ok_or(ReadError::OutOfRange("cumulativeMps"))?,
            cumulative_mps_per_price: raw.cumulativeMpsPerPrice,
            currency_raised_at_clearing_price_x7: raw.currencyRaisedAtClearingPriceQ96_X7,
        })
    }

    async fn totals(&self, auction: Address, at: BlockNumber) -> Result<AuctionTotals, ReadError> {
        let cca = IContinuousClearingAuction::new(auction, &self.provider);

        let (currency_raised, total_cleared) = self
            .provider
            .multicall()
            .add(cca.currencyRaised())
            .add(cca.totalCleared())
            .block(pinned(at))
            .aggregate()
            .await?;

        Ok(AuctionTotals {
            currency_raised: CurrencyAmount::new(currency_raised),
            total_cleared: TokenAmount::new(total_cleared),
        })
    }
}
