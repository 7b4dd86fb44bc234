//! Log retrieval and decoding for the factory and its auctions.

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::{SolEvent, SolEventInterface},
};
use mirror_abi::{
    IContinuousClearingAuction::{self, IContinuousClearingAuctionEvents},
    IContinuousClearingAuctionFactory::AuctionCreated,
};
use tracing::{debug, warn};

use crate::{
    error::{DecodeError, ReadError},
    types::{
        event::{AuctionEvent, EventKind, EventMeta},
        primitives::{BidId, BlockNumber, CurrencyAmount, Mps, Price, TokenAmount},
    },
};

#[derive(Clone)]
pub struct LogSource<P>
where
    P: Provider + Clone,
{
    provider: P,
    factory: Address,
}

impl<P> LogSource<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, factory: Address) -> Self {
        Self { provider, factory }
    }

    pub async fn factory_events(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<AuctionEvent>, ReadError> {
        let filter = Filter::new()
            .address(self.factory)
            .from_block(from.as_u64())
            .to_block(to.as_u64())
            .event_signature(AuctionCreated::SIGNATURE_HASH);

        let logs = self.provider.get_logs(&filter).await?;
        Ok(decode_all(&logs, decode_factory_log))
    }

    pub async fn auction_events(
        &self,
        auctions: Vec<Address>,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<AuctionEvent>, ReadError> {
        if auctions.is_empty() {
            return Ok(Vec::new());
        }

        let filter = Filter::new()
            .address(auctions)
            .from_block(from.as_u64())
            .to_block(to.as_u64())
            .event_signature(tracked_signatures());

        let logs = self.provider.get_logs(&filter).await?;
        Ok(decode_all(&logs, decode_auction_log))
    }
}

fn tracked_signatures() -> Vec<alloy::primitives::B256> {
    use IContinuousClearingAuction::{
        AuctionStepRecorded, BidExited, BidSubmitted, CheckpointUpdated, TickInitialized,
        TokensClaimed,
    };

    vec![
        AuctionStepRecorded::SIGNATURE_HASH,
        TickInitialized::SIGNATURE_HASH,
        BidSubmitted::SIGNATURE_HASH,
        CheckpointUpdated::SIGNATURE_HASH,
        BidExited::SIGNATURE_HASH,
        TokensClaimed::SIGNATURE_HASH,
    ]
}

/// Decodes every log, dropping malformed and untracked ones, and returns the
/// events in chain order.
fn decode_all(
    logs: &[Log],
    decode: impl Fn(&Log) -> Result<Option<AuctionEvent>, DecodeError>,
) -> Vec<AuctionEvent> {
    let mut events: Vec<AuctionEvent> = logs
        .iter()
        .filter_map(|log| match decode(log) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    address = %log.address(),
                    tx = ?log.transaction_hash,
                    error = %err,
                    "skipping undecodable log"
                );
                None
            }
        })
        .collect();
    events.sort_by_key(AuctionEvent::position);
    events
}

fn meta(log: &Log) -> Result<EventMeta, DecodeError> {
    Ok(EventMeta {
        block: BlockNumber::new(log.block_number.ok_or(DecodeError::MissingMeta("block number"))?),
        log_index: log.log_index.ok_or(DecodeError::MissingMeta("log index"))?,
        tx_hash: log
            .transaction_hash
            .ok_or(DecodeError::MissingMeta("transaction hash"))?,
    })
}

fn block(value: U256, field: &'static str) -> Result<BlockNumber, DecodeError> {
    u64::try_from(value)
        .map(BlockNumber::new)
        .map_err(|_| DecodeError::OutOfRange(field))
}

pub fn decode_factory_log(log: &Log) -> Result<Option<AuctionEvent>, DecodeError> {
    if log.topic0() != Some(&AuctionCreated::SIGNATURE_HASH) {
        return Ok(None);
    }
    let created = log.log_decode::<AuctionCreated>()?.inner.data;

    Ok(Some(AuctionEvent {
        emitter: log.address(),
        meta: meta(log)?,
        kind: EventKind::AuctionCreated {
            auction: created.auction,
            token: created.token,
            amount: TokenAmount::new(created.amount),
            config_data: created.configData,
        },
    }))
}

pub fn decode_auction_log(log: &Log) -> Result<Option<AuctionEvent>, DecodeError> {
    use IContinuousClearingAuctionEvents as Events;

    let decoded = IContinuousClearingAuctionEvents::decode_log(&log.inner)?.data;
    let kind = match decoded {
        Events::AuctionStepRecorded(step) => EventKind::StepRecorded {
            start_block: block(step.startBlock, "startBlock")?,
            end_block: block(step.endBlock, "endBlock")?,
            mps: step.mps.to(),
        },
        Events::TickInitialized(tick) => EventKind::TickInitialized {
            price: Price::new(tick.price),
        },
        Events::BidSubmitted(bid) => EventKind::BidSubmitted {
            id: BidId::new(bid.id),
            owner: bid.owner,
            price: Price::new(bid.price),
            amount: CurrencyAmount::new(U256::from(bid.amount)),
        },
        Events::CheckpointUpdated(checkpoint) => EventKind::CheckpointUpdated {
            block: block(checkpoint.blockNumber, "blockNumber")?,
            clearing_price: Price::new(checkpoint.clearingPrice),
            cumulative_mps: Mps::from_raw(checkpoint.cumulativeMps)
                .ok_or(DecodeError::OutOfRange("cumulativeMps"))?,
        },
        Events::BidExited(exit) => EventKind::BidExited {
            bid_id: BidId::new(exit.bidId),
            owner: exit.owner,
            tokens_filled: TokenAmount::new(exit.tokensFilled),
            currency_refunded: CurrencyAmount::new(exit.currencyRefunded),
        },
        Events::TokensClaimed(claim) => EventKind::TokensClaimed {
            bid_id: BidId::new(claim.bidId),
            owner: claim.owner,
            tokens_filled: TokenAmount::new(claim.tokensFilled),
        },
        _ => {
            debug!(address = %log.address(), topic = ?log.topic0(), "ignoring untracked auction log");
            return Ok(None);
        }
    };

    Ok(Some(AuctionEvent {
        emitter: log.address(),
        meta: meta(log)?,
        kind,
    }))
}
