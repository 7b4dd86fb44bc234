use alloy::{
    contract,
    primitives::Address,
    providers::MulticallError,
    transports::TransportError,
};
use thiserror::Error;

use crate::{
    math::MathError,
    types::primitives::{BidId, BlockNumber, Price},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    BlockStream(#[from] BlockStreamError),
}

impl Error {
    /// Upstream failures that leave the event unapplied and can be retried
    /// as-is. Everything else halts the auction it belongs to.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Read(err) => err.is_transient(),
            Error::BlockStream(_) => true,
            _ => false,
        }
    }
}

impl From<MathError> for Error {
    fn from(err: MathError) -> Self {
        Error::Consistency(ConsistencyError::Math(err))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("abi decoding failed: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("log is missing {0}")]
    MissingMeta(&'static str),

    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
}

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("checkpoint block {block} is not after last checkpointed block {last}")]
    CheckpointNotIncreasing {
        block: BlockNumber,
        last: BlockNumber,
    },

    #[error("cumulative mps went backwards: {previous} -> {next}")]
    CumulativeMpsDecreased { previous: u32, next: u32 },
}

#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("checkpoint at block {block} not found for bid {bid}")]
    MissingCheckpoint { bid: BidId, block: BlockNumber },

    #[error("no checkpoint below clearing price {price} for marginal bids")]
    MissingClearingHistory { price: Price },

    #[error("bid {bid} not found")]
    UnknownBid { bid: BidId },

    #[error("required read missing: {0}")]
    MissingRead(&'static str),

    #[error("fixed-point arithmetic failed: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to fetch state: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] contract::Error),

    #[error("multicall failed: {0}")]
    Multicall(#[from] MulticallError),

    /// The contract answered, but with a value no retry will change.
    #[error("contract returned out-of-range {0}")]
    OutOfRange(&'static str),
}

impl ReadError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ReadError::OutOfRange(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("auction {0} is not registered")]
    UnknownAuction(Address),

    #[error("auction {auction} halted: {reason}")]
    Halted { auction: Address, reason: String },
}

#[derive(Debug, Error)]
pub enum BlockStreamError {
    #[error("block stream error: {0}")]
    Transport(#[from] TransportError),
}
