use std::collections::{BTreeMap, BTreeSet};

use alloy::{
    primitives::{Address, U256},
    sol_types::SolValue,
};
use mirror_abi::AuctionParameters;
use tracing::{info, warn};

use crate::{
    error::{ConsistencyError, DecodeError, Error},
    reader::AuctionConfigSnapshot,
    types::{
        auction::Auction,
        event::EventMeta,
        primitives::{BlockNumber, CurrencyAmount, Price, TickSpacing, TokenAmount},
        step::Step,
    },
};

use super::{AuctionLedger, Reads, steps::parse_steps};

/// Configuration recovered from contract reads for an auction whose row is
/// still incomplete.
#[derive(Debug, Clone)]
pub(crate) struct Backfill {
    config: AuctionConfigSnapshot,
    steps: Option<Vec<Step>>,
}

/// Decodes the factory's `configData` payload.
pub fn decode_config(data: &[u8]) -> Result<AuctionParameters, DecodeError> {
    Ok(AuctionParameters::abi_decode(data)?)
}

impl AuctionLedger {
    pub fn new(auction: Auction) -> Self {
        Self {
            auction,
            bids: BTreeMap::new(),
            ticks: BTreeMap::new(),
            steps: Vec::new(),
            checkpoints: BTreeMap::new(),
            bidders: BTreeSet::new(),
            halted: None,
        }
    }

    /// Creates the ledger for a factory `AuctionCreated` log.
    ///
    /// Total supply is never taken from the payload, so the first event
    /// scoped to the auction always backfills from contract reads.
    pub fn register(
        meta: &EventMeta,
        address: Address,
        token: Address,
        amount: TokenAmount,
        config_data: &[u8],
    ) -> Self {
        let mut ledger = Self::new(Auction::new(address, token, amount, meta.block));

        match decode_config(config_data) {
            Ok(params) => ledger.apply_parameters(params),
            Err(err) => warn!(
                auction = %address,
                error = %err,
                "config data undecodable, waiting for backfill"
            ),
        }

        info!(
            auction = %address,
            token = %token,
            created_at = %meta.block,
            steps = ledger.steps.len(),
            "registered auction"
        );
        ledger
    }

    fn apply_parameters(&mut self, params: AuctionParameters) {
        let auction = &mut self.auction;
        auction.currency = params.currency;
        auction.tokens_recipient = params.tokensRecipient;
        auction.funds_recipient = params.fundsRecipient;
        auction.start_block = BlockNumber::new(params.startBlock);
        auction.end_block = BlockNumber::new(params.endBlock);
        auction.claim_block = BlockNumber::new(params.claimBlock);
        auction.tick_spacing = TickSpacing::new(params.tickSpacing);
        auction.validation_hook =
            (params.validationHook != Address::ZERO).then_some(params.validationHook);
        auction.floor_price = Price::new(params.floorPrice);
        auction.required_currency_raised =
            CurrencyAmount::new(U256::from(params.requiredCurrencyRaised));

        self.steps = parse_steps(&params.auctionStepsData, auction.start_block);
    }

    pub(crate) fn backfill(&self, reads: &Reads) -> Result<Backfill, Error> {
        let config = Reads::require(reads.config, "auction config")?;
        let steps = if self.steps.is_empty() {
            let data = reads
                .steps_data
                .as_ref()
                .ok_or(ConsistencyError::MissingRead("steps data"))?;
            let steps = parse_steps(data, config.start_block);
            if steps.is_empty() {
                warn!(
                    auction = %self.auction.address,
                    "no step schedule available, continuing without steps"
                );
            }
            Some(steps)
        } else {
            None
        };
        Ok(Backfill { config, steps })
    }

    pub(crate) fn commit_backfill(&mut self, backfill: Backfill) {
        let Backfill { config, steps } = backfill;
        let auction = &mut self.auction;
        auction.start_block = config.start_block;
        auction.end_block = config.end_block;
        auction.claim_block = config.claim_block;
        auction.floor_price = config.floor_price;
        auction.tick_spacing = config.tick_spacing;
        auction.total_supply = config.total_supply;

        if let Some(steps) = steps {
            self.steps = steps;
        }

        info!(
            auction = %self.auction.address,
            total_supply = %self.auction.total_supply,
            steps = self.steps.len(),
            "backfilled auction from contract state"
        );
    }
}
