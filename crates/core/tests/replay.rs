use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::{
    primitives::{Address, B256, Bytes, U256},
    sol_types::SolValue,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use mirror_abi::AuctionParameters;
use mirror_core::{
    AuctionEvent, BidId, BidQuery, BlockNumber, ConsistencyError, CurrencyAmount, CurrentStep,
    Dispatcher,
    Error, EventKind, EventMeta, MemoryStore, Mps, OrderingError, Outcome, Price, ReadError,
    StoreError, TokenAmount,
    math::{MPS_TOTAL, Q96},
    reader::{AuctionConfigSnapshot, AuctionTotals, ChainReader, CheckpointSnapshot, TickSnapshot},
    types::TickSpacing,
};

const AUCTION: Address = Address::repeat_byte(0xaa);
const FACTORY: Address = Address::repeat_byte(0xfa);
const TOKEN: Address = Address::repeat_byte(0xbb);
const ALICE: Address = Address::repeat_byte(0x11);
const BOB: Address = Address::repeat_byte(0x22);

fn q96(value: u64) -> U256 {
    U256::from(value) * Q96
}

fn price(value: u64) -> Price {
    Price::new(q96(value))
}

fn currency(value: u64) -> CurrencyAmount {
    CurrencyAmount::new(U256::from(value))
}

fn tokens(value: u64) -> TokenAmount {
    TokenAmount::new(U256::from(value))
}

/// 40 blocks at 100k mps then 60 blocks at 100k mps, starting at block 100.
fn steps_blob() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&[0x01, 0x86, 0xa0, 0, 0, 0, 0, 40]);
    data.extend_from_slice(&[0x01, 0x86, 0xa0, 0, 0, 0, 0, 60]);
    data
}

#[derive(Default)]
struct ChainState {
    ticks: HashMap<Price, TickSnapshot>,
    checkpoints: HashMap<BlockNumber, CheckpointSnapshot>,
    totals: Option<AuctionTotals>,
    /// Schedule blob behind the pointer; `None` serves the default schedule.
    steps_data: Option<Vec<u8>>,
    /// Serve checkpoints whose `cumulativeMps` exceeds the total.
    corrupt_checkpoints: bool,
    failures: u32,
    reads: u32,
}

/// Contract state keyed by what the auction would return at the event block.
#[derive(Clone, Default)]
struct FakeChain {
    state: Arc<Mutex<ChainState>>,
}

impl FakeChain {
    fn set_tick(&self, at: Price, next: Price, demand: u64) {
        self.state.lock().unwrap().ticks.insert(
            at,
            TickSnapshot {
                next,
                currency_demand_q96: q96(demand),
            },
        );
    }

    fn set_checkpoint(&self, block: u64, snapshot: CheckpointSnapshot) {
        self.state
            .lock()
            .unwrap()
            .checkpoints
            .insert(BlockNumber::new(block), snapshot);
    }

    fn set_totals(&self, raised: u64, cleared: u64) {
        self.state.lock().unwrap().totals = Some(AuctionTotals {
            currency_raised: currency(raised),
            total_cleared: tokens(cleared),
        });
    }

    fn set_steps_data(&self, data: Vec<u8>) {
        self.state.lock().unwrap().steps_data = Some(data);
    }

    fn corrupt_checkpoints(&self) {
        self.state.lock().unwrap().corrupt_checkpoints = true;
    }

    fn fail_next(&self, count: u32) {
        self.state.lock().unwrap().failures = count;
    }

    fn read_count(&self) -> u32 {
        self.state.lock().unwrap().reads
    }

    fn begin_read(&self) -> Result<(), ReadError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.failures > 0 {
            state.failures -= 1;
            return Err(TransportErrorKind::custom_str("connection reset").into());
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn auction_config(
        &self,
        _auction: Address,
        _at: BlockNumber,
    ) -> Result<AuctionConfigSnapshot, ReadError> {
        self.begin_read()?;
        Ok(AuctionConfigSnapshot {
            start_block: BlockNumber::new(100),
            end_block: BlockNumber::new(200),
            claim_block: BlockNumber::new(400),
            floor_price: price(1),
            tick_spacing: TickSpacing::new(Q96),
            total_supply: tokens(1_000_000),
        })
    }

    async fn steps_data(&self, _auction: Address, _at: BlockNumber) -> Result<Bytes, ReadError> {
        self.begin_read()?;
        let data = self.state.lock().unwrap().steps_data.clone();
        Ok(Bytes::from(data.unwrap_or_else(steps_blob)))
    }

    async fn tick(
        &self,
        _auction: Address,
        price: Price,
        _at: BlockNumber,
    ) -> Result<TickSnapshot, ReadError> {
        self.begin_read()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .ticks
            .get(&price)
            .copied()
            .unwrap_or(TickSnapshot {
                next: Price::SENTINEL,
                currency_demand_q96: U256::ZERO,
            }))
    }

    async fn checkpoint(
        &self,
        _auction: Address,
        checkpoint_block: BlockNumber,
        _at: BlockNumber,
    ) -> Result<CheckpointSnapshot, ReadError> {
        self.begin_read()?;
        if self.state.lock().unwrap().corrupt_checkpoints {
            return Err(ReadError::OutOfRange("cumulativeMps"));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .checkpoints
            .get(&checkpoint_block)
            .copied()
            .expect("checkpoint staged by the test"))
    }

    async fn totals(&self, _auction: Address, _at: BlockNumber) -> Result<AuctionTotals, ReadError> {
        self.begin_read()?;
        Ok(self.state.lock().unwrap().totals.unwrap_or(AuctionTotals {
            currency_raised: CurrencyAmount::ZERO,
            total_cleared: TokenAmount::ZERO,
        }))
    }
}

fn snapshot(clearing: Price, mps: u32, mps_per_price: U256, x7: U256) -> CheckpointSnapshot {
    CheckpointSnapshot {
        clearing_price: clearing,
        cumulative_mps: Mps::new(mps),
        cumulative_mps_per_price: mps_per_price,
        currency_raised_at_clearing_price_x7: x7,
    }
}

struct Harness {
    chain: FakeChain,
    dispatcher: Dispatcher<FakeChain>,
    log_index: u64,
}

impl Harness {
    /// Registers the auction and applies its floor tick and first checkpoint
    /// at block 100.
    async fn new() -> Self {
        Self::with_config(config_data()).await
    }

    async fn with_config(config_data: Bytes) -> Self {
        Self::with_chain(FakeChain::default(), config_data).await
    }

    async fn with_chain(chain: FakeChain, config_data: Bytes) -> Self {
        let dispatcher = Dispatcher::new(MemoryStore::new(), chain.clone());
        let mut harness = Self {
            chain,
            dispatcher,
            log_index: 0,
        };

        let created = AuctionEvent {
            emitter: FACTORY,
            meta: meta(50, 5),
            kind: EventKind::AuctionCreated {
                auction: AUCTION,
                token: TOKEN,
                amount: tokens(1_000_000),
                config_data,
            },
        };
        assert_eq!(harness.dispatcher.dispatch(&created).await.unwrap(), Outcome::Registered);

        harness.chain.set_tick(price(1), Price::SENTINEL, 0);
        harness
            .apply(50, EventKind::TickInitialized { price: price(1) })
            .await
            .unwrap();
        harness.checkpoint(100, price(1), 0, U256::ZERO, U256::ZERO).await.unwrap();
        harness
    }

    fn next_meta(&mut self, block: u64) -> EventMeta {
        self.log_index += 1;
        meta(block, self.log_index)
    }

    async fn apply(&mut self, block: u64, kind: EventKind) -> Result<Outcome, Error> {
        let event = AuctionEvent {
            emitter: AUCTION,
            meta: self.next_meta(block),
            kind,
        };
        self.dispatcher.dispatch(&event).await
    }

    async fn checkpoint(
        &mut self,
        block: u64,
        clearing: Price,
        mps: u32,
        mps_per_price: U256,
        x7: U256,
    ) -> Result<Outcome, Error> {
        self.chain
            .set_checkpoint(block, snapshot(clearing, mps, mps_per_price, x7));
        self.apply(
            block,
            EventKind::CheckpointUpdated {
                block: BlockNumber::new(block),
                clearing_price: clearing,
                cumulative_mps: Mps::new(mps),
            },
        )
        .await
    }

    async fn bid(&mut self, id: u64, owner: Address, at: Price, amount: u64, block: u64) {
        self.apply(
            block,
            EventKind::BidSubmitted {
                id: BidId::new(U256::from(id)),
                owner,
                price: at,
                amount: currency(amount),
            },
        )
        .await
        .unwrap();
    }

    async fn bid_state(&self, id: u64) -> mirror_core::Bid {
        self.dispatcher
            .store()
            .bids(AUCTION, BidQuery::default())
            .await
            .unwrap()
            .into_iter()
            .find(|bid| bid.id == BidId::new(U256::from(id)))
            .unwrap()
    }
}

fn meta(block: u64, log_index: u64) -> EventMeta {
    EventMeta {
        block: BlockNumber::new(block),
        log_index,
        tx_hash: B256::with_last_byte(log_index as u8),
    }
}

fn config_data() -> Bytes {
    AuctionParameters {
        currency: Address::repeat_byte(0xcc),
        tokensRecipient: Address::repeat_byte(0x01),
        fundsRecipient: Address::repeat_byte(0x02),
        startBlock: 100,
        endBlock: 200,
        claimBlock: 400,
        tickSpacing: Q96,
        validationHook: Address::ZERO,
        floorPrice: Q96,
        requiredCurrencyRaised: 1_000,
        auctionStepsData: Bytes::from(steps_blob()),
    }
    .abi_encode()
    .into()
}

#[tokio::test]
async fn fully_filled_bid_accrues_half_the_emission() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    harness.chain.set_tick(price(1), price(2), 0);
    harness.bid(1, ALICE, price(2), 1_000, 100).await;

    harness.chain.set_totals(500, 500);
    harness
        .checkpoint(200, price(1), 5_000_000, q96(5_000_000), U256::ZERO)
        .await
        .unwrap();

    let bid = harness.bid_state(1).await;
    assert_eq!(bid.tokens_filled, tokens(500));
    assert_eq!(bid.amount_filled, currency(500));
    assert_eq!(bid.last_fully_filled_checkpoint_block, BlockNumber::new(200));

    let auction = harness.dispatcher.store().auction(AUCTION).await.unwrap();
    assert_eq!(auction.cumulative_mps, Mps::new(5_000_000));
    assert_eq!(auction.remaining_mps, Mps::new(5_000_000));
    assert_eq!(auction.currency_raised, currency(500));
    assert_eq!(auction.total_supply, tokens(1_000_000));
    assert_eq!(auction.available_supply, tokens(1_000_000 - 1_000_000 / 5_000_000));
}

#[tokio::test]
async fn fills_never_decrease_while_filling() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    harness.bid(1, ALICE, price(2), 1_000, 100).await;

    let mut previous = TokenAmount::ZERO;
    for (block, mps) in [(120u64, 1_000_000u32), (150, 3_000_000), (180, 7_000_000), (199, 10_000_000)] {
        harness
            .checkpoint(block, price(1), mps, q96(u64::from(mps)), U256::ZERO)
            .await
            .unwrap();
        let filled = harness.bid_state(1).await.tokens_filled;
        assert!(filled >= previous);
        previous = filled;
    }
    assert_eq!(previous, tokens(1_000));
}

#[tokio::test]
async fn exited_bid_is_not_touched_by_later_checkpoints() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    harness.bid(1, ALICE, price(2), 1_000, 100).await;
    harness
        .checkpoint(150, price(1), 5_000_000, q96(5_000_000), U256::ZERO)
        .await
        .unwrap();

    harness
        .apply(
            160,
            EventKind::BidExited {
                bid_id: BidId::new(U256::from(1u8)),
                owner: ALICE,
                tokens_filled: tokens(500),
                currency_refunded: currency(500),
            },
        )
        .await
        .unwrap();

    let exited = harness.bid_state(1).await;
    assert!(exited.exited);
    assert_eq!(exited.exited_block, Some(BlockNumber::new(160)));
    let auction = harness.dispatcher.store().auction(AUCTION).await.unwrap();
    assert_eq!(auction.total_bid_amount, currency(500));

    harness
        .checkpoint(180, price(1), 8_000_000, q96(8_000_000), U256::ZERO)
        .await
        .unwrap();
    let after = harness.bid_state(1).await;
    assert_eq!(after.tokens_filled, tokens(500));
    assert_eq!(after.amount_filled, exited.amount_filled);
}

#[tokio::test]
async fn marginal_bids_share_raised_currency_pro_rata() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 700);
    harness.bid(1, ALICE, price(2), 700, 100).await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 2_000);
    harness.bid(2, BOB, price(2), 1_300, 100).await;

    let x7 = Q96 * U256::from(MPS_TOTAL) * U256::from(333u64);
    harness
        .checkpoint(150, price(2), 4_000_000, q96(2_000_000), x7)
        .await
        .unwrap();

    let small = harness.bid_state(1).await;
    let large = harness.bid_state(2).await;
    assert_eq!(small.amount_filled, currency(117));
    assert_eq!(large.amount_filled, currency(217));
    assert_eq!(small.tokens_filled, tokens(58));
    assert_eq!(large.tokens_filled, tokens(108));

    // each bid rounds up by at most one unit
    let total = small.amount_filled.as_u256() + large.amount_filled.as_u256();
    assert!(total <= U256::from(333u64 + 2));

    // marginal bids keep their reference block
    assert_eq!(small.last_fully_filled_checkpoint_block, BlockNumber::new(100));
    assert_eq!(small.outbid_checkpoint_block, None);
}

#[tokio::test]
async fn steps_cover_total_emission() {
    let harness = Harness::new().await;
    let steps = harness.dispatcher.store().steps(AUCTION).await.unwrap();

    let emission: u128 = steps.iter().map(|step| step.emission()).sum();
    assert_eq!(emission, u128::from(MPS_TOTAL));
    assert_eq!(steps.first().unwrap().start_block, BlockNumber::new(100));
    assert_eq!(steps.last().unwrap().end_block, BlockNumber::new(200));
    for pair in steps.windows(2) {
        assert_eq!(pair[0].end_block, pair[1].start_block);
    }
}

#[tokio::test]
async fn undecodable_config_is_backfilled_from_the_schedule_pointer() {
    let harness = Harness::with_config(Bytes::from_static(&[0xde, 0xad])).await;
    let store = harness.dispatcher.store();

    let auction = store.auction(AUCTION).await.unwrap();
    assert_eq!(auction.start_block, BlockNumber::new(100));
    assert_eq!(auction.floor_price, price(1));
    assert!(!auction.needs_backfill());

    let steps = store.steps(AUCTION).await.unwrap();
    assert_eq!(steps.len(), 2);
}

#[tokio::test]
async fn ticks_stay_strictly_ascending() {
    let mut harness = Harness::new().await;

    harness.chain.set_tick(price(3), Price::SENTINEL, 100);
    harness.chain.set_tick(price(1), price(3), 0);
    harness.bid(1, ALICE, price(3), 100, 100).await;

    harness.chain.set_tick(price(5), Price::SENTINEL, 100);
    harness.chain.set_tick(price(3), price(5), 100);
    harness.bid(2, BOB, price(5), 100, 100).await;

    // lands between the floor and 3
    harness.chain.set_tick(price(2), price(3), 100);
    harness.chain.set_tick(price(1), price(2), 0);
    harness.bid(3, BOB, price(2), 100, 100).await;

    let ticks = harness.dispatcher.store().ticks(AUCTION).await.unwrap();
    let prices: Vec<Price> = ticks.iter().map(|tick| tick.price).collect();
    assert_eq!(prices, vec![price(1), price(2), price(3), price(5)]);
    assert!(prices.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(ticks.last().unwrap().next_price.is_sentinel());
}

#[tokio::test]
async fn replaying_an_event_is_a_no_op() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);

    let event = AuctionEvent {
        emitter: AUCTION,
        meta: meta(100, 90),
        kind: EventKind::BidSubmitted {
            id: BidId::new(U256::from(1u8)),
            owner: ALICE,
            price: price(2),
            amount: currency(1_000),
        },
    };
    assert_eq!(harness.dispatcher.dispatch(&event).await.unwrap(), Outcome::Applied);
    let store = harness.dispatcher.store();
    let once = store.auction_detail(AUCTION, 10, 10).await.unwrap();
    let ticks_once = store.ticks(AUCTION).await.unwrap();

    assert_eq!(harness.dispatcher.dispatch(&event).await.unwrap(), Outcome::Duplicate);
    let twice = store.auction_detail(AUCTION, 10, 10).await.unwrap();
    assert_eq!(once.auction, twice.auction);
    assert_eq!(once.bids, twice.bids);
    assert_eq!(ticks_once, store.ticks(AUCTION).await.unwrap());
    assert_eq!(twice.auction.num_bids, 1);
}

#[tokio::test]
async fn out_of_order_checkpoint_halts_the_auction() {
    let mut harness = Harness::new().await;
    harness
        .checkpoint(150, price(1), 1_000_000, q96(1_000_000), U256::ZERO)
        .await
        .unwrap();

    // logged after the block-150 checkpoint but claiming an earlier block
    harness
        .chain
        .set_checkpoint(120, snapshot(price(1), 2_000_000, q96(2_000_000), U256::ZERO));
    let err = harness
        .apply(
            155,
            EventKind::CheckpointUpdated {
                block: BlockNumber::new(120),
                clearing_price: price(1),
                cumulative_mps: Mps::new(2_000_000),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Ordering(OrderingError::CheckpointNotIncreasing { .. })
    ));

    let detail = harness.dispatcher.store().auction_detail(AUCTION, 0, 10).await.unwrap();
    assert!(detail.halted.is_some());
    assert_eq!(detail.auction.last_checkpointed_block, BlockNumber::new(150));

    let err = harness
        .checkpoint(160, price(1), 2_000_000, q96(2_000_000), U256::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Halted { .. })));
}

#[tokio::test]
async fn missing_reference_checkpoint_is_fatal() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    // no checkpoint was ever recorded at block 130
    harness.bid(1, ALICE, price(2), 1_000, 130).await;

    let err = harness
        .checkpoint(150, price(1), 1_000_000, q96(1_000_000), U256::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Consistency(ConsistencyError::MissingCheckpoint { .. })
    ));

    let detail = harness.dispatcher.store().auction_detail(AUCTION, 10, 10).await.unwrap();
    assert!(detail.halted.is_some());
    assert_eq!(detail.checkpoints.len(), 1);
    assert_eq!(detail.bids[0].tokens_filled, TokenAmount::ZERO);
}

#[tokio::test]
async fn outbid_bid_freezes_its_fill() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    harness.bid(1, ALICE, price(2), 1_000, 100).await;
    harness
        .checkpoint(150, price(1), 5_000_000, q96(5_000_000), U256::ZERO)
        .await
        .unwrap();
    harness
        .checkpoint(160, price(3), 6_000_000, q96(5_000_000) + q96(1_000_000) / U256::from(3u8), U256::ZERO)
        .await
        .unwrap();

    let frozen = harness.bid_state(1).await;
    assert_eq!(frozen.outbid_checkpoint_block, Some(BlockNumber::new(160)));
    assert_eq!(frozen.tokens_filled, tokens(500));

    harness
        .checkpoint(170, price(4), 9_000_000, q96(6_000_000), U256::ZERO)
        .await
        .unwrap();
    let later = harness.bid_state(1).await;
    assert_eq!(later.outbid_checkpoint_block, Some(BlockNumber::new(160)));
    assert_eq!(later.tokens_filled, frozen.tokens_filled);
    assert_eq!(later.amount_filled, frozen.amount_filled);
}

#[tokio::test]
async fn failed_read_leaves_state_untouched_and_is_retryable() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);

    let event = AuctionEvent {
        emitter: AUCTION,
        meta: meta(100, 90),
        kind: EventKind::BidSubmitted {
            id: BidId::new(U256::from(1u8)),
            owner: ALICE,
            price: price(2),
            amount: currency(1_000),
        },
    };

    harness.chain.fail_next(1);
    let err = harness.dispatcher.dispatch(&event).await.unwrap_err();
    assert!(err.is_transient());

    let store = harness.dispatcher.store();
    let detail = store.auction_detail(AUCTION, 10, 10).await.unwrap();
    assert!(detail.bids.is_empty());
    assert!(detail.halted.is_none());

    let reads_before = harness.chain.read_count();
    assert_eq!(harness.dispatcher.dispatch(&event).await.unwrap(), Outcome::Applied);
    assert!(harness.chain.read_count() > reads_before);
    assert_eq!(store.auction(AUCTION).await.unwrap().num_bids, 1);
}

#[tokio::test]
async fn claim_records_final_tokens() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 1_000);
    harness.bid(1, ALICE, price(2), 1_000, 100).await;

    harness
        .apply(
            400,
            EventKind::TokensClaimed {
                bid_id: BidId::new(U256::from(1u8)),
                owner: ALICE,
                tokens_filled: tokens(640),
            },
        )
        .await
        .unwrap();

    let bid = harness.bid_state(1).await;
    assert!(bid.claimed);
    assert_eq!(bid.claimed_block, Some(BlockNumber::new(400)));
    assert_eq!(bid.tokens_claimed, tokens(640));
    assert_eq!(bid.tokens_filled, tokens(640));
}

#[tokio::test]
async fn empty_schedule_pointer_backfills_without_steps() {
    let chain = FakeChain::default();
    chain.set_steps_data(Vec::new());
    let harness = Harness::with_chain(chain, Bytes::from_static(&[0xde, 0xad])).await;
    let store = harness.dispatcher.store();

    let detail = store.auction_detail(AUCTION, 10, 10).await.unwrap();
    assert!(detail.halted.is_none());
    assert!(!detail.auction.needs_backfill());
    assert_eq!(detail.auction.end_block, BlockNumber::new(200));
    assert!(detail.steps.is_empty());
    assert_eq!(detail.checkpoints.len(), 1);
}

#[tokio::test]
async fn out_of_range_read_halts_instead_of_retrying() {
    let mut harness = Harness::new().await;
    harness.chain.corrupt_checkpoints();

    let err = harness
        .checkpoint(150, price(1), 1_000_000, q96(1_000_000), U256::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Read(ReadError::OutOfRange("cumulativeMps"))));
    assert!(!err.is_transient());

    let detail = harness.dispatcher.store().auction_detail(AUCTION, 0, 10).await.unwrap();
    assert!(detail.halted.is_some());
    assert_eq!(detail.checkpoints.len(), 1);

    let err = harness
        .checkpoint(160, price(1), 2_000_000, q96(2_000_000), U256::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Halted { .. })));
}

#[tokio::test]
async fn recorded_step_sets_the_current_rate() {
    let mut harness = Harness::new().await;
    let first = AuctionEvent {
        emitter: AUCTION,
        meta: meta(100, 80),
        kind: EventKind::StepRecorded {
            start_block: BlockNumber::new(100),
            end_block: BlockNumber::new(140),
            mps: 100_000,
        },
    };
    assert_eq!(harness.dispatcher.dispatch(&first).await.unwrap(), Outcome::Applied);

    let store = harness.dispatcher.store();
    let expected = CurrentStep {
        mps: 100_000,
        start_block: BlockNumber::new(100),
        end_block: BlockNumber::new(140),
    };
    assert_eq!(store.auction(AUCTION).await.unwrap().current_step, Some(expected));

    let applied = store.auction(AUCTION).await.unwrap();
    assert_eq!(harness.dispatcher.dispatch(&first).await.unwrap(), Outcome::Duplicate);
    assert_eq!(store.auction(AUCTION).await.unwrap(), applied);

    harness
        .apply(
            140,
            EventKind::StepRecorded {
                start_block: BlockNumber::new(140),
                end_block: BlockNumber::new(200),
                mps: 100_000,
            },
        )
        .await
        .unwrap();
    let current = harness.dispatcher.store().auction(AUCTION).await.unwrap().current_step.unwrap();
    assert_eq!(current.start_block, BlockNumber::new(140));
    assert_eq!(current.end_block, BlockNumber::new(200));
}

#[tokio::test]
async fn marginal_fill_follows_running_total_at_clearing_price() {
    let mut harness = Harness::new().await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 700);
    harness.bid(1, ALICE, price(2), 700, 100).await;
    harness.chain.set_tick(price(2), Price::SENTINEL, 2_000);
    harness.bid(2, BOB, price(2), 1_300, 100).await;

    let raised = |units: u64| Q96 * U256::from(MPS_TOTAL) * U256::from(units);
    harness
        .checkpoint(150, price(2), 4_000_000, q96(2_000_000), raised(333))
        .await
        .unwrap();
    harness
        .checkpoint(170, price(2), 6_000_000, q96(3_000_000), raised(666))
        .await
        .unwrap();

    // recomputed from the latest total, not accumulated per checkpoint
    let small = harness.bid_state(1).await;
    let large = harness.bid_state(2).await;
    assert_eq!(small.amount_filled, currency(234));
    assert_eq!(large.amount_filled, currency(433));
    assert_eq!(small.tokens_filled, tokens(116));
    assert_eq!(large.tokens_filled, tokens(216));
    assert_eq!(small.last_fully_filled_checkpoint_block, BlockNumber::new(100));
}
