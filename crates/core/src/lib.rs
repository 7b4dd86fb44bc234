pub mod blocks;
pub mod dispatcher;
pub mod error;
pub mod indexer;
pub mod ledger;
pub mod math;
pub mod query;
pub mod reader;
pub mod source;
pub mod store;
pub mod types;

pub use dispatcher::{Dispatcher, Outcome};
pub use error::*;
pub use indexer::{Indexer, IndexerConfig, RetryPolicy};
pub use ledger::AuctionLedger;
pub use query::{AuctionDetail, BidQuery, Order};
pub use reader::{ChainReader, RpcReader};
pub use store::MemoryStore;
pub use types::*;
