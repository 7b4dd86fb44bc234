pub mod cca;
pub mod factory;

pub use cca::{AuctionParameters, AuctionStep, Checkpoint, IContinuousClearingAuction, Tick};
pub use factory::IContinuousClearingAuctionFactory;
