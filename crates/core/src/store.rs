use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use tokio::sync::RwLock;

use crate::{error::StoreError, ledger::AuctionLedger};

/// In-memory derived-state store, one ledger per auction.
///
/// Only the dispatcher writes; queries get owned copies under the read lock,
/// so an event is either fully visible or not at all.
#[derive(Clone, Default)]
pub struct MemoryStore {
    ledgers: Arc<RwLock<HashMap<Address, AuctionLedger>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.ledgers.read().await.keys().copied().collect();
        addresses.sort();
        addresses
    }

    /// Returns `false` when the auction was already registered.
    pub(crate) async fn insert(&self, ledger: AuctionLedger) -> bool {
        let mut ledgers = self.ledgers.write().await;
        if ledgers.contains_key(&ledger.address()) {
            return false;
        }
        ledgers.insert(ledger.address(), ledger);
        true
    }

    pub async fn read<T>(
        &self,
        auction: Address,
        f: impl FnOnce(&AuctionLedger) -> T,
    ) -> Result<T, StoreError> {
        let ledgers = self.ledgers.read().await;
        let ledger = ledgers
            .get(&auction)
            .ok_or(StoreError::UnknownAuction(auction))?;
        Ok(f(ledger))
    }

    pub(crate) async fn update<T>(
        &self,
        auction: Address,
        f: impl FnOnce(&mut AuctionLedger) -> T,
    ) -> Result<T, StoreError> {
        let mut ledgers = self.ledgers.write().await;
        let ledger = ledgers
            .get_mut(&auction)
            .ok_or(StoreError::UnknownAuction(auction))?;
        Ok(f(ledger))
    }

    pub(crate) async fn with_all<T>(&self, f: impl FnOnce(&HashMap<Address, AuctionLedger>) -> T) -> T {
        f(&*self.ledgers.read().await)
    }
}
