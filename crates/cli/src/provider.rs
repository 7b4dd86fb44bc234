use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use tracing::warn;

/// Connects over whatever transport the URL names (http, ws, ipc).
pub async fn connect(rpc_url: &str) -> eyre::Result<DynProvider> {
    let provider = ProviderBuilder::new().connect(rpc_url).await?;
    Ok(provider.erased())
}

pub async fn check_chain_id(provider: &DynProvider, expected: u64) -> eyre::Result<()> {
    let actual = provider.get_chain_id().await?;
    if actual != expected {
        warn!(expected, actual, "connected chain id differs from config");
    }
    Ok(())
}
