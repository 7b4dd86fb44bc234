use serde::Serialize;

use super::primitives::BlockNumber;

/// One emission-rate segment covering `[start_block, end_block)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub index: u32,
    pub mps: u32,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
}

impl Step {
    pub fn block_length(&self) -> u64 {
        self.end_block.as_u64().saturating_sub(self.start_block.as_u64())
    }

    /// Emission units released over the whole segment.
    pub fn emission(&self) -> u128 {
        u128::from(self.mps) * u128::from(self.block_length())
    }

    pub fn contains(&self, block: BlockNumber) -> bool {
        self.start_block <= block && block < self.end_block
    }
}

/// Rate currently in force, as last reported by `AuctionStepRecorded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStep {
    pub mps: u32,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
}
