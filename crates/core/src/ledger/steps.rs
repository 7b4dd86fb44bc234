use tracing::warn;

use crate::{
    math::MPS_TOTAL,
    types::{
        primitives::BlockNumber,
        step::{CurrentStep, Step},
    },
};

use super::AuctionLedger;

/// Width of one packed schedule record: 3 bytes of mps, 5 bytes of block delta.
pub const STEP_RECORD_LEN: usize = 8;

const MPS_LEN: usize = 3;

/// Decodes packed step records into absolute block ranges starting at
/// `start_block`.
///
/// The blob carries no length prefix, so a short trailing chunk ends the
/// schedule instead of failing it.
pub fn parse_steps(data: &[u8], start_block: BlockNumber) -> Vec<Step> {
    let mut steps = Vec::with_capacity(data.len() / STEP_RECORD_LEN);
    let mut cursor = start_block.as_u64();

    for (index, record) in data.chunks_exact(STEP_RECORD_LEN).enumerate() {
        let (mps_bytes, delta_bytes) = record.split_at(MPS_LEN);
        let mps = be_u64(mps_bytes) as u32;
        let delta = be_u64(delta_bytes);

        let Some(end) = cursor.checked_add(delta) else {
            warn!(index, delta, "step block range overflows, truncating schedule");
            break;
        };

        steps.push(Step {
            index: index as u32,
            mps,
            start_block: BlockNumber::new(cursor),
            end_block: BlockNumber::new(end),
        });
        cursor = end;
    }

    let total = total_emission(&steps);
    if !steps.is_empty() && total != u128::from(MPS_TOTAL) {
        warn!(total, expected = MPS_TOTAL, "step schedule does not sum to total emission");
    }

    steps
}

pub fn total_emission(steps: &[Step]) -> u128 {
    steps.iter().map(Step::emission).sum()
}

impl AuctionLedger {
    /// Parsed schedule segment in force at `block`.
    pub fn scheduled_step(&self, block: BlockNumber) -> Option<&Step> {
        self.steps.iter().find(|step| step.contains(block))
    }

    /// The rate reported on chain. A rate that disagrees with the parsed
    /// schedule is kept but logged.
    pub(crate) fn record_step(
        &self,
        start_block: BlockNumber,
        end_block: BlockNumber,
        mps: u32,
    ) -> CurrentStep {
        if let Some(scheduled) = self.scheduled_step(start_block) {
            if scheduled.mps != mps {
                warn!(
                    auction = %self.auction.address,
                    %start_block,
                    recorded = mps,
                    scheduled = scheduled.mps,
                    "recorded step rate differs from parsed schedule"
                );
            }
        }
        CurrentStep {
            mps,
            start_block,
            end_block,
        }
    }
}

fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
