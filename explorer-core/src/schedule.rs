//! Token level schedule
//!
//! Static mapping `level -> max number at level`. Minting walks the slots in
//! `(level, number)` order and rolls to the next level once a level is full.
//! A level missing from the table ends the schedule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::MintPosition;

/// Per-level capacities of the production token economy
const PRODUCTION_LEVELS: [u64; 79] = [
    0, 5_000_000, 2_425_000, 2_303_750, 2_188_563, 2_079_134, 1_975_178, 1_876_419, 1_782_598,
    1_693_468, 1_608_795, 1_528_355, 1_451_937, 1_379_340, 1_310_373, 1_244_855, 1_182_612,
    1_123_481, 1_067_307, 1_013_942, 963_245, 915_082, 869_328, 825_862, 784_569, 745_340,
    708_073, 672_670, 639_036, 607_084, 576_730, 547_894, 520_499, 494_474, 469_750, 446_263,
    423_950, 402_752, 382_615, 363_484, 345_310, 328_044, 311_642, 296_060, 281_257, 267_194,
    253_834, 241_143, 229_085, 217_631, 206_750, 196_412, 186_592, 177_262, 168_399, 159_979,
    151_980, 144_381, 137_162, 130_304, 117_273, 105_546, 94_992, 85_492, 76_943, 69_249, 62_324,
    56_092, 50_482, 45_434, 40_891, 36_802, 33_121, 29_809, 26_828, 24_146, 21_731, 19_558,
    17_602,
];

/// Level capacity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSchedule {
    capacities: BTreeMap<u32, u64>,
}

impl Default for TokenSchedule {
    fn default() -> Self {
        Self::production()
    }
}

impl TokenSchedule {
    /// The production schedule (levels 0 through 78)
    pub fn production() -> Self {
        let capacities = PRODUCTION_LEVELS
            .iter()
            .enumerate()
            .map(|(level, cap)| (level as u32, *cap))
            .collect();
        Self { capacities }
    }

    /// Build a schedule from explicit `(level, capacity)` pairs
    ///
    /// Levels must be contiguous from 0 so that rolling over never skips a
    /// level.
    pub fn from_levels<I>(levels: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (u32, u64)>,
    {
        let capacities: BTreeMap<u32, u64> = levels.into_iter().collect();
        for (expected, level) in capacities.keys().enumerate() {
            if *level != expected as u32 {
                return Err(CoreError::InvalidSchedule(format!(
                    "levels must be contiguous from 0, missing level {}",
                    expected
                )));
            }
        }
        Ok(Self { capacities })
    }

    /// Capacity of a level, `None` past the end of the schedule
    pub fn capacity(&self, level: u32) -> Option<u64> {
        self.capacities.get(&level).copied()
    }

    /// Number of levels in the schedule
    pub fn levels(&self) -> usize {
        self.capacities.len()
    }

    /// Total number of mintable slots
    pub fn total_supply(&self) -> u64 {
        self.capacities.values().sum()
    }

    /// Final slot of the schedule
    pub fn last_position(&self) -> Option<MintPosition> {
        self.capacities
            .iter()
            .rev()
            .find(|(_, cap)| **cap > 0)
            .map(|(level, cap)| MintPosition::new(*level, *cap))
    }

    /// First valid slot at or after `position`
    ///
    /// Rolls forward over full or zero-capacity levels. Returns `None` when
    /// the schedule is exhausted.
    pub fn normalize(&self, position: MintPosition) -> Option<MintPosition> {
        let mut position = position;
        loop {
            let capacity = self.capacity(position.level)?;
            if position.number >= 1 && position.number <= capacity {
                return Some(position);
            }
            position = position.next_level();
        }
    }

    /// Slot following `position`, `None` when the schedule is exhausted
    pub fn advance(&self, position: MintPosition) -> Option<MintPosition> {
        self.normalize(position.next_number())
    }
}
