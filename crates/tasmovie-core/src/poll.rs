//! Per-control poll bookkeeping for the current frame.
//!
//! Each control slot is one `u32`: the top bit is DRDY (fresh data ready),
//! the low 31 bits count how many times the control was polled this frame.
//! One extra flag records whether the system (reset) state was polled.

use crate::error::{Error, Result};
use crate::port::TOTAL_CONTROLS;

const DRDY: u32 = 0x8000_0000;
const COUNT_MASK: u32 = 0x7FFF_FFFF;

/// Reserved words at the start of the save block.
const SAVE_HEADER_WORDS: usize = 4;
/// Length of the block produced by [`PollCounters::save_state`].
pub const POLL_SAVE_WORDS: usize = TOTAL_CONTROLS + SAVE_HEADER_WORDS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCounters {
    counters: [u32; TOTAL_CONTROLS],
    system: bool,
}

impl Default for PollCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl PollCounters {
    pub fn new() -> Self {
        Self {
            counters: [0; TOTAL_CONTROLS],
            system: false,
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> Result<u32> {
        self.counters
            .get(index)
            .copied()
            .ok_or(Error::InvalidControlIndex(index))
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> Result<&mut u32> {
        self.counters
            .get_mut(index)
            .ok_or(Error::InvalidControlIndex(index))
    }

    /// Zeroes every count, DRDY bit and the system flag.
    pub fn clear(&mut self) {
        self.counters = [0; TOTAL_CONTROLS];
        self.system = false;
    }

    /// Marks fresh data on every control. Counts are left alone.
    pub fn set_all_drdy(&mut self) {
        for slot in &mut self.counters {
            *slot |= DRDY;
        }
    }

    pub fn clear_drdy(&mut self, index: usize) -> Result<()> {
        *self.slot_mut(index)? &= !DRDY;
        Ok(())
    }

    pub fn get_drdy(&self, index: usize) -> Result<bool> {
        Ok(self.slot(index)? & DRDY != 0)
    }

    /// Reads and clears the DRDY bit.
    pub fn take_drdy(&mut self, index: usize) -> Result<bool> {
        let slot = self.slot_mut(index)?;
        let ready = *slot & DRDY != 0;
        *slot &= !DRDY;
        Ok(ready)
    }

    /// Bumps the poll count of `index`, returning the count before the bump.
    pub fn increment(&mut self, index: usize) -> Result<u32> {
        let slot = self.slot_mut(index)?;
        let previous = *slot & COUNT_MASK;
        *slot = (*slot & DRDY) | (previous.wrapping_add(1) & COUNT_MASK);
        Ok(previous)
    }

    pub fn polls(&self, index: usize) -> Result<u32> {
        Ok(self.slot(index)? & COUNT_MASK)
    }

    pub fn set_system(&mut self) {
        self.system = true;
    }

    pub fn system(&self) -> bool {
        self.system
    }

    /// True once anything was polled since the last [`clear`](Self::clear).
    pub fn has_polled(&self) -> bool {
        self.system || self.counters.iter().any(|&slot| slot & COUNT_MASK != 0)
    }

    /// Highest poll count of any control; a polled system counts as one.
    pub fn max_polls(&self) -> u32 {
        let controls = self
            .counters
            .iter()
            .map(|&slot| slot & COUNT_MASK)
            .max()
            .unwrap_or(0);
        controls.max(u32::from(self.system))
    }

    /// Flat save block: four legacy header words, then one word per control.
    ///
    /// Word 0 is always `0x80000000`; words 1 to 3 repeat the system flag
    /// (`1` when polled, `0x80000000` otherwise).
    pub fn save_state(&self) -> Vec<u32> {
        let system = if self.system { 1 } else { DRDY };
        let mut block = Vec::with_capacity(POLL_SAVE_WORDS);
        block.extend_from_slice(&[DRDY, system, system, system]);
        block.extend_from_slice(&self.counters);
        block
    }

    /// Validates the length of a save block.
    pub fn check(block: &[u32]) -> Result<()> {
        if block.len() != POLL_SAVE_WORDS {
            return Err(Error::BadSaveStateSize {
                expected: POLL_SAVE_WORDS,
                actual: block.len(),
            });
        }
        Ok(())
    }

    pub fn load_state(&mut self, block: &[u32]) -> Result<()> {
        Self::check(block)?;
        self.system = (block[1] | block[2] | block[3]) & COUNT_MASK != 0;
        self.counters.copy_from_slice(&block[SAVE_HEADER_WORDS..]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_tracks_counts() {
        let mut polls = PollCounters::new();
        assert!(!polls.has_polled());
        assert_eq!(polls.increment(5).expect("slot"), 0);
        assert!(polls.has_polled());
        assert_eq!(polls.increment(5).expect("slot"), 1);
        assert_eq!(polls.increment(7).expect("slot"), 0);
        assert_eq!(polls.polls(5).expect("slot"), 2);
        assert_eq!(polls.max_polls(), 2);
        polls.clear();
        assert!(!polls.has_polled());
        assert_eq!(polls.max_polls(), 0);
    }

    #[test]
    fn system_counts_as_one_poll() {
        let mut polls = PollCounters::new();
        polls.set_system();
        assert!(polls.has_polled());
        assert_eq!(polls.max_polls(), 1);
    }

    #[test]
    fn drdy_is_independent_of_counts() {
        let mut polls = PollCounters::new();
        polls.increment(3).expect("slot");
        polls.set_all_drdy();
        assert_eq!(polls.polls(3).expect("slot"), 1);
        polls.increment(3).expect("slot");
        assert!(polls.get_drdy(3).expect("slot"));
        assert_eq!(polls.polls(3).expect("slot"), 2);

        for index in 0..TOTAL_CONTROLS {
            assert!(polls.take_drdy(index).expect("slot"));
        }
        assert!((0..TOTAL_CONTROLS).all(|i| !polls.get_drdy(i).expect("slot")));

        polls.set_all_drdy();
        polls.clear_drdy(0).expect("slot");
        assert!(!polls.get_drdy(0).expect("slot"));
        assert!(polls.get_drdy(1).expect("slot"));
    }

    #[test]
    fn out_of_range_controls() {
        let mut polls = PollCounters::new();
        assert!(matches!(
            polls.increment(TOTAL_CONTROLS),
            Err(Error::InvalidControlIndex(96))
        ));
        assert!(polls.get_drdy(1000).is_err());
    }

    #[test]
    fn save_block_layout() {
        let mut polls = PollCounters::new();
        let block = polls.save_state();
        assert_eq!(block.len(), 100);
        assert_eq!(&block[..4], &[0x8000_0000; 4]);

        polls.set_system();
        polls.increment(0).expect("slot");
        polls.increment(95).expect("slot");
        polls.set_all_drdy();
        let block = polls.save_state();
        assert_eq!(&block[..4], &[0x8000_0000, 1, 1, 1]);
        assert_eq!(block[4], 0x8000_0001);
        assert_eq!(block[99], 0x8000_0001);

        let mut restored = PollCounters::new();
        restored.load_state(&block).expect("load");
        assert_eq!(restored, polls);
    }

    #[test]
    fn load_rejects_wrong_length() {
        let mut polls = PollCounters::new();
        polls.increment(1).expect("slot");
        let before = polls.clone();
        assert!(matches!(
            polls.load_state(&[0; 99]),
            Err(Error::BadSaveStateSize {
                expected: 100,
                actual: 99
            })
        ));
        assert_eq!(polls, before);
    }
}
