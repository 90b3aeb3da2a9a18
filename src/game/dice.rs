//! Random outcome source for damage rolls and event selection.
//!
//! Every engine function takes `&mut dyn Dice` instead of reaching for a global generator, so a
//! seeded `StdRng` reproduces a whole battle and [`ScriptedDice`] can force exact rolls.

use std::collections::VecDeque;

use rand::Rng;

pub trait Dice {
    /// Uniform integer in `low..high`. Returns `low` when the range is empty.
    fn roll(&mut self, low: u32, high: u32) -> u32;

    /// True with the given probability in percent (0 never, 100 always).
    fn percent(&mut self, chance: u32) -> bool;

    /// Index into a slice of `len` elements; `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize {
        self.roll(0, len as u32) as usize
    }
}

impl<R: Rng + ?Sized> Dice for R {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.gen_range(low..high)
    }

    fn percent(&mut self, chance: u32) -> bool {
        match chance {
            0 => false,
            c if c >= 100 => true,
            c => self.gen_range(0..100) < c,
        }
    }
}

/// Replays queued results. Rolls are clamped into the requested range; once a queue runs dry,
/// rolls return the lower bound and percentage checks fail.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDice {
    rolls: VecDeque<u32>,
    checks: VecDeque<bool>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>, checks: impl IntoIterator<Item = bool>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            checks: checks.into_iter().collect(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.rolls.is_empty() && self.checks.is_empty()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        match self.rolls.pop_front() {
            Some(v) => v.clamp(low, high - 1),
            None => low,
        }
    }

    fn percent(&mut self, _chance: u32) -> bool {
        self.checks.pop_front().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seeded_rolls_stay_in_range_and_repeat() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let x = a.roll(5, 25);
            assert!((5..25).contains(&x));
            assert_eq!(x, b.roll(5, 25));
        }
        assert!(!a.percent(0));
        assert!(a.percent(100));
        assert_eq!(a.roll(3, 3), 3);
    }

    #[test]
    fn scripted_dice_clamp_and_default() {
        let mut dice = ScriptedDice::new([100, 0, 7], [true]);
        assert_eq!(dice.roll(5, 25), 24);
        assert_eq!(dice.roll(10, 30), 10);
        assert_eq!(dice.pick(3), 2);
        assert!(dice.percent(5));
        assert!(dice.is_exhausted());
        assert!(!dice.percent(99));
        assert_eq!(dice.roll(1, 3), 1);
    }
}
