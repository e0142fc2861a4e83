//! Injected randomness
//!
//! The engine never owns a global RNG. Every roll and shuffle goes through a
//! `Dice` handed to `Game::new`, so a seed (or a script) fixes the game.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

pub trait Dice: Send {
    /// One six-sided die, 1..=6
    fn roll(&mut self) -> u8;

    /// Uniform index in `0..n`; `n` is at least 1
    fn pick(&mut self, n: usize) -> usize;
}

/// Seeded ChaCha dice
#[derive(Clone, Debug)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    fn pick(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n.max(1))
    }
}

/// Replays a fixed list of rolls, then falls back to a constant.
///
/// `pick` always answers 0, which leaves shuffles in their input order.
#[derive(Clone, Debug)]
pub struct ScriptedDice {
    rolls: VecDeque<u8>,
    fallback: u8,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self { rolls: rolls.into_iter().collect(), fallback: 1 }
    }

    pub fn with_fallback(mut self, fallback: u8) -> Self {
        self.fallback = fallback.clamp(1, 6);
        self
    }

    pub fn push(&mut self, roll: u8) {
        self.rolls.push_back(roll);
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> u8 {
        self.rolls.pop_front().unwrap_or(self.fallback).clamp(1, 6)
    }

    fn pick(&mut self, _n: usize) -> usize {
        0
    }
}

/// Fisher-Yates shuffle driven by a `Dice`
pub fn shuffle<T>(items: &mut [T], dice: &mut dyn Dice) {
    for i in (1..items.len()).rev() {
        let j = dice.pick(i + 1).min(i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_dice_repeat() {
        let mut a = SeededDice::new(7);
        let mut b = SeededDice::new(7);
        let ra: Vec<u8> = (0..20).map(|_| a.roll()).collect();
        let rb: Vec<u8> = (0..20).map(|_| b.roll()).collect();
        assert_eq!(ra, rb);
        assert!(ra.iter().all(|r| (1..=6).contains(r)));
    }

    #[test]
    fn test_scripted_dice() {
        let mut dice = ScriptedDice::new([6, 3]).with_fallback(2);
        assert_eq!(dice.roll(), 6);
        assert_eq!(dice.roll(), 3);
        assert_eq!(dice.roll(), 2);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut items: Vec<u32> = (0..10).collect();
        shuffle(&mut items, &mut SeededDice::new(3));
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());

        let mut fixed = vec![1, 2, 3];
        shuffle(&mut fixed, &mut ScriptedDice::new([]));
        // pick() == 0 swaps each tail element to the front in turn
        assert_eq!(fixed, vec![2, 3, 1]);
    }
}
