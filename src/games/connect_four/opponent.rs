//! Opponent move selection.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::Board;

/// Chooses the automated opponent's column.
pub trait Opponent: Send {
    /// Picks one of `legal` (never empty, ascending) for the current `board`.
    fn choose_column(&mut self, board: &Board, legal: &[usize]) -> usize;
}

/// Picks uniformly at random among the legal columns.
#[derive(Debug, Clone)]
pub struct RandomOpponent<R = StdRng> {
    rng: R,
}

impl RandomOpponent<StdRng> {
    /// Seeds from operating-system entropy.
    #[instrument]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds deterministically, for reproducible games.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> Opponent for RandomOpponent<R> {
    fn choose_column(&mut self, _board: &Board, legal: &[usize]) -> usize {
        // The resolver only asks while some column is open.
        let column = legal.choose(&mut self.rng).copied().unwrap_or(0);
        debug!(column, legal = ?legal, "Opponent chose column");
        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_choice_is_always_legal() {
        let mut opponent = RandomOpponent::seeded(7);
        let board = Board::new();
        let legal = [1, 4, 6];
        for _ in 0..100 {
            assert!(legal.contains(&opponent.choose_column(&board, &legal)));
        }
    }

    #[test]
    fn test_same_seed_same_choices() {
        let board = Board::new();
        let legal: Vec<usize> = (0..7).collect();
        let mut a = RandomOpponent::seeded(42);
        let mut b = RandomOpponent::seeded(42);
        let picks_a: Vec<_> = (0..20).map(|_| a.choose_column(&board, &legal)).collect();
        let picks_b: Vec<_> = (0..20).map(|_| b.choose_column(&board, &legal)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_single_legal_column() {
        let mut opponent = RandomOpponent::seeded(1);
        assert_eq!(opponent.choose_column(&Board::new(), &[5]), 5);
    }
}
