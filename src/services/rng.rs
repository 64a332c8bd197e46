use rand::Rng;

/// Uniform percentage source backing the probability gate. Swappable so a
/// fixed sequence can reproduce a plan exactly in tests.
pub trait RandomSource {
    /// One uniform draw in `[0, 100)`.
    fn roll_percent(&mut self) -> f32;
}

/// Production source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll_percent(&mut self) -> f32 {
        rand::rng().random_range(0.0..100.0)
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
#[derive(Debug, Clone, Default)]
pub struct FixedRolls {
    rolls: Vec<f32>,
    next: usize,
}

impl FixedRolls {
    #[must_use]
    pub fn new(rolls: Vec<f32>) -> Self {
        Self { rolls, next: 0 }
    }
}

impl RandomSource for FixedRolls {
    fn roll_percent(&mut self) -> f32 {
        if self.rolls.is_empty() {
            return 0.0;
        }
        let roll = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        roll
    }
}
