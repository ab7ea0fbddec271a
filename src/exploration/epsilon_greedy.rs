use rand::Rng;

use crate::{decay::Decay, util::check_interval, Result};

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Ensure every epsilon the schedule can produce is a probability
    pub fn validate(&self) -> Result<()> {
        let (min_epsilon, max_epsilon) = self.epsilon.range();
        check_interval!(min_epsilon, 0.0, max_epsilon);
        check_interval!(max_epsilon, min_epsilon, 1.0);
        Ok(())
    }

    /// Epsilon threshold for the given episode
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode as f64)
    }

    /// Invoke epsilon greedy policy for the given episode, drawing from `rng`
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon(episode) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
