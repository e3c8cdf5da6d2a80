use crate::ExperimentConfig;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use vsearch_core::Trial;

/// Result of moving the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Complete,
}

/// Owns the trial list of one session and the presentation cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSequencer {
    trials: Vec<Trial>,
    cursor: usize,
}

impl TrialSequencer {
    /// Builds `|set_sizes| * trials_per_set` trials, then shuffles them once.
    ///
    /// Within each set size the first half (by construction) is
    /// target-present. The shuffle is a Fisher-Yates permutation, so every
    /// order is equally likely; indices are assigned afterwards and follow
    /// presentation order.
    pub fn build<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Self {
        let half = config.trials_per_set / 2;
        let mut trials: Vec<Trial> = config
            .set_sizes
            .iter()
            .flat_map(|&set_size| {
                (0..config.trials_per_set).map(move |i| Trial::new(0, set_size, i < half))
            })
            .collect();

        trials.shuffle(rng);
        for (index, trial) in trials.iter_mut().enumerate() {
            trial.index = index;
        }

        Self { trials, cursor: 0 }
    }

    /// Moves to the next trial. Past the last one the cursor parks at the end.
    pub fn advance(&mut self) -> Advance {
        if self.cursor + 1 < self.trials.len() {
            self.cursor += 1;
            Advance::Next(self.cursor)
        } else {
            self.cursor = self.trials.len();
            Advance::Complete
        }
    }

    pub fn current(&self) -> Option<&Trial> {
        self.trials.get(self.cursor)
    }

    pub fn current_mut(&mut self) -> Option<&mut Trial> {
        self.trials.get_mut(self.cursor)
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.trials.len()
    }

    /// `(current index, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor.min(self.trials.len()), self.trials.len())
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Trials that already have a terminal outcome, in presentation order.
    pub fn completed(&self) -> Vec<Trial> {
        self.trials
            .iter()
            .filter(|t| t.is_complete())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn indices_follow_presentation_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let seq = TrialSequencer::build(&ExperimentConfig::default(), &mut rng);
        for (i, trial) in seq.trials().iter().enumerate() {
            assert_eq!(trial.index, i);
        }
    }

    #[test]
    fn advance_reports_completion_once_past_end() {
        let config = ExperimentConfig {
            set_sizes: vec![5],
            trials_per_set: 2,
            ..ExperimentConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut seq = TrialSequencer::build(&config, &mut rng);

        assert_eq!(seq.progress(), (0, 2));
        assert_eq!(seq.advance(), Advance::Next(1));
        assert_eq!(seq.advance(), Advance::Complete);
        assert!(seq.is_complete());
        assert!(seq.current().is_none());
        assert_eq!(seq.advance(), Advance::Complete);
        assert_eq!(seq.progress(), (2, 2));
    }

    #[test]
    fn shuffle_interleaves_set_sizes() {
        // Construction order is blocked by set size; a uniform permutation
        // of 40 trials leaving all four blocks intact is vanishingly rare.
        let mut rng = StdRng::seed_from_u64(11);
        let seq = TrialSequencer::build(&ExperimentConfig::default(), &mut rng);
        let sizes: Vec<u32> = seq.trials().iter().map(|t| t.set_size).collect();
        let mut blocked = sizes.clone();
        blocked.sort();
        assert_ne!(sizes, blocked);
    }
}
