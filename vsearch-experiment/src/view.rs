use crate::Summary;
use vsearch_core::{Response, StimulusItem};

/// What the presentation layer should show right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentView<'a> {
    Setup {
        /// Last validation failure, if any.
        message: Option<&'a str>,
    },
    Instructions {
        total_trials: usize,
    },
    Fixation {
        progress: (usize, usize),
    },
    Trial {
        stimuli: &'a [StimulusItem],
        progress: (usize, usize),
    },
    Feedback {
        outcome: Outcome,
        progress: (usize, usize),
    },
    Results {
        summary: &'a Summary,
    },
}

/// Feedback payload for the trial that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub response: Response,
    pub correct: bool,
    pub reaction_time_ms: u64,
}

impl Outcome {
    pub fn message(&self) -> String {
        match (self.response, self.correct) {
            (Response::Timeout, _) => "Too slow!".to_string(),
            (_, true) => format!("Correct ({} ms)", self.reaction_time_ms),
            (_, false) => "Incorrect".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_messages() {
        let hit = Outcome {
            response: Response::Present,
            correct: true,
            reaction_time_ms: 412,
        };
        assert_eq!(hit.message(), "Correct (412 ms)");
        let slow = Outcome {
            response: Response::Timeout,
            correct: false,
            reaction_time_ms: 4000,
        };
        assert_eq!(slow.message(), "Too slow!");
    }
}
