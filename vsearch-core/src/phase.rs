use serde::{Deserialize, Serialize};

/// Defines experiment phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    /// Whether a present/absent response is captured in this phase.
    fn accepts_response(&self) -> bool;
    fn next(&self, trials_remaining: bool) -> Option<Self>;

    fn is_setup(&self) -> bool {
        false
    }
    fn is_results(&self) -> bool {
        false
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchPhase {
    #[default]
    Setup,
    Instructions,
    Fixation,
    Trial,
    Feedback,
    Results,
}

impl Phase for SearchPhase {
    fn accepts_response(&self) -> bool {
        matches!(self, Self::Trial)
    }

    fn next(&self, trials_remaining: bool) -> Option<Self> {
        use SearchPhase::*;
        Some(match self {
            Setup => Instructions,
            Instructions => Fixation,
            Fixation => Trial,
            Trial => Feedback,
            Feedback if trials_remaining => Fixation,
            Feedback => Results,
            Results => return None,
        })
    }

    fn is_setup(&self) -> bool {
        matches!(self, SearchPhase::Setup)
    }

    fn is_results(&self) -> bool {
        matches!(self, SearchPhase::Results)
    }
}

impl std::fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SearchPhase::Setup => "setup",
            SearchPhase::Instructions => "instructions",
            SearchPhase::Fixation => "fixation",
            SearchPhase::Trial => "trial",
            SearchPhase::Feedback => "feedback",
            SearchPhase::Results => "results",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_branches_on_remaining_trials() {
        assert_eq!(
            SearchPhase::Feedback.next(true),
            Some(SearchPhase::Fixation)
        );
        assert_eq!(
            SearchPhase::Feedback.next(false),
            Some(SearchPhase::Results)
        );
        assert_eq!(SearchPhase::Results.next(true), None);
    }

    #[test]
    fn only_trial_accepts_responses() {
        use SearchPhase::*;
        for phase in [Setup, Instructions, Fixation, Feedback, Results] {
            assert!(!phase.accepts_response(), "{phase} accepted a response");
        }
        assert!(Trial.accepts_response());
    }
}
