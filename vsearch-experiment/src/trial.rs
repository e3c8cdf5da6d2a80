use vsearch_core::StimulusItem;

/// Runtime data of the trial under the cursor. Discarded when the trial ends.
#[derive(Debug, Clone)]
pub struct ActiveTrial {
    pub index: usize,
    pub stimuli: Vec<StimulusItem>,
    pub durations: TrialDurations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialDurations {
    pub fixation_ms: u64,
    pub response_window_ms: u64,
    pub feedback_ms: u64,
}
