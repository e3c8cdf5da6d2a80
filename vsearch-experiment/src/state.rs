use super::config::ExperimentConfig;
use super::trial::{ActiveTrial, TrialDurations};
use crate::export::{self, ExportError, ExportFile, SessionRecord};
use crate::{Advance, ExperimentView, Outcome, StimulusGenerator, Summary, TrialSequencer, summarize};
use rand::Rng;
use tracing::{debug, info, trace, warn};
use vsearch_core::{Phase, Response, SearchPhase, SetupError, Trial};
use vsearch_timing::{EntryToken, NANOS_PER_MS, Scheduled, Scheduler, Timer};

/// Deadlines the machine schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    FixationElapsed,
    ResponseTimeout,
    FeedbackElapsed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    SessionStarted {
        participant_id: String,
        total_trials: usize,
    },
    FixationStarted {
        index: usize,
    },
    TrialStarted {
        index: usize,
        at_ns: u64,
    },
    ResponseRecorded {
        index: usize,
        response: Response,
        reaction_time_ms: u64,
        correct: bool,
    },
    TimedOut {
        index: usize,
    },
    SessionComplete,
    Restarted,
}

/// One participant's session: identity plus the trial list.
#[derive(Debug, Clone)]
struct Session {
    participant_id: String,
    sequencer: TrialSequencer,
}

/// Drives SETUP -> INSTRUCTIONS -> FIXATION -> TRIAL -> FEEDBACK -> RESULTS.
///
/// All input goes through [`start`](Self::start), [`proceed`](Self::proceed),
/// [`respond`](Self::respond) and [`restart`](Self::restart); time moves
/// through [`update`](Self::update). Input arriving in a phase that does not
/// accept it is ignored.
pub struct ExperimentStateMachine<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    phase: SearchPhase,
    timer: T,
    rng: R,
    config: ExperimentConfig,
    generator: StimulusGenerator,
    session: Option<Session>,
    active: Option<ActiveTrial>,
    summary: Option<Summary>,
    scheduler: Scheduler<TimerKind>,
    entry: EntryToken,
    setup_message: Option<String>,
    events: Vec<ExperimentEvent>,
}

impl<T, R> ExperimentStateMachine<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: ExperimentConfig, timer: T, rng: R) -> Self {
        let mut scheduler = Scheduler::new();
        let entry = scheduler.enter();
        Self {
            phase: SearchPhase::default(),
            timer,
            rng,
            generator: StimulusGenerator::new(config.grid_size),
            config,
            session: None,
            active: None,
            summary: None,
            scheduler,
            entry,
            setup_message: None,
            events: Vec::new(),
        }
    }

    /// Validates the participant id and builds the trial list.
    pub fn start(&mut self, participant_id: &str) -> Result<(), SetupError> {
        if !self.phase.is_setup() {
            debug!(phase = %self.phase, "start ignored");
            return Ok(());
        }
        let participant_id = participant_id.trim();
        if participant_id.is_empty() {
            let err = SetupError::EmptyParticipantId;
            warn!("{err}");
            self.setup_message = Some(err.to_string());
            return Err(err);
        }

        let sequencer = TrialSequencer::build(&self.config, &mut self.rng);
        let total_trials = sequencer.len();
        info!(participant_id, total_trials, "session started");
        self.session = Some(Session {
            participant_id: participant_id.to_string(),
            sequencer,
        });
        self.setup_message = None;
        self.events.push(ExperimentEvent::SessionStarted {
            participant_id: participant_id.to_string(),
            total_trials,
        });
        self.advance_phase(true, self.timer.now());
        Ok(())
    }

    /// Leaves the instructions screen and begins trial 0.
    pub fn proceed(&mut self) -> bool {
        if self.phase != SearchPhase::Instructions {
            debug!(phase = %self.phase, "proceed ignored");
            return false;
        }
        self.advance_phase(true, self.timer.now());
        true
    }

    /// Records a present/absent response for the current trial.
    ///
    /// Deadlines that already passed are processed first, so a timeout
    /// that elapsed before this call wins and the response is dropped.
    /// The key only counts if the trial was already open before those
    /// deadlines fired: a fixation that elapsed unpolled opens the trial
    /// but does not take the key as its response.
    pub fn respond(&mut self, present: bool) -> bool {
        let (phase, entry) = (self.phase, self.entry);
        self.fire_due_timers();
        if !phase.accepts_response() || self.entry != entry {
            debug!(was = %phase, phase = %self.phase, present, "stray response ignored");
            return false;
        }

        let now_ns = self.timer.now();
        let Some(trial) = self.current_trial_mut() else {
            return false;
        };
        let response = Response::from_key(present);
        if !trial.complete(now_ns, response) {
            return false;
        }
        let recorded = ExperimentEvent::ResponseRecorded {
            index: trial.index,
            response,
            reaction_time_ms: trial.reaction_time_ms.unwrap_or_default(),
            correct: trial.is_correct(),
        };
        debug!(?recorded, "response recorded");
        self.events.push(recorded);

        let cancelled = self.scheduler.cancel(self.entry);
        trace!(cancelled, "pending timeout cancelled");
        self.advance_phase(true, now_ns);
        true
    }

    /// Throws the session away and returns to setup. Every pending timer is
    /// dropped.
    pub fn restart(&mut self) -> bool {
        if self.phase.is_setup() {
            return false;
        }
        let cancelled = self.scheduler.cancel_all();
        info!(from = %self.phase, cancelled, "session restarted");
        self.session = None;
        self.active = None;
        self.summary = None;
        self.setup_message = None;
        self.phase = SearchPhase::Setup;
        self.entry = self.scheduler.enter();
        self.events.push(ExperimentEvent::Restarted);
        true
    }

    /// Fires due timers and returns every event produced since the last call.
    pub fn update(&mut self) -> Vec<ExperimentEvent> {
        self.fire_due_timers();
        std::mem::take(&mut self.events)
    }

    fn fire_due_timers(&mut self) {
        let now_ns = self.timer.now();
        while let Some(fired) = self.scheduler.pop_due(now_ns) {
            if fired.token != self.entry {
                trace!(kind = ?fired.kind, "stale timer dropped");
                continue;
            }
            self.on_timer(fired, now_ns);
        }
    }

    fn on_timer(&mut self, fired: Scheduled<TimerKind>, now_ns: u64) {
        match (fired.kind, self.phase) {
            (TimerKind::FixationElapsed, SearchPhase::Fixation) => {
                self.advance_phase(true, now_ns);
            }
            (TimerKind::ResponseTimeout, SearchPhase::Trial) => {
                // The trial ends at its deadline, not at the poll that noticed it.
                let Some(trial) = self.current_trial_mut() else {
                    return;
                };
                if trial.complete(fired.due_ns, Response::Timeout) {
                    let index = trial.index;
                    debug!(index, "response window elapsed");
                    self.events.push(ExperimentEvent::TimedOut { index });
                    self.advance_phase(true, now_ns);
                }
            }
            (TimerKind::FeedbackElapsed, SearchPhase::Feedback) => {
                let remaining = match self.session.as_mut().map(|s| s.sequencer.advance()) {
                    Some(Advance::Next(_)) => true,
                    Some(Advance::Complete) | None => false,
                };
                self.advance_phase(remaining, now_ns);
            }
            (kind, phase) => {
                trace!(?kind, %phase, "timer does not apply to phase");
            }
        }
    }

    fn advance_phase(&mut self, trials_remaining: bool, now_ns: u64) {
        let Some(next) = self.phase.next(trials_remaining) else {
            return;
        };
        debug!(from = %self.phase, to = %next, "phase change");
        self.phase = next;
        self.entry = self.scheduler.enter();

        match next {
            SearchPhase::Fixation => self.enter_fixation(now_ns),
            SearchPhase::Trial => self.enter_trial(now_ns),
            SearchPhase::Feedback => {
                let dwell_ms = self
                    .active
                    .as_ref()
                    .map_or(self.config.feedback_duration_ms, |a| a.durations.feedback_ms);
                let due = now_ns + dwell_ms * NANOS_PER_MS;
                self.scheduler
                    .schedule(self.entry, TimerKind::FeedbackElapsed, due);
            }
            SearchPhase::Results => self.enter_results(),
            SearchPhase::Setup | SearchPhase::Instructions => {}
        }
    }

    /// Stimuli are generated here so they are ready when the trial opens.
    fn enter_fixation(&mut self, now_ns: u64) {
        let Some(trial) = self.session.as_ref().and_then(|s| s.sequencer.current()) else {
            warn!("fixation entered without a current trial");
            return;
        };
        let (index, set_size, target_present) = (trial.index, trial.set_size, trial.target_present);

        let stimuli = self
            .generator
            .generate(set_size, target_present, &mut self.rng);
        let (lo, hi) = self.config.fixation_range_ms;
        let fixation_ms = if hi > lo {
            self.rng.random_range(lo..hi)
        } else {
            lo
        };

        self.active = Some(ActiveTrial {
            index,
            stimuli,
            durations: TrialDurations {
                fixation_ms,
                response_window_ms: self.config.response_timeout_ms,
                feedback_ms: self.config.feedback_duration_ms,
            },
        });
        self.scheduler.schedule(
            self.entry,
            TimerKind::FixationElapsed,
            now_ns + fixation_ms * NANOS_PER_MS,
        );
        self.events.push(ExperimentEvent::FixationStarted { index });
        debug!(index, set_size, target_present, fixation_ms, "fixation started");
    }

    fn enter_trial(&mut self, now_ns: u64) {
        let window_ms = self
            .active
            .as_ref()
            .map_or(self.config.response_timeout_ms, |a| a.durations.response_window_ms);
        let Some(trial) = self.current_trial_mut() else {
            return;
        };
        if !trial.begin(now_ns) {
            return;
        }
        let index = trial.index;
        self.scheduler.schedule(
            self.entry,
            TimerKind::ResponseTimeout,
            now_ns + window_ms * NANOS_PER_MS,
        );
        self.events.push(ExperimentEvent::TrialStarted {
            index,
            at_ns: now_ns,
        });
        debug!(index, at_ns = now_ns, "stimulus onset");
    }

    fn enter_results(&mut self) {
        self.active = None;
        let summary = self.summary();
        info!(
            accuracy_percent = summary.accuracy_percent(),
            timeouts = summary.timeouts,
            "session complete"
        );
        for (size, stats) in &summary.per_size {
            info!(
                set_size = size,
                mean_rt_ms = stats.mean_rt_ms.unwrap_or(0.0),
                correct = stats.correct,
                total = stats.total,
                "set size summary"
            );
        }
        self.summary = Some(summary);
        self.events.push(ExperimentEvent::SessionComplete);
    }

    fn current_trial_mut(&mut self) -> Option<&mut Trial> {
        self.session
            .as_mut()
            .and_then(|s| s.sequencer.current_mut())
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.participant_id.as_str())
    }

    pub fn trials(&self) -> &[Trial] {
        self.session
            .as_ref()
            .map(|s| s.sequencer.trials())
            .unwrap_or(&[])
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.session.as_ref().and_then(|s| s.sequencer.current())
    }

    pub fn active_trial(&self) -> Option<&ActiveTrial> {
        self.active.as_ref()
    }

    /// `(current index, total trials)`; `(0, 0)` before a session exists.
    pub fn progress(&self) -> (usize, usize) {
        self.session
            .as_ref()
            .map_or((0, 0), |s| s.sequencer.progress())
    }

    /// Aggregates over the trials finished so far.
    pub fn summary(&self) -> Summary {
        let done = self
            .session
            .as_ref()
            .map(|s| s.sequencer.completed())
            .unwrap_or_default();
        summarize(&done, &self.config.set_sizes)
    }

    /// Earliest pending deadline in timer nanoseconds.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn view(&self) -> ExperimentView<'_> {
        let progress = self.progress();
        match self.phase {
            SearchPhase::Setup => ExperimentView::Setup {
                message: self.setup_message.as_deref(),
            },
            SearchPhase::Instructions => ExperimentView::Instructions {
                total_trials: progress.1,
            },
            SearchPhase::Fixation => ExperimentView::Fixation { progress },
            SearchPhase::Trial => ExperimentView::Trial {
                stimuli: self
                    .active
                    .as_ref()
                    .map(|a| a.stimuli.as_slice())
                    .unwrap_or(&[]),
                progress,
            },
            SearchPhase::Feedback => {
                let outcome = self
                    .current_trial()
                    .and_then(|t| {
                        Some(Outcome {
                            response: t.response?,
                            correct: t.is_correct(),
                            reaction_time_ms: t.reaction_time_ms?,
                        })
                    })
                    .unwrap_or(Outcome {
                        response: Response::Timeout,
                        correct: false,
                        reaction_time_ms: 0,
                    });
                ExperimentView::Feedback { outcome, progress }
            }
            SearchPhase::Results => match &self.summary {
                Some(summary) => ExperimentView::Results { summary },
                None => ExperimentView::Setup { message: None },
            },
        }
    }

    /// CSV of every trial. Only available on the results screen.
    pub fn export_csv(&self) -> Option<ExportFile> {
        if !self.phase.is_results() {
            return None;
        }
        let session = self.session.as_ref()?;
        Some(export::to_csv(
            &session.participant_id,
            session.sequencer.trials(),
        ))
    }

    /// JSON session record. Only available on the results screen.
    pub fn export_json(&self) -> Result<Option<ExportFile>, ExportError> {
        let (Some(session), Some(summary)) = (self.session.as_ref(), self.summary.as_ref()) else {
            return Ok(None);
        };
        if !self.phase.is_results() {
            return Ok(None);
        }
        let record = SessionRecord {
            participant_id: &session.participant_id,
            config: &self.config,
            trials: session.sequencer.trials(),
            summary,
        };
        export::to_json(&record).map(Some)
    }
}
