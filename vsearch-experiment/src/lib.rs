pub mod aggregate;
pub mod config;
pub mod export;
pub mod sequencer;
pub mod state;
pub mod stimulus;
pub mod trial;
pub mod view;

pub use aggregate::{SizeStats, Summary, summarize};
pub use config::ExperimentConfig;
pub use export::{ExportError, ExportFile, SessionRecord};
pub use sequencer::{Advance, TrialSequencer};
pub use state::{ExperimentEvent, ExperimentStateMachine, TimerKind};
pub use stimulus::StimulusGenerator;
pub use trial::{ActiveTrial, TrialDurations};
pub use view::{ExperimentView, Outcome};
