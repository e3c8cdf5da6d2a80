pub mod error;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use error::SetupError;
pub use phase::{Phase, SearchPhase};
pub use stimulus::{Stimulus, StimulusItem, StimulusKind};
pub use trial::{Response, Trial};
