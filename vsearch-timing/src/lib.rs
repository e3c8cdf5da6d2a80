pub mod manual;
pub mod scheduler;
pub mod timer;

pub use manual::ManualClock;
pub use scheduler::{EntryToken, Scheduled, Scheduler};
pub use timer::{HighPrecisionTimer, Timer};

pub const NANOS_PER_MS: u64 = 1_000_000;
