use serde::{Deserialize, Serialize};

/// Terminal outcome of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Present,
    Absent,
    Timeout,
}

impl Response {
    pub fn from_key(present: bool) -> Self {
        if present {
            Response::Present
        } else {
            Response::Absent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Present => "present",
            Response::Absent => "absent",
            Response::Timeout => "timeout",
        }
    }

    /// Timeouts are scored as incorrect.
    pub fn is_correct_for(&self, target_present: bool) -> bool {
        match self {
            Response::Present => target_present,
            Response::Absent => !target_present,
            Response::Timeout => false,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the experiment.
///
/// `start_ns` is written once by [`Trial::begin`]; the terminal fields
/// (`end_ns`, `reaction_time_ms`, `response`, `correct`) are written together,
/// once, by [`Trial::complete`]. Later calls are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub set_size: u32,
    pub target_present: bool,
    pub start_ns: Option<u64>,
    pub end_ns: Option<u64>,
    pub reaction_time_ms: Option<u64>,
    pub response: Option<Response>,
    pub correct: Option<bool>,
}

impl Trial {
    pub fn new(index: usize, set_size: u32, target_present: bool) -> Self {
        Self {
            index,
            set_size,
            target_present,
            start_ns: None,
            end_ns: None,
            reaction_time_ms: None,
            response: None,
            correct: None,
        }
    }

    /// Marks the stimulus as respondable. Returns false if already started.
    pub fn begin(&mut self, at_ns: u64) -> bool {
        if self.start_ns.is_some() {
            return false;
        }
        self.start_ns = Some(at_ns);
        true
    }

    /// Writes the terminal fields. Returns false (and changes nothing) if the
    /// trial never started or already has an outcome.
    pub fn complete(&mut self, at_ns: u64, response: Response) -> bool {
        let Some(start_ns) = self.start_ns else {
            return false;
        };
        if self.is_complete() {
            return false;
        }
        let elapsed_ns = at_ns.saturating_sub(start_ns);
        self.end_ns = Some(at_ns);
        self.reaction_time_ms = Some((elapsed_ns + 500_000) / 1_000_000);
        self.response = Some(response);
        self.correct = Some(response.is_correct_for(self.target_present));
        true
    }

    pub fn is_started(&self) -> bool {
        self.start_ns.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_correct(&self) -> bool {
        self.correct == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    #[test]
    fn complete_requires_begin() {
        let mut trial = Trial::new(0, 5, true);
        assert!(!trial.complete(10 * MS, Response::Present));
        assert!(trial.response.is_none());
    }

    #[test]
    fn terminal_fields_are_written_once() {
        let mut trial = Trial::new(3, 10, false);
        assert!(trial.begin(100 * MS));
        assert!(!trial.begin(200 * MS));
        assert_eq!(trial.start_ns, Some(100 * MS));

        assert!(trial.complete(400 * MS, Response::Absent));
        assert!(!trial.complete(4_100 * MS, Response::Timeout));

        assert_eq!(trial.response, Some(Response::Absent));
        assert_eq!(trial.reaction_time_ms, Some(300));
        assert_eq!(trial.correct, Some(true));
    }

    #[test]
    fn timeout_is_incorrect_even_without_target() {
        let mut trial = Trial::new(0, 20, false);
        trial.begin(0);
        trial.complete(4_000 * MS, Response::Timeout);
        assert_eq!(trial.correct, Some(false));
        assert_eq!(trial.reaction_time_ms, Some(4_000));
    }

    #[test]
    fn response_displays_lowercase() {
        assert_eq!(Response::Timeout.to_string(), "timeout");
        assert_eq!(Response::from_key(true), Response::Present);
        assert_eq!(Response::from_key(false), Response::Absent);
    }
}
