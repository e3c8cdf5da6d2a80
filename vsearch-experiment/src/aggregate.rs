use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vsearch_core::{Response, Trial};

/// Aggregates for one set size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeStats {
    /// Mean RT over correct trials only; `None` when there are none.
    pub mean_rt_ms: Option<f64>,
    pub correct: usize,
    pub total: usize,
}

impl SizeStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub per_size: BTreeMap<u32, SizeStats>,
    /// Fraction in `[0, 1]`; timeouts count as incorrect.
    pub overall_accuracy: f64,
    pub trials: usize,
    pub timeouts: usize,
}

impl Summary {
    pub fn mean_rt(&self, set_size: u32) -> Option<f64> {
        self.per_size.get(&set_size).and_then(|s| s.mean_rt_ms)
    }

    pub fn accuracy_percent(&self) -> u32 {
        (self.overall_accuracy * 100.0).round() as u32
    }
}

/// Mean RT per set size and overall accuracy over `trials`.
///
/// Every configured size gets an entry even without data. Incorrect and
/// timed-out trials are excluded from the RT means but stay in the accuracy
/// denominator.
pub fn summarize(trials: &[Trial], set_sizes: &[u32]) -> Summary {
    let per_size = set_sizes
        .iter()
        .map(|&size| {
            let of_size = trials.iter().filter(|t| t.set_size == size);
            let total = of_size.clone().count();
            let rts: Vec<u64> = of_size
                .filter(|t| t.is_correct())
                .filter_map(|t| t.reaction_time_ms)
                .collect();
            let mean_rt_ms = if rts.is_empty() {
                None
            } else {
                Some(rts.iter().sum::<u64>() as f64 / rts.len() as f64)
            };
            let stats = SizeStats {
                mean_rt_ms,
                correct: rts.len(),
                total,
            };
            (size, stats)
        })
        .collect();

    let correct = trials.iter().filter(|t| t.is_correct()).count();
    let overall_accuracy = if trials.is_empty() {
        0.0
    } else {
        correct as f64 / trials.len() as f64
    };

    Summary {
        per_size,
        overall_accuracy,
        trials: trials.len(),
        timeouts: trials
            .iter()
            .filter(|t| t.response == Some(Response::Timeout))
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    fn finished(set_size: u32, target: bool, rt_ms: u64, response: Response) -> Trial {
        let mut t = Trial::new(0, set_size, target);
        t.begin(0);
        t.complete(rt_ms * MS, response);
        t
    }

    #[test]
    fn incorrect_trials_excluded_from_mean_but_counted() {
        let trials = vec![
            finished(5, true, 400, Response::Present),
            finished(5, true, 600, Response::Present),
            finished(5, false, 100, Response::Present),
            finished(10, true, 4000, Response::Timeout),
        ];
        let summary = summarize(&trials, &[5, 10]);

        assert_eq!(summary.mean_rt(5), Some(500.0));
        assert_eq!(summary.mean_rt(10), None);
        assert_eq!(summary.per_size[&5].total, 3);
        assert_eq!(summary.per_size[&10].correct, 0);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.accuracy_percent(), 50);
    }

    #[test]
    fn empty_list_has_no_data() {
        let summary = summarize(&[], &[5, 10, 15, 20]);
        assert_eq!(summary.per_size.len(), 4);
        assert!(summary.per_size.values().all(|s| s.mean_rt_ms.is_none()));
        assert_eq!(summary.overall_accuracy, 0.0);
    }

    #[test]
    fn accuracy_rounds_to_nearest_percent() {
        let trials = vec![
            finished(5, true, 300, Response::Present),
            finished(5, true, 300, Response::Present),
            finished(5, true, 300, Response::Absent),
        ];
        assert_eq!(summarize(&trials, &[5]).accuracy_percent(), 67);
    }
}
