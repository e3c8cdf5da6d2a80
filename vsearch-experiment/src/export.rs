use crate::{ExperimentConfig, Summary};
use serde::Serialize;
use thiserror::Error;
use vsearch_core::Trial;

pub const CSV_HEADER: &str =
    "Participant,Trial,SetSize,TargetPresent,Response,ReactionTimeMs,Correct";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize session record: {0}")]
    Json(#[from] serde_json::Error),
}

/// An export artifact ready to be written by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

/// Everything needed to reconstruct a finished session.
#[derive(Debug, Serialize)]
pub struct SessionRecord<'a> {
    pub participant_id: &'a str,
    pub config: &'a ExperimentConfig,
    pub trials: &'a [Trial],
    pub summary: &'a Summary,
}

fn file_stem(participant_id: &str) -> String {
    let safe: String = participant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("visual_search_{safe}")
}

/// One header line plus one line per trial, plain comma join.
pub fn to_csv(participant_id: &str, trials: &[Trial]) -> ExportFile {
    let mut out = String::with_capacity(64 * (trials.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for trial in trials {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            participant_id,
            trial.index + 1,
            trial.set_size,
            if trial.target_present { "Yes" } else { "No" },
            trial.response.map(|r| r.as_str()).unwrap_or(""),
            trial
                .reaction_time_ms
                .map(|rt| rt.to_string())
                .unwrap_or_default(),
            if trial.is_correct() { 1 } else { 0 },
        ));
    }
    ExportFile {
        filename: format!("{}.csv", file_stem(participant_id)),
        contents: out,
    }
}

pub fn to_json(record: &SessionRecord<'_>) -> Result<ExportFile, ExportError> {
    Ok(ExportFile {
        filename: format!("{}.json", file_stem(record.participant_id)),
        contents: serde_json::to_string_pretty(record)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize;
    use vsearch_core::Response;

    fn sample() -> Vec<Trial> {
        let mut a = Trial::new(0, 5, true);
        a.begin(0);
        a.complete(312_000_000, Response::Present);
        let mut b = Trial::new(1, 20, false);
        b.begin(0);
        b.complete(4_000_000_000, Response::Timeout);
        vec![a, b]
    }

    #[test]
    fn csv_rows_are_one_based() {
        let file = to_csv("p7", &sample());
        let lines: Vec<&str> = file.contents.lines().collect();
        assert_eq!(file.filename, "visual_search_p7.csv");
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "p7,1,5,Yes,present,312,1");
        assert_eq!(lines[2], "p7,2,20,No,timeout,4000,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn filename_strips_path_characters() {
        let file = to_csv("../a b", &[]);
        assert_eq!(file.filename, "visual_search____a_b.csv");
    }

    #[test]
    fn json_record_round_trips_trials() {
        let trials = sample();
        let config = ExperimentConfig::default();
        let summary = summarize(&trials, &config.set_sizes);
        let record = SessionRecord {
            participant_id: "p7",
            config: &config,
            trials: &trials,
            summary: &summary,
        };
        let file = to_json(&record).unwrap();
        assert_eq!(file.filename, "visual_search_p7.json");

        let value: serde_json::Value = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(value["participant_id"], "p7");
        assert_eq!(value["trials"][1]["response"], "timeout");
        assert_eq!(value["trials"].as_array().map(|t| t.len()), Some(2));
    }
}
