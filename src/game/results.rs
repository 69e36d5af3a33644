//! Result log: one record per evaluated attempt, exported as CSV.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EngineError;
use crate::game::matcher::MatchOutcome;

pub const EXPORT_HEADER: [&str; 10] = [
    "userId",
    "language",
    "gender",
    "age",
    "simulation",
    "round",
    "timestamp",
    "result",
    "correct_so_far",
    "wrong_so_far",
];

pub const EXPORT_FILE_NAME: &str = "jungle_speed_resultados.csv";

/// Outcome as stored. Entries written by older builds may carry other
/// values (e.g. `end`); they are kept but never exported or tallied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordedResult {
    Success,
    Fail,
    #[serde(other)]
    Other,
}

impl From<MatchOutcome> for RecordedResult {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Success => RecordedResult::Success,
            MatchOutcome::Fail => RecordedResult::Fail,
        }
    }
}

impl RecordedResult {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordedResult::Success => "success",
            RecordedResult::Fail => "fail",
            RecordedResult::Other => "other",
        }
    }

    pub fn is_scored(self) -> bool {
        matches!(self, RecordedResult::Success | RecordedResult::Fail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub user_id: String,
    pub language: String,
    pub gender: String,
    #[serde(rename = "age")]
    pub age_range: String,
    pub simulation: u8,
    pub round: usize,
    /// RFC 3339 with milliseconds, UTC.
    pub timestamp: String,
    pub result: RecordedResult,
}

/// Running correct/wrong counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub wrong: u32,
}

impl Tally {
    pub fn record(&mut self, result: RecordedResult) {
        match result {
            RecordedResult::Success => self.correct += 1,
            RecordedResult::Fail => self.wrong += 1,
            RecordedResult::Other => {}
        }
    }
}

/// Append-only list of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLog {
    records: Vec<ResultRecord>,
}

impl ResultLog {
    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// CSV with a per-simulation running tally, in emission order.
    pub fn export_csv(&self) -> Result<String, EngineError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_HEADER)?;

        let mut tallies: HashMap<u8, Tally> = HashMap::new();
        for record in self.records.iter().filter(|r| r.result.is_scored()) {
            let tally = tallies.entry(record.simulation).or_default();
            tally.record(record.result);
            let simulation = record.simulation.to_string();
            let round = record.round.to_string();
            let correct = tally.correct.to_string();
            let wrong = tally.wrong.to_string();
            writer.write_record([
                record.user_id.as_str(),
                record.language.as_str(),
                record.gender.as_str(),
                record.age_range.as_str(),
                simulation.as_str(),
                round.as_str(),
                record.timestamp.as_str(),
                record.result.as_str(),
                correct.as_str(),
                wrong.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EngineError::Storage(format!("csv flush failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| EngineError::Storage(e.to_string()))
    }
}
