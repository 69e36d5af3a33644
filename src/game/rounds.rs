//! Round data: one `;`-separated file per simulation.
//!
//! ```text
//! ronda;j1;j2;j3;j4;j5;j6;j7;j8      <- header, discarded
//! 1;3.1.2;;*5.2.1;;;;;               <- label + one token per player
//! ```
//!
//! The host fetches the file and posts its text; this module only parses.

use crate::config::GameConfig;
use crate::error::EngineError;

/// Players at the table. Player 1 is the participant.
pub const PLAYERS: usize = 8;
pub const SELF_PLAYER: u8 = 1;

/// One synchronized snapshot of the table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Round {
    pub label: String,
    cells: [Option<String>; PLAYERS],
}

impl Round {
    /// Build a round from raw fields: label first, then players 1..8.
    /// Missing fields and whitespace-only fields count as "no token".
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = fields.into_iter();
        let label = fields
            .next()
            .map(|f| f.as_ref().to_string())
            .unwrap_or_default();
        let mut cells: [Option<String>; PLAYERS] = Default::default();
        for (cell, field) in cells.iter_mut().zip(fields) {
            let raw = field.as_ref();
            if !raw.trim().is_empty() {
                *cell = Some(raw.to_string());
            }
        }
        Self { label, cells }
    }

    /// Raw token for a 1-based player number.
    pub fn token(&self, player: u8) -> Option<&str> {
        let idx = usize::from(player).checked_sub(1)?;
        self.cells.get(idx)?.as_deref()
    }
}

/// The full, eagerly loaded round list of one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundSequence {
    pub simulation: u8,
    rounds: Vec<Round>,
}

impl RoundSequence {
    pub fn new(simulation: u8, rounds: Vec<Round>) -> Self {
        Self { simulation, rounds }
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Round by 1-based round number.
    pub fn round(&self, number: usize) -> Option<&Round> {
        self.rounds.get(number.checked_sub(1)?)
    }
}

/// Parse a simulation file. The first non-blank row is the header and is
/// dropped; blank rows are skipped. A file without data rows is a load
/// failure.
pub fn parse_rounds(simulation: u8, text: &str) -> Result<RoundSequence, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut rounds = Vec::new();
    let mut header_seen = false;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        rounds.push(Round::from_fields(record.iter()));
    }

    if rounds.is_empty() {
        return Err(EngineError::EmptySimulation(simulation));
    }
    log::debug!("parsed {} rounds for simulation {}", rounds.len(), simulation);
    Ok(RoundSequence::new(simulation, rounds))
}

/// Path the host fetches for a simulation id.
pub fn data_url(config: &GameConfig, simulation: u8) -> String {
    config
        .data_path_template
        .replace("{id}", &simulation.to_string())
}
