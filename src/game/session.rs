//! Session flow: the screen sequence of one participant visit.
//!
//! ```text
//! Language -> Demographic -> Explanation -> Playing(0) -> Transition
//!          -> Playing(1) -> Transition -> Playing(2) -> Completed
//! ```
//!
//! Each arrow is one explicit method on [`Session`]. Calling a method from
//! the wrong screen is an [`EngineError::InvalidTransition`] and changes
//! nothing.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::EngineError;
use crate::game::engine::EngineState;
use crate::game::matcher::{self, AttemptResult};
use crate::game::results::{RecordedResult, ResultLog, ResultRecord, Tally};
use crate::game::rounds::parse_rounds;
use crate::game::scheduler::{self, AttemptEnd, PlaybackScheduler, TickOutcome, TimerHandle};
use crate::game::storage::{self, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "es" => Some(Language::Es),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn gender_options(self) -> &'static [&'static str] {
        match self {
            Language::Es => &["Femenino", "Masculino", "Otro", "Prefiero no decirlo"],
            Language::En => &["Female", "Male", "Other", "Prefer not to say"],
        }
    }

    pub fn age_options(self) -> &'static [&'static str] {
        match self {
            Language::Es => &["10-19", "20-29", "30-39", "40-49", "50-59", "60+ años"],
            Language::En => &["10-19", "20-29", "30-39", "40-49", "50-59", "60+ years"],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub gender: Option<String>,
    pub age_range: Option<String>,
}

impl Demographics {
    pub fn is_complete(&self) -> bool {
        self.gender.is_some() && self.age_range.is_some()
    }
}

/// Which screen is active. Replaces a set of independent modal flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    Language,
    Demographic,
    Explanation,
    /// `attempt` is 0-based. The engine is idle until the data arrives.
    Playing { attempt: usize, simulation: u8 },
    /// Shown after every attempt but the last.
    Transition { completed_attempt: usize, tally: Tally },
    Completed,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Language => "language",
            Screen::Demographic => "demographic",
            Screen::Explanation => "explanation",
            Screen::Playing { .. } => "playing",
            Screen::Transition { .. } => "transition",
            Screen::Completed => "completed",
        }
    }
}

/// Draws simulation ids without repeats until the pool is used up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationPicker {
    pool: Vec<u8>,
    used: Vec<u8>,
}

impl SimulationPicker {
    pub fn new(pool: Vec<u8>) -> Self {
        Self {
            pool,
            used: Vec::new(),
        }
    }

    /// Uniform draw over unused ids. Once every id has been used the used set
    /// is cleared and the draw covers the whole pool without being recorded,
    /// so the next pick may repeat it.
    pub fn pick<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) -> Option<u8> {
        let available: Vec<u8> = self
            .pool
            .iter()
            .copied()
            .filter(|id| !self.used.contains(id))
            .collect();
        match available.choose(rng) {
            Some(&id) => {
                self.used.push(id);
                Some(id)
            }
            None => {
                self.used.clear();
                self.pool.choose(rng).copied()
            }
        }
    }

    pub fn used(&self) -> &[u8] {
        &self.used
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }
}

#[derive(Debug)]
pub struct Session {
    screen: Screen,
    language: Language,
    demographics: Demographics,
    picker: SimulationPicker,
    engine: EngineState,
    scheduler: PlaybackScheduler,
    attempt_tally: Tally,
    load_error: Option<String>,
    results: ResultLog,
    user_id: String,
    config: GameConfig,
    storage: Box<dyn Storage>,
    rng: StdRng,
}

impl Session {
    /// Open a session, restoring the participant id and result log.
    /// Storage failures are logged; the session then runs unpersisted.
    pub fn open(config: GameConfig, storage: Box<dyn Storage>) -> Self {
        Self::with_rng(config, storage, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, mut storage: Box<dyn Storage>, rng: StdRng) -> Self {
        let user_id = storage::load_or_create_user_id(storage.as_mut(), &config.user_id_key)
            .unwrap_or_else(|e| {
                log::warn!("participant id not persisted: {}", e);
                uuid::Uuid::new_v4().to_string()
            });
        let results = storage::load_results(storage.as_ref(), &config.results_key)
            .unwrap_or_else(|e| {
                log::warn!("stored results unavailable: {}", e);
                ResultLog::default()
            });
        log::info!(
            "session opened for {} with {} stored results",
            user_id,
            results.len()
        );
        Self {
            screen: Screen::Language,
            language: Language::default(),
            demographics: Demographics::default(),
            picker: SimulationPicker::new(config.simulation_pool.clone()),
            engine: EngineState::default(),
            scheduler: PlaybackScheduler::default(),
            attempt_tally: Tally::default(),
            load_error: None,
            results,
            user_id,
            config,
            storage,
            rng,
        }
    }

    fn wrong_screen(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            action,
            screen: self.screen.name(),
        }
    }

    fn set_screen(&mut self, screen: Screen) {
        log::info!("screen {} -> {}", self.screen.name(), screen.name());
        self.screen = screen;
    }

    // ── Onboarding ─────────────────────────────────────────────────

    pub fn choose_language(&mut self, language: Language) -> Result<(), EngineError> {
        if self.screen != Screen::Language {
            return Err(self.wrong_screen("choose a language"));
        }
        self.language = language;
        self.set_screen(Screen::Demographic);
        Ok(())
    }

    pub fn select_gender(&mut self, gender: &str) -> Result<(), EngineError> {
        if self.screen != Screen::Demographic {
            return Err(self.wrong_screen("select a gender"));
        }
        let gender = gender.trim();
        if !gender.is_empty() {
            self.demographics.gender = Some(gender.to_string());
        }
        Ok(())
    }

    pub fn select_age_range(&mut self, age_range: &str) -> Result<(), EngineError> {
        if self.screen != Screen::Demographic {
            return Err(self.wrong_screen("select an age range"));
        }
        let age_range = age_range.trim();
        if !age_range.is_empty() {
            self.demographics.age_range = Some(age_range.to_string());
        }
        Ok(())
    }

    pub fn confirm_demographics(&mut self) -> Result<(), EngineError> {
        if self.screen != Screen::Demographic {
            return Err(self.wrong_screen("confirm demographics"));
        }
        if !self.demographics.is_complete() {
            return Err(EngineError::DemographicsIncomplete);
        }
        self.set_screen(Screen::Explanation);
        Ok(())
    }

    /// Leave the explanation and pick the first simulation. Returns its id;
    /// the host then fetches the data and calls [`Session::load_simulation`].
    pub fn start_game(&mut self) -> Result<u8, EngineError> {
        if self.screen != Screen::Explanation {
            return Err(self.wrong_screen("start the game"));
        }
        self.picker.reset();
        self.begin_attempt(0)
    }

    /// Leave the transition screen and pick the next simulation.
    pub fn next_attempt(&mut self) -> Result<u8, EngineError> {
        let Screen::Transition {
            completed_attempt, ..
        } = self.screen
        else {
            return Err(self.wrong_screen("start the next attempt"));
        };
        self.begin_attempt(completed_attempt + 1)
    }

    fn begin_attempt(&mut self, attempt: usize) -> Result<u8, EngineError> {
        let simulation = self.picker.pick(&mut self.rng).ok_or_else(|| {
            EngineError::InvalidConfig("simulation_pool must not be empty".to_string())
        })?;
        self.scheduler.cancel();
        self.engine = EngineState::default();
        self.attempt_tally = Tally::default();
        self.load_error = None;
        log::info!("attempt {} uses simulation {}", attempt, simulation);
        self.set_screen(Screen::Playing {
            attempt,
            simulation,
        });
        Ok(simulation)
    }

    // ── Playback ───────────────────────────────────────────────────

    /// Install the fetched data for the current attempt and start playback.
    pub fn load_simulation(&mut self, simulation: u8, text: &str) -> Result<TimerHandle, EngineError> {
        let (attempt, expected) = self.playing("load simulation data")?;
        if simulation != expected {
            return Err(EngineError::UnexpectedSimulation {
                expected,
                got: simulation,
            });
        }
        if let Some(handle) = self.scheduler.active() {
            log::debug!("simulation {} is already playing", simulation);
            return Ok(handle);
        }
        let rounds = match parse_rounds(simulation, text) {
            Ok(rounds) => rounds,
            Err(e) => {
                log::error!("simulation {} cannot start: {}", simulation, e);
                self.load_error = Some(e.to_string());
                return Err(e);
            }
        };
        self.load_error = None;
        self.engine = EngineState::start(rounds);
        let cadence = scheduler::cadence_for_attempt(&self.config, attempt);
        let handle = self.scheduler.start(cadence);
        log::info!(
            "simulation {} loaded: {} rounds every {} ms",
            simulation,
            self.engine.total_rounds(),
            cadence
        );
        Ok(handle)
    }

    /// Record that the host could not fetch the data. The attempt cannot
    /// start; retrying is left to the participant.
    pub fn load_failed(&mut self, simulation: u8, reason: &str) -> EngineError {
        let err = EngineError::DataLoad {
            simulation,
            reason: reason.to_string(),
        };
        log::error!("{}", err);
        self.load_error = Some(err.to_string());
        err
    }

    /// Clear a load failure so the host can fetch again.
    pub fn retry_load(&mut self) -> Result<u8, EngineError> {
        let (_, simulation) = self.playing("retry loading")?;
        self.load_error = None;
        Ok(simulation)
    }

    /// Handle one timer tick carrying `generation`.
    pub fn tick(&mut self, generation: u32, now: DateTime<Utc>) -> TickOutcome {
        if !self.scheduler.accepts(generation) {
            return TickOutcome::Stale;
        }
        matcher::expire_feedback(&mut self.engine, now);
        let outcome = self.engine.tick();
        if outcome == TickOutcome::Ended {
            self.scheduler.cancel();
            self.end_attempt();
        }
        outcome
    }

    fn end_attempt(&mut self) {
        let Screen::Playing { attempt, simulation } = self.screen else {
            return;
        };
        log::info!(
            "attempt {} (simulation {}) ended: {} correct, {} wrong",
            attempt,
            simulation,
            self.attempt_tally.correct,
            self.attempt_tally.wrong
        );
        match scheduler::after_attempt(&self.config, attempt) {
            AttemptEnd::NextAttempt { .. } => self.set_screen(Screen::Transition {
                completed_attempt: attempt,
                tally: self.attempt_tally,
            }),
            AttemptEnd::SessionComplete => self.set_screen(Screen::Completed),
        }
    }

    /// The participant pressed the attempt key.
    pub fn attempt(&mut self, now: DateTime<Utc>) -> AttemptResult {
        if !matches!(self.screen, Screen::Playing { .. }) {
            return AttemptResult::Ignored;
        }
        let result = matcher::attempt(&mut self.engine, now, self.config.feedback_window_ms);
        if let AttemptResult::Evaluated(report) = &result {
            let recorded = RecordedResult::from(report.outcome);
            self.attempt_tally.record(recorded);
            let record = ResultRecord {
                user_id: self.user_id.clone(),
                language: self.language.code().to_string(),
                gender: self.demographics.gender.clone().unwrap_or_default(),
                age_range: self.demographics.age_range.clone().unwrap_or_default(),
                simulation: report.simulation,
                round: report.round,
                timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                result: recorded,
            };
            self.results.push(record);
            self.persist_results();
        }
        result
    }

    pub fn expire_feedback(&mut self, now: DateTime<Utc>) -> bool {
        matcher::expire_feedback(&mut self.engine, now)
    }

    fn playing(&self, action: &'static str) -> Result<(usize, u8), EngineError> {
        match self.screen {
            Screen::Playing {
                attempt,
                simulation,
            } => Ok((attempt, simulation)),
            _ => Err(self.wrong_screen(action)),
        }
    }

    // ── Results ────────────────────────────────────────────────────

    fn persist_results(&mut self) {
        if let Err(e) =
            storage::save_results(self.storage.as_mut(), &self.config.results_key, &self.results)
        {
            log::error!("result log not persisted: {}", e);
        }
    }

    /// Replace the log (import) and write it through.
    pub fn replace_results(&mut self, results: ResultLog) -> Result<(), EngineError> {
        self.results = results;
        storage::save_results(self.storage.as_mut(), &self.config.results_key, &self.results)
    }

    pub fn export_csv(&self) -> Result<String, EngineError> {
        self.results.export_csv()
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    pub fn active_timer(&self) -> Option<TimerHandle> {
        self.scheduler.active()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn attempt_tally(&self) -> Tally {
        self.attempt_tally
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn used_simulations(&self) -> &[u8] {
        self.picker.used()
    }
}
