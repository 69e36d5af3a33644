//! Game module: card codec, round data, the playback/match engine and the
//! session flow. State lives in WASM memory (thread_local) for the lifetime
//! of the page.

pub mod card;
pub mod engine;
pub mod matcher;
pub mod results;
pub mod rounds;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod storage;
