//! Route handlers. Each returns an HTML fragment for HTMX to swap into
//! `#app`, `#board` or `#download`.

pub mod onboarding;
pub mod play;
pub mod results;
pub mod screen;
pub mod util;
