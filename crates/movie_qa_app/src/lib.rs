//! Movie Q&A front end: the login form and the chat, knowledge-base and
//! upload panels, wired to one session gate. The `movie-qa` binary drives it
//! from the command line.

pub mod app;
pub mod panels;
pub mod state;

pub use app::App;
pub use state::{Outcome, RequestSlot};
