//! HTTP surface of snip.
//!
//! The router is built from trait objects so the binary can pick storage and
//! cache backends at startup and tests can drive it in-process.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;
