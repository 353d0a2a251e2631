//! URL shortening, link management and stats.
//!
//! This crate provides the write side of snip: the shortening service with
//! its collision handling, link deletion, the read-only stats projection,
//! and the background reaper for expired records.

pub mod error;
pub mod reaper;
pub mod service;
pub mod shortener;
pub mod stats;

pub use error::{Result, ShortenerError};
pub use reaper::Reaper;
pub use service::ShortenerService;
pub use shortener::{ShortenParams, Shortener};
pub use stats::{Stats, StatsService, UrlStats};
