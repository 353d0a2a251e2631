//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the domain types shared by the shortening,
//! resolution and stats services, together with the two storage seams
//! they are written against: the authoritative [`Repository`] and the
//! best-effort [`UrlCache`].

pub mod cache;
pub mod clock;
pub mod error;
pub mod repository;
pub mod shortcode;

pub use cache::{hit_counter_key, CacheLifetime, UrlCache};
pub use clock::{Clock, SystemClock};
pub use error::{CacheError, ShortCodeError, StorageError};
pub use repository::{NewUrlRecord, ReadRepository, Repository, UrlRecord};
pub use shortcode::ShortCode;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
