//! Redirector service library.
//!
//! This crate provides a [`RedirectorService`] that resolves short codes to
//! their original URLs. Lookups go to the [`UrlCache`](snip_core::UrlCache)
//! first and fall back to the record store, which also enforces expiry,
//! counts the access and repairs the cache.

pub mod error;
pub mod redirector;
pub mod service;

pub use error::{RedirectorError, Result};
pub use redirector::Redirector;
pub use service::RedirectorService;
