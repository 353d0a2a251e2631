use std::sync::Arc;

use snip_cache::RateLimit;
use snip_redirector::Redirector;
use snip_shortener::{Shortener, Stats};
use typed_builder::TypedBuilder;

#[derive(Clone, TypedBuilder)]
pub struct AppState {
    pub(crate) shortener: Arc<dyn Shortener>,
    pub(crate) redirector: Arc<dyn Redirector>,
    pub(crate) stats: Arc<dyn Stats>,
    pub(crate) rate_limit: Arc<dyn RateLimit>,
    /// Public origin short links are published under, e.g. `https://sho.rt`.
    #[builder(setter(into))]
    pub(crate) base_url: String,
}

impl AppState {
    /// The public link for `code`.
    pub(crate) fn short_url(&self, code: &snip_core::ShortCode) -> String {
        code.to_url(&format!("{}/r", self.base_url.trim_end_matches('/')))
    }
}
