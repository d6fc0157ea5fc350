#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;
use tracing::Span;
use url::Url;

use crate::Result;
use crate::error::Error;

/// Configuration for a feed connection. Immutable once the connection is opened.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Endpoint for the opening handshake, e.g. `wss://feed.example/ws`
    #[builder(into)]
    pub base_url: String,
    /// Bound on the opening handshake and on every receive. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
    /// Span the connection logs under. Defaults to a `feed` span carrying the URL.
    pub span: Option<Span>,
}

impl Config {
    /// Parse and check [`Config::base_url`].
    pub fn url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::validation(format!(
                "unsupported scheme `{scheme}` in {}, expected ws or wss",
                self.base_url
            ))),
        }
    }

    /// The configured span, created on first use when none was supplied.
    pub(crate) fn span(&mut self) -> Span {
        let url = &self.base_url;
        self.span
            .get_or_insert_with(|| tracing::info_span!("feed", url = %url))
            .clone()
    }
}
