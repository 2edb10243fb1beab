//! Runtime settings
//!
//! Layered as: built-in defaults → optional `checkout.toml` →
//! `CHECKOUT_*` environment variables (a `.env` file is honoured).

use serde::Deserialize;
use std::time::Duration;

/// Loaded checkout settings. All durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// API root used when the page is not served under a mount prefix
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub checker_poll_interval_ms: u64,
    pub details_poll_interval_ms: u64,
    pub checker_redirect_delay_prod_ms: u64,
    pub checker_redirect_delay_other_ms: u64,
    pub details_redirect_delay_ms: u64,
    pub wallet_widget_window_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            request_timeout_ms: 15_000,
            checker_poll_interval_ms: 1_200,
            details_poll_interval_ms: 5_000,
            checker_redirect_delay_prod_ms: 500,
            checker_redirect_delay_other_ms: 2_000,
            details_redirect_delay_ms: 1_500,
            wallet_widget_window_ms: 10_000,
        }
    }
}

impl Settings {
    /// Load from `checkout.toml` (if present) and the environment
    pub fn load() -> Result<Self, ::config::ConfigError> {
        dotenv::dotenv().ok();
        Self::load_from("checkout")
    }

    /// Load with an explicit file stem, e.g. `"config/checkout"`
    pub fn load_from(file_stem: &str) -> Result<Self, ::config::ConfigError> {
        let defaults = Self::default();

        ::config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("checker_poll_interval_ms", defaults.checker_poll_interval_ms)?
            .set_default("details_poll_interval_ms", defaults.details_poll_interval_ms)?
            .set_default(
                "checker_redirect_delay_prod_ms",
                defaults.checker_redirect_delay_prod_ms,
            )?
            .set_default(
                "checker_redirect_delay_other_ms",
                defaults.checker_redirect_delay_other_ms,
            )?
            .set_default("details_redirect_delay_ms", defaults.details_redirect_delay_ms)?
            .set_default("wallet_widget_window_ms", defaults.wallet_widget_window_ms)?
            .add_source(::config::File::with_name(file_stem).required(false))
            .add_source(::config::Environment::with_prefix("CHECKOUT").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn wallet_widget_window(&self) -> Duration {
        Duration::from_millis(self.wallet_widget_window_ms)
    }
}
