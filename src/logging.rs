//! Logging and tracing configuration for the embedded checkout
//!
//! Structured JSON output in production, human-readable output elsewhere.
//! Gateway credentials (client secrets, API keys) are masked before they
//! reach a log line.

use std::env;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Environment types for logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Detect environment from ENV variable
    pub fn from_env() -> Self {
        Self::parse(
            &env::var("ENVIRONMENT")
                .or_else(|_| env::var("ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        )
    }

    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    /// Get default log level for environment
    pub fn default_log_level(&self) -> Level {
        match self {
            Self::Development => Level::DEBUG,
            Self::Staging => Level::INFO,
            Self::Production => Level::INFO,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Initialize the tracing subscriber with appropriate formatting
///
/// # Environment Variables
/// - `ENVIRONMENT` or `ENV`: "production", "staging" or "development"
/// - `RUST_LOG`: Override log level (e.g. "info", "embedded_checkout=trace")
/// - `LOG_FORMAT`: Force format to "json" or "pretty"
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let environment = Environment::from_env();

    let use_json = env::var("LOG_FORMAT")
        .map(|f| f.to_lowercase() == "json")
        .unwrap_or_else(|_| environment.is_production());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={},reqwest=warn,hyper=warn",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            environment.default_log_level()
        ))
    });

    let installed = if use_json {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_level(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(json_layer).try_init()
    } else {
        let pretty_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(pretty_layer).try_init()
    };

    if installed.is_ok() {
        tracing::info!(
            environment = ?environment,
            format = if use_json { "json" } else { "pretty" },
            "Tracing initialized"
        );
    }
}

/// Mask a credential or address for logging.
///
/// Shows first 4 and last 4 characters, masks the rest
///
/// # Examples
/// ```
/// use embedded_checkout::logging::mask_secret;
///
/// assert_eq!(mask_secret("cs_test_a1b2c3d4e5f6"), "cs_t...e5f6");
/// assert_eq!(mask_secret("short"), "****");
/// ```
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

const SENSITIVE_KEYS: &[&str] = &[
    "stripeClientSecret",
    "stripeAPIKey",
    "paypalClientId",
    "client_secret",
    "clientSecret",
    "secret",
    "password",
    "token",
    "api_key",
    "apiKey",
    "authorization",
];

fn sensitive_patterns() -> &'static [(regex::Regex, String)] {
    static PATTERNS: OnceLock<Vec<(regex::Regex, String)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SENSITIVE_KEYS
            .iter()
            .filter_map(|key| {
                let pattern = format!(r#""{}"\s*:\s*"[^"]*""#, regex::escape(key));
                regex::Regex::new(&pattern)
                    .ok()
                    .map(|re| (re, format!(r#""{}": "[REDACTED]""#, key)))
            })
            .collect()
    })
}

/// Redact credential values from JSON text before it is logged
pub fn redact_sensitive_data(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in sensitive_patterns() {
        result = re.replace_all(&result, replacement.as_str()).into_owned();
    }
    result
}

/// Log a reconciliation status transition with uniform fields
///
/// ```no_run
/// # use embedded_checkout::log_transition;
/// log_transition!(
///     payment_id = "pay_123",
///     from = "pending",
///     to = "success",
/// );
/// ```
#[macro_export]
macro_rules! log_transition {
    ($($key:tt = $value:expr),* $(,)?) => {
        tracing::info!(
            event_type = "status_transition",
            $($key = tracing::field::display(&$value)),*
        );
    };
}
