//! Embedded checkout payment-status reconciliation
//!
//! Fetches a payment's server-side state, resolves its gateway-specific
//! action data, drives the gateway presentation and polls the status until
//! it settles, notifying the embedding page exactly once.

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateways;
pub mod host;
pub mod logging;
pub mod routes;
pub mod services;
pub mod workers;

pub use checkout::{CheckoutPage, PageOutcome};
pub use config::Settings;
pub use error::{CheckoutError, CheckoutResult};
