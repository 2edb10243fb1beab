//! Payment service API

pub mod payment;
