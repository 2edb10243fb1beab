//! Services module for payment data shaping

pub mod action_data;
pub mod amount;
