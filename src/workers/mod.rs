//! Background polling of payment status

pub mod payment_reconciler;
pub mod polling_session;
