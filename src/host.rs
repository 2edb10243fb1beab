//! The embedding page, seen from the checkout core
//!
//! Everything the core does to the outside world (posting to the parent
//! frame, navigating, writing the clipboard) goes through [`CheckoutHost`].

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::HostError;

/// Cross-window event names consumed by the embedding host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParentEvent {
    #[serde(rename = "UniBee_PaymentSuccess")]
    PaymentSuccess,
    #[serde(rename = "UniBee_PaymentFailed")]
    PaymentFailed,
    #[serde(rename = "UniBee_PaymentCancelled")]
    PaymentCancelled,
}

impl ParentEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentEvent::PaymentSuccess => "UniBee_PaymentSuccess",
            ParentEvent::PaymentFailed => "UniBee_PaymentFailed",
            ParentEvent::PaymentCancelled => "UniBee_PaymentCancelled",
        }
    }
}

/// `{type, paymentId, invoiceId}` posted to the parent frame with origin `*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentMessage {
    #[serde(rename = "type")]
    pub event: ParentEvent,
    pub payment_id: String,
    pub invoice_id: String,
}

#[async_trait]
pub trait CheckoutHost: Send + Sync {
    /// Fire-and-forget post to the parent frame
    fn post_to_parent(&self, message: &ParentMessage) -> Result<(), HostError>;

    /// Full-page navigation; ends the page's lifecycle
    fn navigate(&self, url: &str);

    async fn write_clipboard(&self, text: &str) -> Result<(), HostError>;
}

/// Post to the parent frame, swallowing failures.
pub fn notify_parent(host: &dyn CheckoutHost, message: &ParentMessage) {
    match host.post_to_parent(message) {
        Ok(()) => info!(
            payment_id = %message.payment_id,
            event = message.event.as_str(),
            "Message sent to parent window"
        ),
        Err(e) => warn!(
            payment_id = %message.payment_id,
            event = message.event.as_str(),
            error = %e,
            "Failed to send message to parent window"
        ),
    }
}

/// Host used outside a browser: logs what a page would do.
#[derive(Debug, Default, Clone)]
pub struct ConsoleHost;

#[async_trait]
impl CheckoutHost for ConsoleHost {
    fn post_to_parent(&self, message: &ParentMessage) -> Result<(), HostError> {
        let payload =
            serde_json::to_string(message).map_err(|e| HostError(e.to_string()))?;
        info!(payload = %payload, "postMessage to parent");
        Ok(())
    }

    fn navigate(&self, url: &str) {
        info!(url = %url, "Redirecting");
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), HostError> {
        info!(text = %text, "Copy to clipboard");
        Ok(())
    }
}
