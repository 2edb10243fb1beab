//! Redirect-button flow
//!
//! The button SDK renders the buttons and reports the buyer's decision as
//! [`ButtonEvent`]s; [`ButtonFlow`] turns each one into a redirect or an
//! on-page message.

use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::script::{ScriptRegistry, SdkProvider};
use super::{mismatched_action, ConfirmationSource, GatewayAdapter, Presentation};
use crate::error::{CheckoutError, SdkError};
use crate::host::CheckoutHost;
use crate::logging::mask_secret;
use crate::services::action_data::{ActionData, ButtonAction, GatewayKind};

pub const PAYPAL_SDK_URL: &str = "https://www.paypal.com/sdk/js";

pub const COMPLETED_MESSAGE: &str = "Payment completed successfully! Please close this window.";
pub const CANCELLED_MESSAGE: &str = "Payment was cancelled";

/// SDK source for a client id and currency pairing
pub fn sdk_url(client_id: &str, currency: &str) -> Result<Url, SdkError> {
    Url::parse_with_params(PAYPAL_SDK_URL, &[("client-id", client_id), ("currency", currency)])
        .map_err(|e| SdkError::LoadFailed {
            src: PAYPAL_SDK_URL.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonEvent {
    Approved,
    Error(String),
    Cancelled,
}

#[async_trait]
pub trait ButtonSdk: Send + Sync {
    /// Render the buttons for `order_id`; decisions are sent on `events`
    async fn render_buttons(
        &self,
        order_id: &str,
        events: mpsc::UnboundedSender<ButtonEvent>,
    ) -> Result<(), SdkError>;

    async fn capture(&self, order_id: &str) -> Result<(), SdkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonOutcome {
    /// Navigated away; the page is done
    Redirect(String),
    Message(String),
}

pub struct ButtonFlow {
    order_id: String,
    return_url: Option<String>,
    cancel_url: Option<String>,
    sdk: Arc<dyn ButtonSdk>,
    host: Arc<dyn CheckoutHost>,
    events: mpsc::UnboundedReceiver<ButtonEvent>,
}

impl fmt::Debug for ButtonFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonFlow")
            .field("order_id", &self.order_id)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .finish_non_exhaustive()
    }
}

impl ButtonFlow {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Handle the next buyer decision; `None` once the buttons are gone
    pub async fn next(&mut self) -> Option<ButtonOutcome> {
        let event = self.events.recv().await?;
        info!(order_id = %self.order_id, event = ?event, "Button event");

        let outcome = match event {
            ButtonEvent::Approved => match self.sdk.capture(&self.order_id).await {
                Ok(()) => {
                    info!(order_id = %self.order_id, "Order captured");
                    match &self.return_url {
                        Some(url) => ButtonOutcome::Redirect(url.clone()),
                        None => ButtonOutcome::Message(COMPLETED_MESSAGE.to_string()),
                    }
                }
                Err(e) => {
                    warn!(order_id = %self.order_id, error = %e, "Order capture failed");
                    self.failed(&e.to_string())
                }
            },
            ButtonEvent::Error(message) => self.failed(&message),
            ButtonEvent::Cancelled => match &self.cancel_url {
                Some(url) => ButtonOutcome::Redirect(url.clone()),
                None => ButtonOutcome::Message(CANCELLED_MESSAGE.to_string()),
            },
        };

        if let ButtonOutcome::Redirect(url) = &outcome {
            self.host.navigate(url);
        }
        Some(outcome)
    }

    fn failed(&self, message: &str) -> ButtonOutcome {
        match &self.cancel_url {
            Some(url) => ButtonOutcome::Redirect(url.clone()),
            None => ButtonOutcome::Message(format!("Payment failed: {}", message)),
        }
    }
}

pub struct ButtonAdapter {
    scripts: Arc<ScriptRegistry>,
    sdk: Arc<dyn ButtonSdk>,
    host: Arc<dyn CheckoutHost>,
}

impl ButtonAdapter {
    pub fn new(
        scripts: Arc<ScriptRegistry>,
        sdk: Arc<dyn ButtonSdk>,
        host: Arc<dyn CheckoutHost>,
    ) -> Self {
        Self { scripts, sdk, host }
    }

    async fn render(&self, button: &ButtonAction) -> Result<ButtonFlow, SdkError> {
        let src = sdk_url(&button.client_id, &button.currency)?;
        self.scripts.load(SdkProvider::PayPal, &src).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.sdk.render_buttons(&button.order_id, tx).await?;

        Ok(ButtonFlow {
            order_id: button.order_id.clone(),
            return_url: button.return_url.clone(),
            cancel_url: button.cancel_url.clone(),
            sdk: Arc::clone(&self.sdk),
            host: Arc::clone(&self.host),
            events: rx,
        })
    }
}

#[async_trait]
impl GatewayAdapter for ButtonAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Button
    }

    fn confirmation(&self) -> ConfirmationSource {
        ConfirmationSource::External
    }

    #[instrument(skip_all, fields(gateway = "button"))]
    async fn present(&self, action: &ActionData) -> Result<Presentation, CheckoutError> {
        let ActionData::Button(button) = action else {
            return Err(mismatched_action(GatewayKind::Button));
        };

        let flow = self.render(button).await?;
        info!(
            order_id = %button.order_id,
            client_id = %mask_secret(&button.client_id),
            currency = %button.currency,
            "Payment buttons rendered"
        );
        Ok(Presentation::Buttons(flow))
    }
}
