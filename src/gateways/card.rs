//! Card flow: hosted checkout widget
//!
//! The widget owns the whole payment; this adapter only loads the SDK
//! with the publishable key and mounts it once with the client secret.

use async_trait::async_trait;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

use super::script::{ScriptRegistry, SdkProvider};
use super::{mismatched_action, ConfirmationSource, GatewayAdapter, Presentation};
use crate::error::{CheckoutError, SdkError};
use crate::logging::mask_secret;
use crate::services::action_data::{ActionData, GatewayKind};

pub const STRIPE_SDK_URL: &str = "https://js.stripe.com/v3/";

/// The embedded checkout object of the card SDK
#[async_trait]
pub trait HostedCheckoutWidget: Send + Sync {
    async fn load(&self, publishable_key: &str) -> Result<(), SdkError>;
    async fn mount(&self, client_secret: &str) -> Result<(), SdkError>;
}

pub struct CardAdapter {
    scripts: Arc<ScriptRegistry>,
    widget: Arc<dyn HostedCheckoutWidget>,
    mounted: AtomicBool,
}

impl CardAdapter {
    pub fn new(scripts: Arc<ScriptRegistry>, widget: Arc<dyn HostedCheckoutWidget>) -> Self {
        Self {
            scripts,
            widget,
            mounted: AtomicBool::new(false),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayAdapter for CardAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Card
    }

    fn confirmation(&self) -> ConfirmationSource {
        ConfirmationSource::External
    }

    #[instrument(skip_all, fields(gateway = "card"))]
    async fn present(&self, action: &ActionData) -> Result<Presentation, CheckoutError> {
        let ActionData::Card(card) = action else {
            return Err(mismatched_action(GatewayKind::Card));
        };

        if self.mounted.swap(true, Ordering::SeqCst) {
            return Ok(Presentation::HostedCheckout);
        }

        let result = async {
            let src = Url::parse(STRIPE_SDK_URL).map_err(|e| SdkError::LoadFailed {
                src: STRIPE_SDK_URL.to_string(),
                reason: e.to_string(),
            })?;
            self.scripts.load(SdkProvider::Stripe, &src).await?;
            self.widget.load(&card.publishable_key).await?;
            self.widget.mount(&card.client_secret).await
        }
        .await;

        match result {
            Ok(()) => {
                info!(
                    publishable_key = %mask_secret(&card.publishable_key),
                    "Hosted checkout mounted"
                );
                Ok(Presentation::HostedCheckout)
            }
            Err(e) => {
                self.mounted.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }
}
