//! Page lifecycle
//!
//! Wires a parsed page request to the fetcher, the gateway adapters and
//! the polling session. Every fatal error ends in [`PageOutcome::Blocked`].

use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::api::payment::PaymentDetailSource;
use crate::config::Settings;
use crate::error::{CheckoutError, SdkError};
use crate::gateways::{AdapterRegistry, ConfirmationSource, Presentation};
use crate::host::CheckoutHost;
use crate::routes::{PageRequest, Route};
use crate::services::action_data::{self, GatewayKind};
use crate::workers::payment_reconciler::{ReconcileView, ReconcilerConfig};
use crate::workers::polling_session::PollingSession;

/// Blocking error screen
#[derive(Debug)]
pub struct BlockedPage {
    pub title: &'static str,
    pub message: String,
    pub error: CheckoutError,
    /// A manual reload is always offered
    pub retry: bool,
}

pub struct GatewayPage {
    pub kind: GatewayKind,
    pub presentation: Presentation,
    /// Running only for gateways confirmed by polling
    pub session: Option<PollingSession>,
}

pub enum PageOutcome {
    Blocked(BlockedPage),
    Gateway(GatewayPage),
    StatusChecker(PollingSession),
}

impl PageOutcome {
    pub fn blocked(title: &'static str, error: CheckoutError) -> Self {
        PageOutcome::Blocked(BlockedPage {
            title,
            message: error.user_message(),
            error,
            retry: true,
        })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, PageOutcome::Blocked(_))
    }
}

pub struct CheckoutPage {
    request: PageRequest,
    source: Arc<dyn PaymentDetailSource>,
    host: Arc<dyn CheckoutHost>,
    adapters: Arc<AdapterRegistry>,
    settings: Settings,
}

impl CheckoutPage {
    pub fn new(
        request: PageRequest,
        source: Arc<dyn PaymentDetailSource>,
        host: Arc<dyn CheckoutHost>,
        adapters: Arc<AdapterRegistry>,
        settings: Settings,
    ) -> Self {
        Self {
            request,
            source,
            host,
            adapters,
            settings,
        }
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Run the view's mount sequence
    #[instrument(skip(self), fields(payment_id = %self.request.params.payment_id, route = ?self.request.route))]
    pub async fn mount(&self) -> PageOutcome {
        match self.request.route {
            Route::StatusChecker => {
                let config = ReconcilerConfig::from_settings(
                    &self.settings,
                    ReconcileView::StatusChecker,
                    &self.request.params.env,
                );
                let session = PollingSession::start(
                    self.request.params.payment_id.clone(),
                    Arc::clone(&self.source),
                    Arc::clone(&self.host),
                    config,
                );
                info!(session_id = %session.id(), "Status checker mounted");
                PageOutcome::StatusChecker(session)
            }
            Route::Gateway(kind) => match self.mount_gateway(kind).await {
                Ok(page) => PageOutcome::Gateway(page),
                Err(e) => {
                    error!(gateway = kind.as_str(), error = %e, "Checkout page blocked");
                    PageOutcome::blocked(self.request.route.title(), e)
                }
            },
        }
    }

    async fn mount_gateway(&self, kind: GatewayKind) -> Result<GatewayPage, CheckoutError> {
        let payment_id = &self.request.params.payment_id;

        let detail = self.source.fetch(payment_id).await?;
        let action = action_data::extract(&detail, kind)?;

        let adapter = self.adapters.get(kind).ok_or_else(|| {
            SdkError::Widget(format!("{} gateway is not available", kind.as_str()))
        })?;
        let presentation = adapter.present(&action).await?;

        let session = match adapter.confirmation() {
            ConfirmationSource::External => None,
            ConfirmationSource::Polling => {
                let config = ReconcilerConfig::from_settings(
                    &self.settings,
                    ReconcileView::PaymentDetails,
                    &self.request.params.env,
                );
                Some(PollingSession::resume(
                    payment_id.clone(),
                    Arc::clone(&self.source),
                    Arc::clone(&self.host),
                    config,
                    detail,
                ))
            }
        };

        info!(
            gateway = kind.as_str(),
            polling = session.is_some(),
            "Gateway view mounted"
        );

        Ok(GatewayPage {
            kind,
            presentation,
            session,
        })
    }
}
