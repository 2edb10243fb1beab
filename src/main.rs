use std::sync::Arc;

use anyhow::Context;
use embedded_checkout::api::payment::{api_root, PaymentDetailClient};
use embedded_checkout::gateways::AdapterRegistry;
use embedded_checkout::host::ConsoleHost;
use embedded_checkout::logging::init_tracing;
use embedded_checkout::routes::{PageRequest, Route};
use embedded_checkout::{CheckoutPage, PageOutcome, Settings};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load checkout settings")?;
    init_tracing();

    let page_url = std::env::args()
        .nth(1)
        .context("usage: payment-checker <page-url>")?;

    let request = PageRequest::parse(&page_url).map_err(|e| {
        error!(error = %e, "Invalid page URL");
        e
    })?;
    if request.route != Route::StatusChecker {
        warn!(route = ?request.route, "Only the status checker runs headless, checking status instead");
    }

    let root = api_root(&request.url, &settings.api_base_url)?;
    let client = PaymentDetailClient::new(&root, settings.request_timeout())?;
    info!(endpoint = %client.endpoint(), payment_id = %request.params.payment_id, "Starting payment checker");

    let request = PageRequest {
        route: Route::StatusChecker,
        ..request
    };
    let page = CheckoutPage::new(
        request,
        Arc::new(client),
        Arc::new(ConsoleHost),
        Arc::new(AdapterRegistry::new()),
        settings,
    );

    let session = match page.mount().await {
        PageOutcome::StatusChecker(session) => session,
        PageOutcome::Blocked(blocked) => anyhow::bail!(blocked.message),
        PageOutcome::Gateway(_) => anyhow::bail!("unexpected gateway view"),
    };

    tokio::select! {
        view = session.settled() => {
            view.log_settled();
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping payment checker");
        }
    }

    let diagnostics = session.diagnostics();
    info!(
        polls = diagnostics.polls,
        failed_polls = diagnostics.failed_polls,
        "Polling summary"
    );

    // Let a scheduled redirect run before exiting.
    if session.view().redirect.is_some() {
        session.join().await;
    } else {
        session.teardown().await;
    }

    Ok(())
}
