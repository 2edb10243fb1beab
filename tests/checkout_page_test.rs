//! Integration tests for the checkout page lifecycle
//!
//! Mounts each view against fake gateway SDKs, a fake document for script
//! tags and a recording host.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use embedded_checkout::api::payment::models::PaymentDetail;
    use embedded_checkout::api::payment::PaymentDetailSource;
    use embedded_checkout::config::Settings;
    use embedded_checkout::error::{CheckoutError, ExtractError, FetchError, HostError, SdkError};
    use embedded_checkout::gateways::button::{ButtonAdapter, ButtonEvent, ButtonOutcome, ButtonSdk};
    use embedded_checkout::gateways::card::{CardAdapter, HostedCheckoutWidget};
    use embedded_checkout::gateways::onchain::{
        OnChainAdapter, PanelEvent, ToastKind, WalletWidget, WalletWidgetAttrs, WalletWidgetState,
        COPY_FAILED, COPY_SUCCESS,
    };
    use embedded_checkout::gateways::script::{ScriptHost, ScriptRegistry};
    use embedded_checkout::gateways::{AdapterRegistry, Presentation};
    use embedded_checkout::host::{CheckoutHost, ParentEvent, ParentMessage};
    use embedded_checkout::routes::PageRequest;
    use embedded_checkout::workers::payment_reconciler::CheckPhase;
    use embedded_checkout::{CheckoutPage, PageOutcome};
    use reqwest::Url;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    // ------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------

    struct ScriptedSource {
        script: Vec<PaymentDetail>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<PaymentDetail>) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PaymentDetailSource for ScriptedSource {
        async fn fetch(&self, _payment_id: &str) -> Result<PaymentDetail, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.script[n.min(self.script.len() - 1)].clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PaymentDetailSource for FailingSource {
        async fn fetch(&self, _payment_id: &str) -> Result<PaymentDetail, FetchError> {
            Err(FetchError::NotFound)
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        messages: Mutex<Vec<ParentMessage>>,
        navigations: Mutex<Vec<String>>,
        clipboard: Mutex<Vec<String>>,
        clipboard_denied: bool,
    }

    #[async_trait]
    impl CheckoutHost for RecordingHost {
        fn post_to_parent(&self, message: &ParentMessage) -> Result<(), HostError> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn navigate(&self, url: &str) {
            self.navigations.lock().unwrap().push(url.to_string());
        }

        async fn write_clipboard(&self, text: &str) -> Result<(), HostError> {
            if self.clipboard_denied {
                return Err(HostError("permission denied".to_string()));
            }
            self.clipboard.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDocument {
        loaded: Mutex<Vec<String>>,
        broken_host: Option<&'static str>,
    }

    #[async_trait]
    impl ScriptHost for FakeDocument {
        fn remove_script(&self, _id: &str) -> bool {
            false
        }

        async fn insert_script(&self, _id: &str, src: &Url) -> Result<(), SdkError> {
            if self.broken_host.is_some() && src.host_str() == self.broken_host {
                return Err(SdkError::LoadFailed {
                    src: src.to_string(),
                    reason: "blocked by client".to_string(),
                });
            }
            self.loaded.lock().unwrap().push(src.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeHostedCheckout {
        keys: Mutex<Vec<String>>,
        mounts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HostedCheckoutWidget for FakeHostedCheckout {
        async fn load(&self, publishable_key: &str) -> Result<(), SdkError> {
            self.keys.lock().unwrap().push(publishable_key.to_string());
            Ok(())
        }

        async fn mount(&self, client_secret: &str) -> Result<(), SdkError> {
            self.mounts.lock().unwrap().push(client_secret.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeButtons {
        events: Mutex<Option<mpsc::UnboundedSender<ButtonEvent>>>,
        captured: Mutex<Vec<String>>,
        capture_fails: bool,
    }

    impl FakeButtons {
        fn click(&self, event: ButtonEvent) {
            if let Some(tx) = self.events.lock().unwrap().as_ref() {
                tx.send(event).unwrap();
            }
        }
    }

    #[async_trait]
    impl ButtonSdk for FakeButtons {
        async fn render_buttons(
            &self,
            _order_id: &str,
            events: mpsc::UnboundedSender<ButtonEvent>,
        ) -> Result<(), SdkError> {
            *self.events.lock().unwrap() = Some(events);
            Ok(())
        }

        async fn capture(&self, order_id: &str) -> Result<(), SdkError> {
            if self.capture_fails {
                return Err(SdkError::Widget("INSTRUMENT_DECLINED".to_string()));
            }
            self.captured.lock().unwrap().push(order_id.to_string());
            Ok(())
        }
    }

    struct FakeWallet {
        text: Option<&'static str>,
        attrs: Mutex<Option<WalletWidgetAttrs>>,
    }

    #[async_trait]
    impl WalletWidget for FakeWallet {
        async fn mount(&self, attrs: &WalletWidgetAttrs) -> Result<(), SdkError> {
            *self.attrs.lock().unwrap() = Some(attrs.clone());
            Ok(())
        }

        async fn rendered_text(&self) -> String {
            match self.text {
                Some(text) => text.to_string(),
                None => std::future::pending().await,
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn detail(status: i64, payment: Value, action: Value) -> PaymentDetail {
        let mut payment = payment;
        payment["status"] = json!(status);
        payment["paymentId"] = json!("pay_1");
        payment["invoiceId"] = json!("inv_1");
        payment["action"] = action;
        serde_json::from_value(json!({
            "paymentStatus": status,
            "payment": payment,
            "returnUrl": "https://m.example/ok",
            "cancelUrl": "https://m.example/cancel"
        }))
        .unwrap()
    }

    fn card_detail() -> PaymentDetail {
        detail(
            10,
            json!({ "currency": "USD", "totalAmount": 1999 }),
            json!({ "stripeAPIKey": "pk_test_0123456789", "stripeClientSecret": "cs_test_abcdef123456" }),
        )
    }

    fn button_detail(cancel_url: &str) -> PaymentDetail {
        detail(
            10,
            json!({ "currency": "eur", "totalAmount": 1999 }),
            json!({
                "paypalOrderID": "ORDER-1",
                "paypalClientId": "client-abc",
                "paypalReturnUrl": "https://m.example/paypal-ok",
                "paypalCancelUrl": cancel_url
            }),
        )
    }

    fn onchain_detail(status: i64, asset: &str, testnet: i64) -> PaymentDetail {
        detail(
            status,
            json!({
                "currency": "USD",
                "totalAmount": 1999,
                "cryptoCurrency": asset,
                "cryptoAmount": 150000000,
                "gatewayPaymentId": "gw_1"
            }),
            json!({
                "blockonomicsAddress": "bc1qexample",
                "blockonomicsReturnUrl": "https://m.example/crypto-ok",
                "testnet": testnet
            }),
        )
    }

    fn page(
        path: &str,
        source: Arc<dyn PaymentDetailSource>,
        host: Arc<RecordingHost>,
        adapters: AdapterRegistry,
    ) -> CheckoutPage {
        let request = PageRequest::parse(&format!("https://pay.example{}?paymentId=pay_1", path)).unwrap();
        CheckoutPage::new(request, source, host, Arc::new(adapters), Settings::default())
    }

    fn blocked_error(outcome: PageOutcome) -> (String, CheckoutError) {
        match outcome {
            PageOutcome::Blocked(blocked) => {
                assert!(blocked.retry);
                (blocked.message, blocked.error)
            }
            _ => panic!("expected a blocked page"),
        }
    }

    // ------------------------------------------------------------------
    // Card
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_card_widget_is_mounted_once() {
        let host = Arc::new(RecordingHost::default());
        let document = Arc::new(FakeDocument::default());
        let widget = Arc::new(FakeHostedCheckout::default());
        let scripts = Arc::new(ScriptRegistry::new(document.clone()));
        let adapters = AdapterRegistry::new().with(Box::new(CardAdapter::new(scripts, widget.clone())));
        let page = page("/embedded/stripe", ScriptedSource::new(vec![card_detail()]), host, adapters);

        for _ in 0..2 {
            match page.mount().await {
                PageOutcome::Gateway(gateway) => {
                    assert!(matches!(gateway.presentation, Presentation::HostedCheckout));
                    assert!(gateway.session.is_none());
                }
                _ => panic!("expected a gateway page"),
            }
        }

        assert_eq!(widget.keys.lock().unwrap().as_slice(), ["pk_test_0123456789"]);
        assert_eq!(widget.mounts.lock().unwrap().as_slice(), ["cs_test_abcdef123456"]);
        assert_eq!(document.loaded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_card_missing_secret_blocks_render() {
        let host = Arc::new(RecordingHost::default());
        let widget = Arc::new(FakeHostedCheckout::default());
        let scripts = Arc::new(ScriptRegistry::new(Arc::new(FakeDocument::default())));
        let adapters = AdapterRegistry::new().with(Box::new(CardAdapter::new(scripts, widget.clone())));
        let source = ScriptedSource::new(vec![detail(10, json!({}), json!({ "stripeAPIKey": "pk_1" }))]);

        let (message, error) = blocked_error(page("/embedded/stripe", source, host, adapters).mount().await);
        assert_eq!(
            error,
            CheckoutError::Extract(ExtractError::MissingRequiredField("stripeClientSecret"))
        );
        assert_eq!(message, "missing required field: stripeClientSecret");
        assert!(widget.mounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sdk_load_failure_blocks_adapter() {
        let host = Arc::new(RecordingHost::default());
        let document = Arc::new(FakeDocument {
            broken_host: Some("js.stripe.com"),
            ..FakeDocument::default()
        });
        let scripts = Arc::new(ScriptRegistry::new(document));
        let adapters = AdapterRegistry::new().with(Box::new(CardAdapter::new(
            scripts,
            Arc::new(FakeHostedCheckout::default()),
        )));

        let (message, error) = blocked_error(
            page("/embedded/stripe", ScriptedSource::new(vec![card_detail()]), host, adapters)
                .mount()
                .await,
        );
        assert!(matches!(error, CheckoutError::Sdk(SdkError::LoadFailed { .. })));
        assert_eq!(message, "Failed to load payment provider. Please try again.");
    }

    #[tokio::test]
    async fn test_first_fetch_failure_blocks_gateway_view() {
        let host = Arc::new(RecordingHost::default());
        let (message, error) = blocked_error(
            page("/embedded/paypal", Arc::new(FailingSource), host, AdapterRegistry::new())
                .mount()
                .await,
        );
        assert_eq!(error, CheckoutError::Fetch(FetchError::NotFound));
        assert_eq!(message, "Payment not found");
    }

    // ------------------------------------------------------------------
    // Buttons
    // ------------------------------------------------------------------

    fn button_page(sdk: Arc<FakeButtons>, host: Arc<RecordingHost>, detail: PaymentDetail) -> (CheckoutPage, Arc<FakeDocument>) {
        let document = Arc::new(FakeDocument::default());
        let scripts = Arc::new(ScriptRegistry::new(document.clone()));
        let adapters = AdapterRegistry::new().with(Box::new(ButtonAdapter::new(scripts, sdk, host.clone())));
        (page("/embedded/paypal", ScriptedSource::new(vec![detail]), host, adapters), document)
    }

    #[tokio::test]
    async fn test_button_approve_captures_then_redirects() {
        let host = Arc::new(RecordingHost::default());
        let sdk = Arc::new(FakeButtons::default());
        let (page, document) = button_page(sdk.clone(), host.clone(), button_detail(""));

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Buttons(mut flow) = gateway.presentation else {
            panic!("expected buttons");
        };
        assert_eq!(
            document.loaded.lock().unwrap().as_slice(),
            ["https://www.paypal.com/sdk/js?client-id=client-abc&currency=EUR"]
        );

        sdk.click(ButtonEvent::Approved);
        assert_eq!(
            flow.next().await,
            Some(ButtonOutcome::Redirect("https://m.example/paypal-ok".to_string()))
        );
        assert_eq!(sdk.captured.lock().unwrap().as_slice(), ["ORDER-1"]);
        assert_eq!(
            host.navigations.lock().unwrap().as_slice(),
            ["https://m.example/paypal-ok"]
        );
    }

    #[tokio::test]
    async fn test_button_error_and_cancel_without_cancel_url_show_messages() {
        let host = Arc::new(RecordingHost::default());
        let sdk = Arc::new(FakeButtons::default());
        let (page, _) = button_page(sdk.clone(), host.clone(), button_detail(""));

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Buttons(mut flow) = gateway.presentation else {
            panic!("expected buttons");
        };

        sdk.click(ButtonEvent::Error("Window closed".to_string()));
        assert_eq!(
            flow.next().await,
            Some(ButtonOutcome::Message("Payment failed: Window closed".to_string()))
        );
        sdk.click(ButtonEvent::Cancelled);
        assert_eq!(
            flow.next().await,
            Some(ButtonOutcome::Message("Payment was cancelled".to_string()))
        );
        assert!(host.navigations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_button_capture_failure_goes_to_cancel_url() {
        let host = Arc::new(RecordingHost::default());
        let sdk = Arc::new(FakeButtons {
            capture_fails: true,
            ..FakeButtons::default()
        });
        let (page, _) = button_page(sdk.clone(), host.clone(), button_detail("https://m.example/paypal-cancel"));

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Buttons(mut flow) = gateway.presentation else {
            panic!("expected buttons");
        };

        sdk.click(ButtonEvent::Approved);
        assert_eq!(
            flow.next().await,
            Some(ButtonOutcome::Redirect("https://m.example/paypal-cancel".to_string()))
        );
        assert!(sdk.captured.lock().unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // On-chain
    // ------------------------------------------------------------------

    fn onchain_adapters(host: Arc<RecordingHost>, document: Arc<FakeDocument>, wallet: Option<Arc<FakeWallet>>) -> AdapterRegistry {
        onchain_adapters_with(host, document, wallet, &Settings::default())
    }

    fn onchain_adapters_with(
        host: Arc<RecordingHost>,
        document: Arc<FakeDocument>,
        wallet: Option<Arc<FakeWallet>>,
        settings: &Settings,
    ) -> AdapterRegistry {
        let scripts = Arc::new(ScriptRegistry::new(document));
        let mut adapter = OnChainAdapter::new(scripts, host, settings);
        if let Some(wallet) = wallet {
            adapter = adapter.with_wallet_widget(wallet);
        }
        AdapterRegistry::new().with(Box::new(adapter))
    }

    #[tokio::test(start_paused = true)]
    async fn test_onchain_view_polls_until_confirmed() {
        let host = Arc::new(RecordingHost::default());
        let source = ScriptedSource::new(vec![onchain_detail(10, "BTC", 0), onchain_detail(20, "BTC", 0)]);
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), None);
        let page = page("/embedded/blockonomics", source.clone(), host.clone(), adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(panel) = gateway.presentation else {
            panic!("expected instructions");
        };
        assert_eq!(panel.instructions().crypto_amount, "1.50000000");
        assert_eq!(panel.instructions().fiat_amount, "19.99 USD");
        assert!(panel.wallet_widget().is_none());

        let session = gateway.session.expect("on-chain view polls");
        assert_eq!(session.view().header().headline, "Waiting for Payment");

        let view = session.settled().await;
        assert_eq!(view.phase, CheckPhase::Success);
        assert_eq!(view.header().headline, "Payment Confirmed");
        session.join().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            host.navigations.lock().unwrap().as_slice(),
            ["https://m.example/crypto-ok"]
        );
        assert_eq!(
            host.messages.lock().unwrap()[0].event,
            ParentEvent::PaymentSuccess
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panel_copy_and_qr_controls() {
        let host = Arc::new(RecordingHost::default());
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), None);
        let source = ScriptedSource::new(vec![onchain_detail(10, "BTC", 0)]);
        let page = page("/embedded/blockonomics", source, host.clone(), adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(mut panel) = gateway.presentation else {
            panic!("expected instructions");
        };

        panel.handle(PanelEvent::CopyAmount).await;
        panel.handle(PanelEvent::CopyAddress).await;
        assert_eq!(
            host.clipboard.lock().unwrap().as_slice(),
            ["1.50000000 BTC", "bc1qexample"]
        );
        let toast = panel.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert_eq!(toast.text, COPY_SUCCESS);

        sleep(Duration::from_secs(3)).await;
        assert!(panel.toast().is_none());

        panel.handle(PanelEvent::ShowQr).await;
        assert!(panel.qr_code().unwrap().as_str().ends_with("data=bc1qexample"));
        panel.handle(PanelEvent::CloseQr).await;
        assert!(panel.qr_code().is_none());

        if let Some(session) = gateway.session {
            session.teardown().await;
        }
    }

    #[tokio::test]
    async fn test_panel_copy_failure_toast() {
        let host = Arc::new(RecordingHost {
            clipboard_denied: true,
            ..RecordingHost::default()
        });
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), None);
        let source = ScriptedSource::new(vec![onchain_detail(10, "BTC", 0)]);
        let page = page("/embedded/blockonomics", source, host, adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(mut panel) = gateway.presentation else {
            panic!("expected instructions");
        };

        panel.handle(PanelEvent::CopyAddress).await;
        let toast = panel.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.text, COPY_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_usdt_wallet_widget_offers_install_links() {
        let host = Arc::new(RecordingHost::default());
        let wallet = Arc::new(FakeWallet {
            text: Some("No Web3 wallet found. Install Metamask or Phantom."),
            attrs: Mutex::new(None),
        });
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), Some(wallet.clone()));
        let source = ScriptedSource::new(vec![onchain_detail(10, "USDT", 1)]);
        let page = page("/embedded/blockonomics", source, host, adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(panel) = gateway.presentation else {
            panic!("expected instructions");
        };
        // test-mode USDT is shown as zero
        assert_eq!(panel.instructions().crypto_amount, "0.000000");
        assert_eq!(panel.instructions().fiat_amount, "0.00 USD");
        assert_eq!(panel.instructions().order_amount, "19.99 USD");

        let WalletWidgetState::NoWalletFound { links } = panel.wallet_widget_settled().await.unwrap() else {
            panic!("expected install links");
        };
        let names: Vec<_> = links.iter().map(|l| l.name).collect();
        assert_eq!(names, ["Metamask", "Phantom"]);

        let attrs = wallet.attrs.lock().unwrap().clone().unwrap();
        assert_eq!(attrs.receive_address, "bc1qexample");
        assert_eq!(attrs.redirect_url, "https://m.example/crypto-ok");
        assert_eq!(attrs.testnet, "1");

        if let Some(session) = gateway.session {
            session.teardown().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_widget_is_abandoned_after_window() {
        let host = Arc::new(RecordingHost::default());
        let wallet = Arc::new(FakeWallet {
            text: None,
            attrs: Mutex::new(None),
        });
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), Some(wallet));
        let source = ScriptedSource::new(vec![onchain_detail(10, "USDT", 0)]);
        let page = page("/embedded/blockonomics", source, host, adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(panel) = gateway.presentation else {
            panic!("expected instructions");
        };
        assert_eq!(panel.wallet_widget(), Some(WalletWidgetState::Connecting));
        assert_eq!(panel.wallet_widget_settled().await, Some(WalletWidgetState::TimedOut));
        assert!(gateway.session.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_widget_window_comes_from_settings() {
        let settings = Settings {
            wallet_widget_window_ms: 2_000,
            ..Settings::default()
        };
        let host = Arc::new(RecordingHost::default());
        let wallet = Arc::new(FakeWallet {
            text: None,
            attrs: Mutex::new(None),
        });
        let adapters = onchain_adapters_with(host.clone(), Arc::new(FakeDocument::default()), Some(wallet), &settings);
        let source = ScriptedSource::new(vec![onchain_detail(10, "USDT", 0)]);
        let page = page("/embedded/blockonomics", source, host, adapters);

        let started = tokio::time::Instant::now();
        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(panel) = gateway.presentation else {
            panic!("expected instructions");
        };
        assert_eq!(panel.wallet_widget_settled().await, Some(WalletWidgetState::TimedOut));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2), "gave up after {:?}", waited);
        assert!(waited < Duration::from_secs(10), "gave up after {:?}", waited);

        if let Some(session) = gateway.session {
            session.teardown().await;
        }
    }

    #[tokio::test]
    async fn test_wallet_widget_load_failure_keeps_panel() {
        let host = Arc::new(RecordingHost::default());
        let document = Arc::new(FakeDocument {
            broken_host: Some("blockonomics.co"),
            ..FakeDocument::default()
        });
        let wallet = Arc::new(FakeWallet {
            text: Some("ready"),
            attrs: Mutex::new(None),
        });
        let adapters = onchain_adapters(host.clone(), document, Some(wallet));
        let source = ScriptedSource::new(vec![onchain_detail(10, "USDT", 0)]);
        let page = page("/embedded/blockonomics", source, host, adapters);

        let PageOutcome::Gateway(gateway) = page.mount().await else {
            panic!("expected a gateway page");
        };
        let Presentation::Instructions(panel) = gateway.presentation else {
            panic!("expected instructions");
        };
        assert_eq!(
            panel.wallet_widget_settled().await,
            Some(WalletWidgetState::LoadFailed {
                message: "Failed to load Web3 Component".to_string()
            })
        );
        assert_eq!(panel.instructions().address, "bc1qexample");
        if let Some(session) = gateway.session {
            session.teardown().await;
        }
    }

    #[tokio::test]
    async fn test_unsupported_asset_blocks_render() {
        let host = Arc::new(RecordingHost::default());
        let adapters = onchain_adapters(host.clone(), Arc::new(FakeDocument::default()), None);
        let source = ScriptedSource::new(vec![onchain_detail(10, "ETH", 0)]);

        let (message, error) = blocked_error(page("/embedded/blockonomics", source, host, adapters).mount().await);
        assert_eq!(
            error,
            CheckoutError::Extract(ExtractError::UnsupportedCurrency("ETH".to_string()))
        );
        assert_eq!(message, "Unsupported cryptocurrency: ETH");
    }

    // ------------------------------------------------------------------
    // Status checker
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_status_checker_route_starts_polling() {
        let host = Arc::new(RecordingHost::default());
        let source = ScriptedSource::new(vec![card_detail(), detail(40, json!({}), json!({}))]);
        let page = page("/shop/embedded/payment_checker", source.clone(), host.clone(), AdapterRegistry::new());

        let PageOutcome::StatusChecker(session) = page.mount().await else {
            panic!("expected the status checker");
        };
        let view = session.settled().await;
        assert_eq!(view.phase, CheckPhase::Cancelled);
        assert_eq!(view.return_url.as_deref(), Some("https://m.example/cancel"));
        assert_eq!(
            host.messages.lock().unwrap()[0].event,
            ParentEvent::PaymentCancelled
        );
        assert!(host.navigations.lock().unwrap().is_empty());
    }
}
