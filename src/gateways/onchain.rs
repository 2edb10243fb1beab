//! On-chain flow: payment instructions
//!
//! Renders address, amount and fiat equivalent, handles the panel's copy
//! and QR controls, and for USDT opportunistically mounts a wallet-connect
//! widget. Confirmation comes from status polling, not from this adapter.

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{info, instrument, warn};

use super::script::{ScriptRegistry, SdkProvider};
use super::{mismatched_action, ConfirmationSource, GatewayAdapter, Presentation};
use crate::config::Settings;
use crate::error::{CheckoutError, SdkError};
use crate::host::CheckoutHost;
use crate::services::action_data::{ActionData, GatewayKind, OnChainAction};
use crate::services::amount::{format_crypto_amount, format_fiat_amount, CryptoAsset};

pub const EXPLORER_SEARCH_URL: &str = "https://www.blockonomics.co/#/search?q=";
pub const QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
pub const WEB3_WIDGET_URL: &str = "https://blockonomics.co/js/web3-payment.js";

pub const COPY_SUCCESS: &str = "Copied successfully!";
pub const COPY_FAILED: &str = "Copy failed, please copy manually";
pub const WIDGET_LOAD_FAILED: &str = "Failed to load Web3 Component";
const NO_WALLET_MARKER: &str = "No Web3 wallet found";

/// How long a toast stays visible
pub const TOAST_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// Instructions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    TestMode,
    Important,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn for_payment(asset: CryptoAsset, amount: &str, testnet: bool) -> Self {
        if testnet {
            return Self {
                kind: NoticeKind::TestMode,
                text: format!(
                    "This is a test payment. No actual {} transfer is required. \
                     The payment will be automatically confirmed for testing purposes.",
                    asset.code()
                ),
            };
        }
        let balance = match asset {
            CryptoAsset::Btc => "sufficient balance",
            CryptoAsset::Usdt => "sufficient ETH balance",
        };
        Self {
            kind: NoticeKind::Important,
            text: format!(
                "Please ensure your wallet has {} to cover network fees (Gas fees). \
                 Send exactly {} {} to the address above. \
                 Payment will be confirmed automatically once received.",
                balance,
                amount,
                asset.code()
            ),
        }
    }
}

/// Display-ready content of the instruction panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInstructions {
    pub title: &'static str,
    pub name: String,
    pub description: String,
    pub asset: CryptoAsset,
    pub address: String,
    pub crypto_amount: String,
    /// e.g. `"19.99 USD"`
    pub fiat_amount: String,
    /// The order amount as reported, e.g. `"19.99 USD"`
    pub order_amount: String,
    pub notice: Notice,
    pub explorer_url: String,
    pub testnet: bool,
}

impl PaymentInstructions {
    pub fn from_action(action: &OnChainAction) -> Self {
        let crypto_amount = format_crypto_amount(action.crypto_amount, action.asset);
        Self {
            title: action.asset.label(),
            name: action.name.clone(),
            description: action.description.clone(),
            asset: action.asset,
            address: action.address.clone(),
            notice: Notice::for_payment(action.asset, &crypto_amount, action.testnet),
            crypto_amount,
            fiat_amount: format!(
                "{} {}",
                format_fiat_amount(action.fiat_amount),
                action.fiat_currency
            ),
            order_amount: format!(
                "{} {}",
                format_fiat_amount(action.order_amount),
                action.fiat_currency
            ),
            explorer_url: format!("{}{}", EXPLORER_SEARCH_URL, action.gateway_payment_id),
            testnet: action.testnet,
        }
    }

    /// `"1.50000000 BTC"`, the text the copy-amount control writes
    pub fn amount_with_asset(&self) -> String {
        format!("{} {}", self.crypto_amount, self.asset.code())
    }
}

/// QR image for `text`
pub fn qr_code_url(text: &str) -> Option<Url> {
    Url::parse_with_params(QR_SERVICE_URL, &[("size", "200x200"), ("data", text)]).ok()
}

// ============================================================================
// Wallet widget
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletWidgetAttrs {
    pub order_amount: String,
    pub receive_address: String,
    pub redirect_url: String,
    pub testnet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletLink {
    pub name: &'static str,
    pub url: &'static str,
}

pub const WALLET_INSTALL_LINKS: [WalletLink; 2] = [
    WalletLink { name: "Metamask", url: "https://metamask.io/download" },
    WalletLink { name: "Phantom", url: "https://phantom.app/download" },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletWidgetState {
    Connecting,
    Ready,
    NoWalletFound { links: Vec<WalletLink> },
    /// Gave up observing; whatever the widget shows stays as is
    TimedOut,
    LoadFailed { message: String },
}

/// The `<web3-payment>` element
#[async_trait]
pub trait WalletWidget: Send + Sync {
    async fn mount(&self, attrs: &WalletWidgetAttrs) -> Result<(), SdkError>;

    /// Resolves with the widget's text once it has rendered content
    async fn rendered_text(&self) -> String;
}

async fn run_wallet_widget(
    scripts: Arc<ScriptRegistry>,
    widget: Arc<dyn WalletWidget>,
    attrs: WalletWidgetAttrs,
    window: Duration,
) -> WalletWidgetState {
    let loaded = async {
        let src = Url::parse(WEB3_WIDGET_URL).map_err(|e| SdkError::LoadFailed {
            src: WEB3_WIDGET_URL.to_string(),
            reason: e.to_string(),
        })?;
        scripts.load(SdkProvider::Web3Wallet, &src).await?;
        widget.mount(&attrs).await
    }
    .await;

    if let Err(e) = loaded {
        warn!(error = %e, "Wallet widget unavailable");
        return WalletWidgetState::LoadFailed {
            message: WIDGET_LOAD_FAILED.to_string(),
        };
    }

    match timeout(window, widget.rendered_text()).await {
        Ok(text) if text.contains(NO_WALLET_MARKER) => {
            info!("No browser wallet detected, offering install links");
            WalletWidgetState::NoWalletFound {
                links: WALLET_INSTALL_LINKS.to_vec(),
            }
        }
        Ok(_) => WalletWidgetState::Ready,
        Err(_) => {
            warn!(window_ms = window.as_millis() as u64, "Wallet widget did not render in time");
            WalletWidgetState::TimedOut
        }
    }
}

// ============================================================================
// Panel
// ============================================================================

/// Controls of the instruction panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    CopyAddress,
    CopyAmount,
    ShowQr,
    CloseQr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: &'static str,
    pub expires_at: Instant,
}

pub struct OnChainPanel {
    instructions: PaymentInstructions,
    host: Arc<dyn CheckoutHost>,
    qr_code: Option<Url>,
    toast: Option<Toast>,
    wallet: Option<watch::Receiver<WalletWidgetState>>,
    wallet_task: Option<JoinHandle<()>>,
}

impl fmt::Debug for OnChainPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnChainPanel")
            .field("instructions", &self.instructions)
            .field("qr_code", &self.qr_code)
            .field("toast", &self.toast)
            .finish_non_exhaustive()
    }
}

impl OnChainPanel {
    pub fn new(instructions: PaymentInstructions, host: Arc<dyn CheckoutHost>) -> Self {
        Self {
            instructions,
            host,
            qr_code: None,
            toast: None,
            wallet: None,
            wallet_task: None,
        }
    }

    pub fn instructions(&self) -> &PaymentInstructions {
        &self.instructions
    }

    pub async fn handle(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::CopyAddress => {
                let address = self.instructions.address.clone();
                self.copy(&address).await;
            }
            PanelEvent::CopyAmount => {
                let amount = self.instructions.amount_with_asset();
                self.copy(&amount).await;
            }
            PanelEvent::ShowQr => self.qr_code = qr_code_url(&self.instructions.address),
            PanelEvent::CloseQr => self.qr_code = None,
        }
    }

    async fn copy(&mut self, text: &str) {
        let (kind, message) = match self.host.write_clipboard(text).await {
            Ok(()) => (ToastKind::Success, COPY_SUCCESS),
            Err(e) => {
                warn!(error = %e, "Copy to clipboard failed");
                (ToastKind::Error, COPY_FAILED)
            }
        };
        self.toast = Some(Toast {
            kind,
            text: message,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    /// Visible toast, if it has not expired
    pub fn toast(&self) -> Option<&Toast> {
        self.toast
            .as_ref()
            .filter(|toast| Instant::now() < toast.expires_at)
    }

    pub fn qr_code(&self) -> Option<&Url> {
        self.qr_code.as_ref()
    }

    /// `None` when the asset has no wallet widget
    pub fn wallet_widget(&self) -> Option<WalletWidgetState> {
        self.wallet.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Wait until the wallet widget leaves `Connecting`
    pub async fn wallet_widget_settled(&self) -> Option<WalletWidgetState> {
        let mut rx = self.wallet.clone()?;
        let settled = rx
            .wait_for(|state| *state != WalletWidgetState::Connecting)
            .await
            .map(|state| state.clone());
        Some(settled.unwrap_or_else(|_| rx.borrow().clone()))
    }

    fn attach_wallet_widget(
        &mut self,
        scripts: Arc<ScriptRegistry>,
        widget: Arc<dyn WalletWidget>,
        attrs: WalletWidgetAttrs,
        window: Duration,
    ) {
        let (tx, rx) = watch::channel(WalletWidgetState::Connecting);
        let task = tokio::spawn(async move {
            let state = run_wallet_widget(scripts, widget, attrs, window).await;
            let _ = tx.send(state);
        });
        self.wallet = Some(rx);
        self.wallet_task = Some(task);
    }
}

impl Drop for OnChainPanel {
    fn drop(&mut self) {
        if let Some(task) = self.wallet_task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

pub struct OnChainAdapter {
    scripts: Arc<ScriptRegistry>,
    host: Arc<dyn CheckoutHost>,
    wallet_widget: Option<Arc<dyn WalletWidget>>,
    widget_window: Duration,
}

impl OnChainAdapter {
    /// The wallet widget, once enabled, is observed for
    /// `settings.wallet_widget_window()`
    pub fn new(scripts: Arc<ScriptRegistry>, host: Arc<dyn CheckoutHost>, settings: &Settings) -> Self {
        Self {
            scripts,
            host,
            wallet_widget: None,
            widget_window: settings.wallet_widget_window(),
        }
    }

    /// Enable the USDT wallet-connect widget
    pub fn with_wallet_widget(mut self, widget: Arc<dyn WalletWidget>) -> Self {
        self.wallet_widget = Some(widget);
        self
    }
}

#[async_trait]
impl GatewayAdapter for OnChainAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::OnChain
    }

    fn confirmation(&self) -> ConfirmationSource {
        ConfirmationSource::Polling
    }

    #[instrument(skip_all, fields(gateway = "on_chain"))]
    async fn present(&self, action: &ActionData) -> Result<Presentation, CheckoutError> {
        let ActionData::OnChain(onchain) = action else {
            return Err(mismatched_action(GatewayKind::OnChain));
        };

        let instructions = PaymentInstructions::from_action(onchain);
        info!(
            asset = onchain.asset.code(),
            amount = %instructions.crypto_amount,
            testnet = onchain.testnet,
            "Payment instructions rendered"
        );

        let mut panel = OnChainPanel::new(instructions, Arc::clone(&self.host));

        if let (CryptoAsset::Usdt, Some(widget)) = (onchain.asset, &self.wallet_widget) {
            let attrs = WalletWidgetAttrs {
                order_amount: panel.instructions.crypto_amount.clone(),
                receive_address: onchain.address.clone(),
                redirect_url: onchain.return_url.clone().unwrap_or_default(),
                testnet: if onchain.testnet { "1" } else { "0" }.to_string(),
            };
            panel.attach_wallet_widget(
                Arc::clone(&self.scripts),
                Arc::clone(widget),
                attrs,
                self.widget_window,
            );
        }

        Ok(Presentation::Instructions(Box::new(panel)))
    }
}
