//! ActionData extraction
//!
//! Turns the loosely-typed `action` bag of a payment record into one
//! strongly-typed, gateway-specific view. Extraction is pure: optional
//! fields fall back to documented defaults, mandatory ones fail with
//! `ExtractError::MissingRequiredField`.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::payment::models::{non_empty, PaymentDetail, PaymentRecord};
use crate::error::ExtractError;
use crate::logging::redact_sensitive_data;
use crate::services::amount::CryptoAsset;

pub const DEFAULT_CRYPTO_CURRENCY: &str = "BTC";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_ONCHAIN_NAME: &str = "Payment";

/// Checkout flow a payment is presented with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Hosted card checkout seeded with a client secret
    Card,
    /// Wallet button seeded with an order reference
    Button,
    /// On-chain transfer to a receive address
    OnChain,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Card => "card",
            GatewayKind::Button => "button",
            GatewayKind::OnChain => "on_chain",
        }
    }

    /// Field-presence detection for callers that don't know the flow up
    /// front. Page routes pass their kind explicitly instead.
    pub fn detect(action: &Map<String, Value>) -> Option<Self> {
        let has_prefix = |prefix: &str| action.keys().any(|k| k.starts_with(prefix));
        if has_prefix("stripe") {
            Some(GatewayKind::Card)
        } else if has_prefix("paypal") {
            Some(GatewayKind::Button)
        } else if has_prefix("blockonomics") {
            Some(GatewayKind::OnChain)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardAction {
    pub publishable_key: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonAction {
    pub order_id: String,
    pub client_id: String,
    /// Upper-cased ISO code the SDK is loaded with
    pub currency: String,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainAction {
    pub asset: CryptoAsset,
    pub address: String,
    pub name: String,
    pub description: String,
    pub testnet: bool,
    /// Minor units of `asset`; zeroed for test-mode USDT
    pub crypto_amount: u64,
    /// Fiat equivalent in cents; zeroed for test-mode USDT
    pub fiat_amount: u64,
    pub fiat_currency: String,
    /// The merchant's order amount as reported, never zeroed
    pub order_amount: u64,
    pub gateway_payment_id: String,
    pub payment_code: Option<String>,
    pub return_url: Option<String>,
}

/// Gateway-specific presentation data, resolved once per record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionData {
    Card(CardAction),
    Button(ButtonAction),
    OnChain(OnChainAction),
}

impl ActionData {
    pub fn kind(&self) -> GatewayKind {
        match self {
            ActionData::Card(_) => GatewayKind::Card,
            ActionData::Button(_) => GatewayKind::Button,
            ActionData::OnChain(_) => GatewayKind::OnChain,
        }
    }
}

/// Where the success redirect target is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnUrlSource {
    /// Top-level `returnUrl` of the payment detail
    Detail,
    /// The on-chain action's return URL, then the top-level one
    Action,
}

/// Extract the view for an explicitly chosen gateway.
pub fn extract(detail: &PaymentDetail, kind: GatewayKind) -> Result<ActionData, ExtractError> {
    let record = record(detail)?;
    let action = action(record)?;

    let redacted = redact_sensitive_data(&Value::Object(action.clone()).to_string());
    debug!(gateway = kind.as_str(), action = %redacted, "Extracting action data");

    match kind {
        GatewayKind::Card => extract_card(action).map(ActionData::Card),
        GatewayKind::Button => extract_button(record, action).map(ActionData::Button),
        GatewayKind::OnChain => extract_on_chain(record, action).map(ActionData::OnChain),
    }
}

/// Extract using field-presence detection.
pub fn extract_detected(detail: &PaymentDetail) -> Result<ActionData, ExtractError> {
    let action = action(record(detail)?)?;
    let kind = GatewayKind::detect(action).ok_or(ExtractError::MissingRequiredField("action"))?;
    extract(detail, kind)
}

/// Success redirect target, `None` meaning "stay on the confirmation".
pub fn success_redirect_url(detail: &PaymentDetail, source: ReturnUrlSource) -> Option<String> {
    let from_action = || {
        detail
            .payment
            .as_ref()
            .and_then(|p| p.action.as_ref())
            .and_then(action_return_url)
    };
    match source {
        ReturnUrlSource::Detail => detail.return_url().map(str::to_string),
        ReturnUrlSource::Action => {
            from_action().or_else(|| detail.return_url().map(str::to_string))
        }
    }
}

/// `cryptoCurrency`, default `"BTC"`
pub fn crypto_currency(record: &PaymentRecord) -> &str {
    non_empty(record.crypto_currency.as_deref()).unwrap_or(DEFAULT_CRYPTO_CURRENCY)
}

/// `currency`, default `"USD"`
pub fn currency(record: &PaymentRecord) -> &str {
    non_empty(record.currency.as_deref()).unwrap_or(DEFAULT_CURRENCY)
}

/// `gatewayPaymentId`, default `""`
pub fn gateway_payment_id(record: &PaymentRecord) -> &str {
    record.gateway_payment_id.as_deref().unwrap_or_default()
}

/// `testnet`, default `0`. Accepts numbers, booleans and numeric strings.
pub fn testnet_flag(action: &Map<String, Value>) -> i64 {
    match action.get("testnet") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn record(detail: &PaymentDetail) -> Result<&PaymentRecord, ExtractError> {
    detail
        .payment
        .as_ref()
        .ok_or(ExtractError::MissingRequiredField("payment"))
}

fn action(record: &PaymentRecord) -> Result<&Map<String, Value>, ExtractError> {
    record
        .action
        .as_ref()
        .ok_or(ExtractError::MissingRequiredField("action"))
}

fn text<'a>(action: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    action.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn required(action: &Map<String, Value>, field: &'static str) -> Result<String, ExtractError> {
    text(action, field)
        .map(str::to_string)
        .ok_or(ExtractError::MissingRequiredField(field))
}

fn optional(action: &Map<String, Value>, field: &str) -> Option<String> {
    text(action, field).map(str::to_string)
}

fn action_return_url(action: &Map<String, Value>) -> Option<String> {
    optional(action, "blockonomicsReturnUrl").or_else(|| optional(action, "returnUrl"))
}

fn amount(value: Option<i64>, field: &str) -> u64 {
    match value {
        Some(v) if v < 0 => {
            warn!(field = field, value = v, "Negative amount in payment record, using 0");
            0
        }
        Some(v) => v as u64,
        None => 0,
    }
}

fn extract_card(action: &Map<String, Value>) -> Result<CardAction, ExtractError> {
    Ok(CardAction {
        publishable_key: required(action, "stripeAPIKey")?,
        client_secret: required(action, "stripeClientSecret")?,
    })
}

fn extract_button(
    record: &PaymentRecord,
    action: &Map<String, Value>,
) -> Result<ButtonAction, ExtractError> {
    Ok(ButtonAction {
        client_id: required(action, "paypalClientId")?,
        order_id: required(action, "paypalOrderID")?,
        currency: currency(record).to_uppercase(),
        return_url: optional(action, "paypalReturnUrl"),
        cancel_url: optional(action, "paypalCancelUrl"),
    })
}

fn extract_on_chain(
    record: &PaymentRecord,
    action: &Map<String, Value>,
) -> Result<OnChainAction, ExtractError> {
    let code = crypto_currency(record);
    let asset = CryptoAsset::from_code(code)
        .ok_or_else(|| ExtractError::UnsupportedCurrency(code.to_string()))?;
    let address = required(action, "blockonomicsAddress")?;
    let testnet = testnet_flag(action) == 1;

    let order_amount = amount(record.total_amount, "totalAmount");
    let (crypto_amount, fiat_amount) = if testnet && asset == CryptoAsset::Usdt {
        (0, 0)
    } else {
        (amount(record.crypto_amount, "cryptoAmount"), order_amount)
    };

    Ok(OnChainAction {
        asset,
        address,
        name: optional(action, "blockonomicsName").unwrap_or_else(|| DEFAULT_ONCHAIN_NAME.to_string()),
        description: optional(action, "blockonomicsDescription").unwrap_or_default(),
        testnet,
        crypto_amount,
        fiat_amount,
        fiat_currency: currency(record).to_string(),
        order_amount,
        gateway_payment_id: gateway_payment_id(record).to_string(),
        payment_code: record.payment_code().map(str::to_string),
        return_url: action_return_url(action),
    })
}
