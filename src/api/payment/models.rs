use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Response envelope shared by every backend endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Server-reported payment status code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Cancelled,
    /// Any code the backend adds later; treated like `Pending`
    Other(i64),
}

impl PaymentStatus {
    pub fn code(&self) -> i64 {
        match self {
            PaymentStatus::Pending => 10,
            PaymentStatus::Success => 20,
            PaymentStatus::Failed => 30,
            PaymentStatus::Cancelled => 40,
            PaymentStatus::Other(code) => *code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Success | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Other(_) => "unknown",
        }
    }
}

impl From<i64> for PaymentStatus {
    fn from(code: i64) -> Self {
        match code {
            10 => PaymentStatus::Pending,
            20 => PaymentStatus::Success,
            30 => PaymentStatus::Failed,
            40 => PaymentStatus::Cancelled,
            other => PaymentStatus::Other(other),
        }
    }
}

impl From<PaymentStatus> for i64 {
    fn from(status: PaymentStatus) -> Self {
        status.code()
    }
}

/// `data` of `GET /system/payment/detail`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    #[serde(default, deserialize_with = "lenient_int")]
    pub payment_status: Option<i64>,
    #[serde(default)]
    pub payment: Option<PaymentRecord>,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

impl PaymentDetail {
    /// Top-level redirect target after success, if any
    pub fn return_url(&self) -> Option<&str> {
        non_empty(self.return_url.as_deref())
    }

    /// Top-level "return to merchant" target, if any
    pub fn cancel_url(&self) -> Option<&str> {
        non_empty(self.cancel_url.as_deref())
    }
}

/// Authoritative snapshot of one payment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: PaymentStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub payment_code: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub crypto_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub crypto_amount: Option<i64>,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    /// Gateway-specific bag; resolved into `ActionData` by the extractor
    #[serde(default)]
    pub action: Option<Map<String, Value>>,
}

impl PaymentRecord {
    pub fn last_error(&self) -> Option<&str> {
        non_empty(self.last_error.as_deref())
    }

    pub fn payment_code(&self) -> Option<&str> {
        non_empty(self.payment_code.as_deref())
    }

    pub fn invoice_id(&self) -> &str {
        self.invoice_id.as_deref().unwrap_or_default()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Integer field that tolerates `null`, floats and numeric strings;
/// anything else decodes as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    };
    Ok(number)
}

/// `null` or a malformed status reads as `Pending`, so polling continues
fn lenient_status<'de, D>(deserializer: D) -> Result<PaymentStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_int(deserializer)?.map(PaymentStatus::from).unwrap_or_default())
}
