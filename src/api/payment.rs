//! Payment detail endpoint client
//!
//! Wraps `GET {prefix}/system/payment/detail?paymentId=<id>` and folds every
//! failure (HTTP status, envelope code, missing payload) into `FetchError`.

pub mod models;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::{Duration, Instant};
use tracing::{debug, warn, Instrument};

use crate::error::{FetchError, InputError};
use models::{Envelope, PaymentDetail};

/// Path segment the checkout views are mounted under
pub const MOUNT_SEGMENT: &str = "/embedded/";

const DETAIL_PATH: &str = "system/payment/detail";

/// Requests slower than this are logged at WARN
const SLOW_REQUEST_MS: u128 = 2_000;

/// Anything that can produce the authoritative payment detail.
#[async_trait]
pub trait PaymentDetailSource: Send + Sync {
    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetail, FetchError>;
}

/// Path prefix the app is mounted under, e.g. `/shop` for
/// `/shop/embedded/stripe`. `None` when the mount segment is missing or
/// sits at the very start of the path.
pub fn mount_prefix(pathname: &str) -> Option<&str> {
    match pathname.find(MOUNT_SEGMENT) {
        Some(index) if index > 0 => Some(&pathname[..index]),
        _ => None,
    }
}

/// Resolve the API root for a page. The mount prefix wins; otherwise the
/// configured base (relative or absolute) is used, falling back to the
/// page origin. The result always ends with `/`.
pub fn api_root(page: &Url, configured_base: &str) -> Result<Url, InputError> {
    let base = match mount_prefix(page.path()) {
        Some(prefix) => prefix,
        None if !configured_base.is_empty() => configured_base,
        None => "/",
    };

    let mut root = page
        .join(base)
        .map_err(|e| InputError::InvalidPageUrl(e.to_string()))?;
    root.set_query(None);
    root.set_fragment(None);
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root)
}

/// HTTP implementation of [`PaymentDetailSource`]
#[derive(Clone)]
pub struct PaymentDetailClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl PaymentDetailClient {
    pub fn new(api_root: &Url, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint = api_root
            .join(DETAIL_PATH)
            .map_err(|e| FetchError::Network(format!("invalid api root: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn detail_url(&self, payment_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("paymentId", payment_id);
        url
    }

    async fn request(&self, payment_id: &str) -> Result<PaymentDetail, FetchError> {
        let response = self
            .http
            .get(self.detail_url(payment_id))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let envelope: Envelope<PaymentDetail> = response.json().await?;
        if envelope.code != 0 {
            return Err(FetchError::Server {
                code: envelope.code,
                message: envelope.message,
            });
        }

        match envelope.data {
            Some(detail) if detail.payment.is_some() => Ok(detail),
            _ => Err(FetchError::NotFound),
        }
    }
}

#[async_trait]
impl PaymentDetailSource for PaymentDetailClient {
    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetail, FetchError> {
        let span = tracing::debug_span!("payment_detail", payment_id = %payment_id);
        let start = Instant::now();

        let result = self.request(payment_id).instrument(span).await;

        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(detail) => debug!(
                payment_id = %payment_id,
                duration_ms = duration_ms as u64,
                status = ?detail.payment.as_ref().map(|p| p.status),
                "Payment detail fetched"
            ),
            Err(e) => warn!(
                payment_id = %payment_id,
                duration_ms = duration_ms as u64,
                error = %e,
                "Payment detail request failed"
            ),
        }
        if duration_ms > SLOW_REQUEST_MS {
            warn!(
                payment_id = %payment_id,
                duration_ms = duration_ms as u64,
                "Slow payment detail request"
            );
        }

        result
    }
}
