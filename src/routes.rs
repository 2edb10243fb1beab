//! Page URL → view + parameters

use reqwest::Url;
use serde::Serialize;

use crate::api::payment::{mount_prefix, MOUNT_SEGMENT};
use crate::error::InputError;
use crate::services::action_data::GatewayKind;

/// Value of the `env` parameter that selects production timing
pub const PRODUCTION_ENV: &str = "prod";

/// Checkout views mounted under `/embedded/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Gateway(GatewayKind),
    StatusChecker,
}

impl Route {
    /// Resolve a page path (with or without a mount prefix)
    pub fn from_path(pathname: &str) -> Result<Self, InputError> {
        let relative = match mount_prefix(pathname) {
            Some(prefix) => &pathname[prefix.len()..],
            None => pathname,
        };
        let view = relative
            .strip_prefix(MOUNT_SEGMENT)
            .map(|rest| rest.trim_end_matches('/'))
            .ok_or_else(|| InputError::UnknownRoute(pathname.to_string()))?;

        match view {
            "stripe" => Ok(Route::Gateway(GatewayKind::Card)),
            "paypal" => Ok(Route::Gateway(GatewayKind::Button)),
            "blockonomics" => Ok(Route::Gateway(GatewayKind::OnChain)),
            "payment_checker" => Ok(Route::StatusChecker),
            _ => Err(InputError::UnknownRoute(pathname.to_string())),
        }
    }

    /// Browser tab title of the view
    pub fn title(&self) -> &'static str {
        match self {
            Route::Gateway(GatewayKind::Card) => "Stripe Payment - Payment Checkout",
            Route::Gateway(GatewayKind::Button) => "PayPal Payment - Payment Checkout",
            Route::Gateway(GatewayKind::OnChain) => "Blockonomics Payment - Payment Checkout",
            Route::StatusChecker => "Payment Status Checker - Payment Checkout",
        }
    }
}

/// Hosting context selected by `env`; only affects redirect timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PageEnv {
    Production,
    Other(String),
}

impl PageEnv {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some(PRODUCTION_ENV) => PageEnv::Production,
            Some(other) => PageEnv::Other(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, PageEnv::Production)
    }
}

/// Query parameters every checkout view reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub payment_id: String,
    pub env: PageEnv,
}

impl PageParams {
    pub fn from_url(url: &Url) -> Result<Self, InputError> {
        let mut payment_id = None;
        let mut env = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "paymentId" if payment_id.is_none() => payment_id = Some(value.into_owned()),
                "env" if env.is_none() => env = Some(value.into_owned()),
                _ => {}
            }
        }

        let payment_id = payment_id
            .filter(|id| !id.is_empty())
            .ok_or(InputError::MissingPaymentId)?;

        Ok(Self {
            payment_id,
            env: PageEnv::from_param(env.as_deref().filter(|e| !e.is_empty())),
        })
    }
}

/// Route and params of a page, parsed once on mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: Url,
    pub route: Route,
    pub params: PageParams,
}

impl PageRequest {
    pub fn parse(page_url: &str) -> Result<Self, InputError> {
        let url = Url::parse(page_url).map_err(|e| InputError::InvalidPageUrl(e.to_string()))?;
        let route = Route::from_path(url.path())?;
        let params = PageParams::from_url(&url)?;
        Ok(Self { url, route, params })
    }
}
