//! Page-wide SDK script tags
//!
//! One tag per provider. A (re)load always removes the previous tag
//! before inserting the new one, and loads for the same provider are
//! serialized.

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::SdkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkProvider {
    Stripe,
    PayPal,
    Web3Wallet,
}

impl SdkProvider {
    pub const ALL: [SdkProvider; 3] = [SdkProvider::Stripe, SdkProvider::PayPal, SdkProvider::Web3Wallet];

    /// DOM id of the injected tag
    pub fn script_id(&self) -> &'static str {
        match self {
            SdkProvider::Stripe => "stripe-sdk",
            SdkProvider::PayPal => "paypal-sdk",
            SdkProvider::Web3Wallet => "web3-payment-sdk",
        }
    }

    fn slot(&self) -> usize {
        match self {
            SdkProvider::Stripe => 0,
            SdkProvider::PayPal => 1,
            SdkProvider::Web3Wallet => 2,
        }
    }
}

/// Document the scripts are injected into
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Remove the tag with `id`; returns whether one existed
    fn remove_script(&self, id: &str) -> bool;

    /// Insert a tag and resolve once it has loaded (or failed to)
    async fn insert_script(&self, id: &str, src: &Url) -> Result<(), SdkError>;
}

pub struct ScriptRegistry {
    host: Arc<dyn ScriptHost>,
    slots: [Mutex<Option<Url>>; 3],
}

impl ScriptRegistry {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            slots: [Mutex::new(None), Mutex::new(None), Mutex::new(None)],
        }
    }

    /// Replace the provider's script with `src` and wait for it to load
    pub async fn load(&self, provider: SdkProvider, src: &Url) -> Result<(), SdkError> {
        let mut current = self.slots[provider.slot()].lock().await;

        if self.host.remove_script(provider.script_id()) {
            debug!(
                provider = ?provider,
                previous = current.as_ref().map(|u| u.as_str()).unwrap_or("unknown"),
                "Removed existing SDK script"
            );
        }
        *current = None;

        match self.host.insert_script(provider.script_id(), src).await {
            Ok(()) => {
                info!(provider = ?provider, src = %script_origin(src), "SDK script loaded");
                *current = Some(src.clone());
                Ok(())
            }
            Err(e) => {
                error!(provider = ?provider, src = %script_origin(src), error = %e, "SDK script failed to load");
                Err(e)
            }
        }
    }

    /// Source of the script currently loaded for `provider`
    pub async fn loaded(&self, provider: SdkProvider) -> Option<Url> {
        self.slots[provider.slot()].lock().await.clone()
    }
}

/// Script URL without its query, which can carry client ids
fn script_origin(src: &Url) -> String {
    let mut bare = src.clone();
    bare.set_query(None);
    bare.to_string()
}
