//! Gateway presentation adapters

pub mod button;
pub mod card;
pub mod onchain;
pub mod script;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{CheckoutError, ExtractError};
use crate::services::action_data::{ActionData, GatewayKind};

use self::button::ButtonFlow;
use self::onchain::OnChainPanel;

/// Who tells the page that the payment is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    /// The gateway's own widget (redirect or callback)
    External,
    /// Status polling against the payment service
    Polling,
}

/// What an adapter put on the page
#[derive(Debug)]
pub enum Presentation {
    HostedCheckout,
    Buttons(ButtonFlow),
    Instructions(Box<OnChainPanel>),
}

#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn kind(&self) -> GatewayKind;

    fn confirmation(&self) -> ConfirmationSource;

    async fn present(&self, action: &ActionData) -> Result<Presentation, CheckoutError>;
}

/// Action data for another gateway reached this adapter
pub(crate) fn mismatched_action(expected: GatewayKind) -> CheckoutError {
    let field = match expected {
        GatewayKind::Card => "stripeClientSecret",
        GatewayKind::Button => "paypalOrderID",
        GatewayKind::OnChain => "blockonomicsAddress",
    };
    ExtractError::MissingRequiredField(field).into()
}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<GatewayKind, Box<dyn GatewayAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Box<dyn GatewayAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn with(mut self, adapter: Box<dyn GatewayAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: GatewayKind) -> Option<&dyn GatewayAdapter> {
        self.adapters.get(&kind).map(|a| a.as_ref())
    }
}
