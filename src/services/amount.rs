//! Minor-unit → display conversions
//!
//! Amounts arrive as integers in the smallest unit of their currency
//! (cents, satoshis, micro-USDT) and are rendered with the asset's full
//! precision, trailing zeros included.

use rust_decimal::Decimal;
use serde::Serialize;

/// Fiat amounts are always cents
const FIAT_SCALE: u32 = 2;

/// On-chain assets the instruction panel knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CryptoAsset {
    Btc,
    Usdt,
}

impl CryptoAsset {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BTC" => Some(CryptoAsset::Btc),
            "USDT" => Some(CryptoAsset::Usdt),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CryptoAsset::Btc => "BTC",
            CryptoAsset::Usdt => "USDT",
        }
    }

    /// Decimal places of one whole unit (satoshi = 1e-8 BTC)
    pub fn scale(&self) -> u32 {
        match self {
            CryptoAsset::Btc => 8,
            CryptoAsset::Usdt => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CryptoAsset::Btc => "Bitcoin Payment",
            CryptoAsset::Usdt => "USDT (ETH ERC-20) Payment",
        }
    }
}

fn scaled(minor: u64, scale: u32) -> String {
    match i64::try_from(minor) {
        Ok(value) => Decimal::new(value, scale).to_string(),
        // Beyond i64 a Decimal is still exact; build it from the u64 directly.
        Err(_) => {
            let mut value = Decimal::from(minor);
            match value.set_scale(scale) {
                Ok(()) => value.to_string(),
                Err(_) => minor.to_string(),
            }
        }
    }
}

/// `150000000` BTC → `"1.50000000"`, `2500000` USDT → `"2.500000"`
pub fn format_crypto_amount(minor: u64, asset: CryptoAsset) -> String {
    scaled(minor, asset.scale())
}

/// `1999` → `"19.99"`
pub fn format_fiat_amount(minor: u64) -> String {
    scaled(minor, FIAT_SCALE)
}
