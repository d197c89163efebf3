use crate::error::{Result, RewardsError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

pub const ENV_PROCESSING_FEE_BPS: &str = "PUFFPASS_PROCESSING_FEE_BPS";
pub const ENV_NETWORK_FEE: &str = "PUFFPASS_NETWORK_FEE";
pub const ENV_ESCROW_DAYS: &str = "PUFFPASS_ESCROW_DAYS";
pub const ENV_MAX_TRANSACTION: &str = "PUFFPASS_MAX_TRANSACTION";
pub const ENV_CURRENCIES: &str = "PUFFPASS_CURRENCIES";

const DEFAULT_PROCESSING_FEE_BPS: u32 = 25;
const DEFAULT_NETWORK_FEE: Decimal = dec!(0.50);
const DEFAULT_ESCROW_DAYS: u32 = 7;
const DEFAULT_MAX_TRANSACTION: Decimal = dec!(1000000);
const DEFAULT_CURRENCIES: &str = "USDC,USDT,DAI";

/// Fee rates and payment limits, built once at startup and passed by reference
/// to every fee computation.
///
/// Every construction path, deserialization included, goes through
/// [`FeeConfig::new`], so a `FeeConfig` in hand always satisfies its limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeeConfig")]
pub struct FeeConfig {
    /// Processing fee in basis points (25 = 0.25%).
    processing_fee_rate_bps: u32,
    /// Flat network fee charged per payment regardless of amount.
    network_fee_flat: Decimal,
    default_escrow_days: u32,
    max_transaction_amount: Decimal,
    supported_currencies: BTreeSet<String>,
}

/// Unchecked wire shape of [`FeeConfig`].
#[derive(Deserialize)]
struct RawFeeConfig {
    processing_fee_rate_bps: u32,
    network_fee_flat: Decimal,
    default_escrow_days: u32,
    max_transaction_amount: Decimal,
    supported_currencies: Vec<String>,
}

impl TryFrom<RawFeeConfig> for FeeConfig {
    type Error = RewardsError;

    fn try_from(raw: RawFeeConfig) -> Result<Self> {
        Self::new(
            raw.processing_fee_rate_bps,
            raw.network_fee_flat,
            raw.default_escrow_days,
            raw.max_transaction_amount,
            raw.supported_currencies,
        )
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            processing_fee_rate_bps: DEFAULT_PROCESSING_FEE_BPS,
            network_fee_flat: DEFAULT_NETWORK_FEE,
            default_escrow_days: DEFAULT_ESCROW_DAYS,
            max_transaction_amount: DEFAULT_MAX_TRANSACTION,
            supported_currencies: parse_currencies(DEFAULT_CURRENCIES),
        }
    }
}

impl FeeConfig {
    pub fn new(
        processing_fee_rate_bps: u32,
        network_fee_flat: Decimal,
        default_escrow_days: u32,
        max_transaction_amount: Decimal,
        supported_currencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let config = Self {
            processing_fee_rate_bps,
            network_fee_flat,
            default_escrow_days,
            max_transaction_amount,
            supported_currencies: supported_currencies
                .into_iter()
                .map(|c| {
                    let c: String = c.into();
                    normalize_currency(&c)
                })
                .filter(|c| !c.is_empty())
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the process environment, reading a `.env`
    /// file first when one is present. Unset variables take their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FeeConfig::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let currencies = lookup(ENV_CURRENCIES).unwrap_or_else(|| DEFAULT_CURRENCIES.to_string());

        let config = Self::new(
            parse_var(&lookup, ENV_PROCESSING_FEE_BPS, DEFAULT_PROCESSING_FEE_BPS)?,
            parse_var(&lookup, ENV_NETWORK_FEE, DEFAULT_NETWORK_FEE)?,
            parse_var(&lookup, ENV_ESCROW_DAYS, DEFAULT_ESCROW_DAYS)?,
            parse_var(&lookup, ENV_MAX_TRANSACTION, DEFAULT_MAX_TRANSACTION)?,
            parse_currencies(&currencies),
        )?;

        tracing::info!(
            processing_fee_bps = config.processing_fee_rate_bps,
            network_fee = %config.network_fee_flat,
            escrow_days = config.default_escrow_days,
            currencies = ?config.supported_currencies,
            "Fee configuration loaded"
        );

        Ok(config)
    }

    pub fn processing_fee_rate_bps(&self) -> u32 {
        self.processing_fee_rate_bps
    }

    pub fn network_fee_flat(&self) -> Decimal {
        self.network_fee_flat
    }

    pub fn default_escrow_days(&self) -> u32 {
        self.default_escrow_days
    }

    pub fn max_transaction_amount(&self) -> Decimal {
        self.max_transaction_amount
    }

    pub fn supported_currencies(&self) -> &BTreeSet<String> {
        &self.supported_currencies
    }

    /// Currency codes compare trimmed and ASCII-uppercased.
    pub fn supports(&self, currency: &str) -> bool {
        self.supported_currencies.contains(&normalize_currency(currency))
    }

    fn validate(&self) -> Result<()> {
        if self.network_fee_flat < Decimal::ZERO {
            return Err(RewardsError::InvalidConfig(
                "Network fee must not be negative".to_string(),
            ));
        }
        if self.default_escrow_days == 0 {
            return Err(RewardsError::InvalidConfig(
                "Default escrow period must be at least one day".to_string(),
            ));
        }
        if self.max_transaction_amount <= Decimal::ZERO {
            return Err(RewardsError::InvalidConfig(
                "Maximum transaction amount must be positive".to_string(),
            ));
        }
        if self.supported_currencies.is_empty() {
            return Err(RewardsError::InvalidConfig(
                "At least one currency must be supported".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RewardsError::InvalidConfig(format!("Invalid {}: '{}'", key, raw))),
    }
}

fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn parse_currencies(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(normalize_currency)
        .filter(|c| !c.is_empty())
        .collect()
}
