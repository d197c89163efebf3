use crate::config::FeeConfig;
use crate::error::{Result, RewardsError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Basis points in one whole.
const BPS_DENOMINATOR: u32 = 10_000;
/// Minor-unit precision for the fiat-pegged currencies handled here.
const MINOR_UNIT_DP: u32 = 2;

/// A payment as submitted by a caller, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payer_address: String,
    pub payee_address: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub escrow: bool,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub escrow_days: Option<i64>,
}

/// Fees owed on a payment plus, for escrow payments, when the funds unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub processing_fee: Decimal,
    pub network_fee: Decimal,
    pub total_fees: Decimal,
    pub escrow_release_timestamp: Option<DateTime<Utc>>,
}

/// Checks that a string is `0x` followed by exactly 40 hex digits.
///
/// Only the format is checked; nothing here proves the caller controls the
/// address.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn validate(request: &PaymentRequest, config: &FeeConfig) -> Result<()> {
    for address in [&request.payer_address, &request.payee_address] {
        if !is_valid_address(address) {
            return Err(RewardsError::InvalidAddress(address.clone()));
        }
    }

    if request.amount <= Decimal::ZERO || request.amount > config.max_transaction_amount() {
        return Err(RewardsError::InvalidAmount(request.amount));
    }

    if !config.supports(&request.currency) {
        return Err(RewardsError::UnsupportedCurrency(request.currency.clone()));
    }

    if request.escrow
        && let Some(days) = request.escrow_days
        && days <= 0
    {
        return Err(RewardsError::InvalidEscrowPeriod(days));
    }

    Ok(())
}

/// Computes the fees for `request`.
///
/// `now` anchors the escrow release time and must come from the caller. A fee
/// total that meets or exceeds the amount is returned as-is; whether such a
/// payment is acceptable is decided upstream.
pub fn compute_fees(
    request: &PaymentRequest,
    config: &FeeConfig,
    now: DateTime<Utc>,
) -> Result<FeeBreakdown> {
    validate(request, config)?;

    let overflow = || RewardsError::InvalidAmount(request.amount);

    let mut processing_fee = request
        .amount
        .checked_mul(Decimal::from(config.processing_fee_rate_bps()))
        .and_then(|scaled| scaled.checked_div(Decimal::from(BPS_DENOMINATOR)))
        .ok_or_else(overflow)?
        .round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero);
    // Always carry exactly two decimals so "2.5" renders as "2.50".
    processing_fee.rescale(MINOR_UNIT_DP);
    let network_fee = config.network_fee_flat();
    let total_fees = processing_fee.checked_add(network_fee).ok_or_else(overflow)?;

    let escrow_release_timestamp = if request.escrow {
        let days = request
            .escrow_days
            .unwrap_or(i64::from(config.default_escrow_days()));
        let release_at = Duration::try_days(days)
            .and_then(|period| now.checked_add_signed(period))
            .ok_or(RewardsError::InvalidEscrowPeriod(days))?;
        Some(release_at)
    } else {
        None
    };

    tracing::debug!(
        amount = %request.amount,
        currency = %request.currency,
        %processing_fee,
        %total_fees,
        escrow = request.escrow,
        "Computed payment fees"
    );

    Ok(FeeBreakdown {
        processing_fee,
        network_fee,
        total_fees,
        escrow_release_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const PAYER: &str = "0x1111111111111111111111111111111111111111";
    const PAYEE: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";

    fn config() -> FeeConfig {
        FeeConfig::new(25, dec!(0.50), 7, dec!(1000000), ["USDC", "USDT"]).unwrap()
    }

    fn request(amount: Decimal, currency: &str) -> PaymentRequest {
        PaymentRequest {
            payer_address: PAYER.to_string(),
            payee_address: PAYEE.to_string(),
            amount,
            currency: currency.to_string(),
            escrow: false,
            escrow_days: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 16, 20, 0).unwrap()
    }

    #[test]
    fn test_address_format() {
        assert!(is_valid_address(PAYER));
        assert!(is_valid_address(PAYEE));
        assert!(!is_valid_address("1111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x11111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x111111111111111111111111111111111111111g"));
        assert!(!is_valid_address("0X1111111111111111111111111111111111111111"));
    }

    #[test]
    fn test_fees_without_escrow() {
        let fees = compute_fees(&request(dec!(1000), "USDC"), &config(), now()).unwrap();
        assert_eq!(fees.processing_fee, dec!(2.50));
        assert_eq!(fees.network_fee, dec!(0.50));
        assert_eq!(fees.total_fees, dec!(3.00));
        assert_eq!(fees.escrow_release_timestamp, None);
    }

    #[test]
    fn test_fees_with_escrow() {
        let mut req = request(dec!(2000), "USDT");
        req.escrow = true;
        req.escrow_days = Some(6);

        let fees = compute_fees(&req, &config(), now()).unwrap();
        assert_eq!(fees.processing_fee, dec!(5.00));
        assert_eq!(fees.escrow_release_timestamp, Some(now() + Duration::days(6)));
    }

    #[test]
    fn test_escrow_defaults_to_configured_period() {
        let mut req = request(dec!(100), "USDC");
        req.escrow = true;

        let fees = compute_fees(&req, &config(), now()).unwrap();
        assert_eq!(fees.escrow_release_timestamp.unwrap() - now(), Duration::days(7));
    }

    #[test]
    fn test_processing_fee_rounds_half_up() {
        // 2.02 * 0.0025 = 0.00505 -> 0.01
        let fees = compute_fees(&request(dec!(2.02), "USDC"), &config(), now()).unwrap();
        assert_eq!(fees.processing_fee, dec!(0.01));
        // 1.99 * 0.0025 = 0.004975 -> 0.00
        let fees = compute_fees(&request(dec!(1.99), "USDC"), &config(), now()).unwrap();
        assert_eq!(fees.processing_fee, dec!(0.00));
    }

    #[test]
    fn test_amount_at_decimal_limit_is_rejected_not_panicking() {
        let config = FeeConfig::new(25, dec!(0.5), 7, Decimal::MAX, ["USDC"]).unwrap();
        let req = request(Decimal::MAX, "USDC");
        assert!(validate(&req, &config).is_ok());
        assert!(matches!(
            compute_fees(&req, &config, now()),
            Err(RewardsError::InvalidAmount(amount)) if amount == Decimal::MAX
        ));
    }

    #[test]
    fn test_large_amount_within_range() {
        let config = FeeConfig::new(25, dec!(0.5), 7, Decimal::MAX, ["USDC"]).unwrap();
        let amount = dec!(1000000000000000000000);
        let fees = compute_fees(&request(amount, "USDC"), &config, now()).unwrap();
        assert_eq!(fees.processing_fee, dec!(2500000000000000000));
        assert_eq!(fees.total_fees, dec!(2500000000000000000.50));
    }

    #[test]
    fn test_currency_matching_ignores_case_and_padding() {
        assert!(validate(&request(dec!(10), "usdc"), &config()).is_ok());
        assert!(validate(&request(dec!(10), " USDT "), &config()).is_ok());
        assert!(matches!(
            validate(&request(dec!(10), "usd"), &config()),
            Err(RewardsError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_fees_may_exceed_amount() {
        let fees = compute_fees(&request(dec!(0.10), "USDC"), &config(), now()).unwrap();
        assert_eq!(fees.total_fees, dec!(0.50));
        assert!(fees.total_fees >= dec!(0.10));
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        let mut req = request(dec!(10), "USDC");
        req.payee_address = format!("{}1", PAYEE);
        assert!(matches!(
            validate(&req, &config()),
            Err(RewardsError::InvalidAddress(_))
        ));

        let mut req = request(dec!(10), "USDC");
        req.payer_address = "not-an-address".to_string();
        assert!(matches!(
            validate(&req, &config()),
            Err(RewardsError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_amounts() {
        for amount in [dec!(0), dec!(-5), dec!(1000000.01)] {
            assert!(matches!(
                validate(&request(amount, "USDC"), &config()),
                Err(RewardsError::InvalidAmount(_))
            ));
        }
        assert!(validate(&request(dec!(1000000), "USDC"), &config()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unsupported_currency() {
        assert!(matches!(
            validate(&request(dec!(10), "EUR"), &config()),
            Err(RewardsError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_validate_escrow_period() {
        let mut req = request(dec!(10), "USDC");
        req.escrow = true;
        req.escrow_days = Some(0);
        assert!(matches!(
            validate(&req, &config()),
            Err(RewardsError::InvalidEscrowPeriod(0))
        ));

        // Period is irrelevant without escrow
        req.escrow = false;
        assert!(validate(&req, &config()).is_ok());
    }

    #[test]
    fn test_compute_propagates_validation_error() {
        let result = compute_fees(&request(dec!(10), "EUR"), &config(), now());
        assert!(matches!(result, Err(RewardsError::UnsupportedCurrency(c)) if c == "EUR"));
    }

    #[test]
    fn test_request_deserialization_defaults() {
        let json = format!(
            r#"{{"payer_address":"{}","payee_address":"{}","amount":"12.5","currency":"USDC"}}"#,
            PAYER, PAYEE
        );
        let req: PaymentRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.amount, dec!(12.5));
        assert!(!req.escrow);
        assert_eq!(req.escrow_days, None);
    }
}
