use crate::error::{Result, RewardsError};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A loyalty level unlocked once a member's cumulative activity count reaches
/// `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDefinition {
    pub threshold: u64,
    pub name: String,
    /// Stable identifier of the tier; 0 means "no tier".
    pub token_id: u32,
    /// Perks in display order.
    pub benefits: Vec<String>,
    /// Fractional discount in `[0, 1]`.
    pub discount_rate: Decimal,
}

impl TierDefinition {
    pub fn new(
        threshold: u64,
        name: &str,
        token_id: u32,
        benefits: &[&str],
        discount_rate: Decimal,
    ) -> Self {
        Self {
            threshold,
            name: name.to_string(),
            token_id,
            benefits: benefits.iter().map(|b| b.to_string()).collect(),
            discount_rate,
        }
    }
}

/// Where a member stands: the tier they hold and how far they are from the
/// next one. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierProgress {
    pub current_tier: TierDefinition,
    pub current_count: u64,
    /// `None` once the top tier is reached.
    pub next_threshold: Option<u64>,
    /// Linear progress toward `next_threshold`, in `[0, 1]`.
    pub progress_fraction: Decimal,
}

impl TierProgress {
    /// Applies the tier discount to `price`, rounded half-up to the cent.
    pub fn discounted_price(&self, price: Decimal) -> Decimal {
        (price * (Decimal::ONE - self.current_tier.discount_rate))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Classifies activity counts against an ordered tier table.
///
/// The table always starts at threshold 0 and is strictly increasing, so every
/// non-negative count belongs to exactly one tier.
#[derive(Debug, Clone)]
pub struct TierEngine {
    tiers: Vec<TierDefinition>,
}

impl Default for TierEngine {
    fn default() -> Self {
        Self {
            tiers: puffpass_tiers(),
        }
    }
}

impl TierEngine {
    /// Builds an engine over a custom table, rejecting tables that are not
    /// total or not strictly ordered.
    pub fn new(tiers: Vec<TierDefinition>) -> Result<Self> {
        match tiers.first() {
            None => {
                return Err(RewardsError::InvalidTierTable(
                    "Tier table is empty".to_string(),
                ));
            }
            Some(first) if first.threshold != 0 => {
                return Err(RewardsError::InvalidTierTable(format!(
                    "Lowest tier '{}' must start at threshold 0",
                    first.name
                )));
            }
            Some(_) => {}
        }

        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold >= w[1].threshold) {
            return Err(RewardsError::InvalidTierTable(format!(
                "Threshold of '{}' must be greater than '{}'",
                pair[1].name, pair[0].name
            )));
        }

        if let Some(tier) = tiers
            .iter()
            .find(|t| t.discount_rate < Decimal::ZERO || t.discount_rate > Decimal::ONE)
        {
            return Err(RewardsError::InvalidTierTable(format!(
                "Discount rate of '{}' is outside [0, 1]",
                tier.name
            )));
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[TierDefinition] {
        &self.tiers
    }

    /// Parses a raw count as received from a caller (query string, JSON field).
    pub fn parse_count(raw: &str) -> Result<i64> {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| RewardsError::InvalidInput(format!("'{}' is not an integer count", raw)))
    }

    pub fn classify(&self, count: i64) -> Result<TierProgress> {
        let count = u64::try_from(count).map_err(|_| {
            RewardsError::InvalidInput(format!("Count must be non-negative, got {}", count))
        })?;

        // First threshold is 0, so at least one tier qualifies.
        let index = self.tiers.partition_point(|t| t.threshold <= count) - 1;
        let current = &self.tiers[index];
        let next_threshold = self.tiers.get(index + 1).map(|t| t.threshold);

        let progress_fraction = match next_threshold {
            None => Decimal::ONE,
            Some(next) => {
                let span = Decimal::from(next - current.threshold);
                let done = Decimal::from(count - current.threshold);
                (done / span).clamp(Decimal::ZERO, Decimal::ONE)
            }
        };

        tracing::debug!(
            count,
            tier = %current.name,
            ?next_threshold,
            %progress_fraction,
            "Classified activity count"
        );

        Ok(TierProgress {
            current_tier: current.clone(),
            current_count: count,
            next_threshold,
            progress_fraction,
        })
    }

    pub fn benefits_for(&self, tier_name: &str) -> Result<&[String]> {
        self.tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(tier_name.trim()))
            .map(|t| t.benefits.as_slice())
            .ok_or_else(|| RewardsError::UnknownTier(tier_name.to_string()))
    }

    pub fn tier_by_token_id(&self, token_id: u32) -> Result<&TierDefinition> {
        self.tiers
            .iter()
            .find(|t| t.token_id == token_id)
            .ok_or_else(|| RewardsError::UnknownTier(format!("token id {}", token_id)))
    }
}

fn puffpass_tiers() -> Vec<TierDefinition> {
    vec![
        TierDefinition::new(0, "None", 0, &[], dec!(0)),
        TierDefinition::new(
            3,
            "Green",
            1,
            &["5% off every purchase", "Member-only product drops"],
            dec!(0.05),
        ),
        TierDefinition::new(
            10,
            "Gold",
            2,
            &[
                "10% off every purchase",
                "Member-only product drops",
                "Priority order pickup",
            ],
            dec!(0.10),
        ),
        TierDefinition::new(
            25,
            "Black",
            3,
            &[
                "15% off every purchase",
                "Member-only product drops",
                "Priority order pickup",
                "Exclusive event invitations",
            ],
            dec!(0.15),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_zero_is_no_tier() {
        let progress = TierEngine::default().classify(0).unwrap();
        assert_eq!(progress.current_tier.name, "None");
        assert_eq!(progress.current_tier.token_id, 0);
        assert_eq!(progress.next_threshold, Some(3));
        assert_eq!(progress.progress_fraction, Decimal::ZERO);
    }

    #[test]
    fn test_classify_exact_threshold_enters_tier() {
        let engine = TierEngine::default();

        let progress = engine.classify(3).unwrap();
        assert_eq!(progress.current_tier.name, "Green");
        assert_eq!(progress.current_tier.token_id, 1);
        assert_eq!(progress.next_threshold, Some(10));
        assert_eq!(progress.progress_fraction, Decimal::ZERO);

        let below = engine.classify(2).unwrap();
        assert_eq!(below.current_tier.name, "None");
    }

    #[test]
    fn test_classify_just_below_black() {
        let progress = TierEngine::default().classify(24).unwrap();
        assert_eq!(progress.current_tier.name, "Gold");
        assert_eq!(progress.next_threshold, Some(25));
        assert_eq!(progress.progress_fraction, dec!(14) / dec!(15));
    }

    #[test]
    fn test_classify_max_tier() {
        let engine = TierEngine::default();
        for count in [25, 26, 1_000_000] {
            let progress = engine.classify(count).unwrap();
            assert_eq!(progress.current_tier.name, "Black");
            assert_eq!(progress.next_threshold, None);
            assert_eq!(progress.progress_fraction, Decimal::ONE);
        }
    }

    #[test]
    fn test_classify_negative_count() {
        let result = TierEngine::default().classify(-1);
        assert!(matches!(result, Err(RewardsError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(TierEngine::parse_count(" 12 ").unwrap(), 12);
        assert!(matches!(
            TierEngine::parse_count("2.5"),
            Err(RewardsError::InvalidInput(_))
        ));
        assert!(matches!(
            TierEngine::parse_count("ten"),
            Err(RewardsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_benefits_lookup() {
        let engine = TierEngine::default();
        let gold = engine.benefits_for("Gold").unwrap();
        assert_eq!(gold.len(), 3);
        assert_eq!(gold[0], "10% off every purchase");
        assert_eq!(engine.benefits_for("black").unwrap().len(), 4);
        assert!(engine.benefits_for("None").unwrap().is_empty());
        assert!(matches!(
            engine.benefits_for("Platinum"),
            Err(RewardsError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_tier_by_token_id() {
        let engine = TierEngine::default();
        assert_eq!(engine.tier_by_token_id(2).unwrap().name, "Gold");
        assert!(matches!(
            engine.tier_by_token_id(9),
            Err(RewardsError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_discounted_price() {
        let engine = TierEngine::default();
        let gold = engine.classify(10).unwrap();
        assert_eq!(gold.discounted_price(dec!(49.95)), dec!(44.96));
        let none = engine.classify(0).unwrap();
        assert_eq!(none.discounted_price(dec!(49.95)), dec!(49.95));
    }

    #[test]
    fn test_custom_table_validation() {
        assert!(matches!(
            TierEngine::new(vec![]),
            Err(RewardsError::InvalidTierTable(_))
        ));
        assert!(matches!(
            TierEngine::new(vec![TierDefinition::new(1, "Starter", 1, &[], dec!(0))]),
            Err(RewardsError::InvalidTierTable(_))
        ));
        assert!(matches!(
            TierEngine::new(vec![
                TierDefinition::new(0, "A", 0, &[], dec!(0)),
                TierDefinition::new(5, "B", 1, &[], dec!(0.1)),
                TierDefinition::new(5, "C", 2, &[], dec!(0.2)),
            ]),
            Err(RewardsError::InvalidTierTable(_))
        ));
        assert!(matches!(
            TierEngine::new(vec![TierDefinition::new(0, "A", 0, &[], dec!(1.5))]),
            Err(RewardsError::InvalidTierTable(_))
        ));

        let single = TierEngine::new(vec![TierDefinition::new(0, "Only", 0, &[], dec!(0))])
            .unwrap();
        let progress = single.classify(7).unwrap();
        assert_eq!(progress.next_threshold, None);
        assert_eq!(progress.progress_fraction, Decimal::ONE);
    }
}
