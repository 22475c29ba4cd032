//! Platform fee calculation.
//!
//! The fee is a tier-dependent share of the transfer amount with a floor:
//! `max(amount * bps / 10000, minimum)`. Transfers at or below the minimum
//! pay nothing, so dust transfers are never eaten by the floor.

use agentwallet_types::constants::{BPS_DENOMINATOR, DEFAULT_MIN_FEE_LAMPORTS};
use agentwallet_types::{Amount, Tier};
use serde::{Deserialize, Serialize};

use crate::error::{EconError, EconResult};

/// Fee rates per tier plus the fee floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub free_bps: u16,
    pub pro_bps: u16,
    pub enterprise_bps: u16,
    pub minimum: Amount,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            free_bps: 50,
            pro_bps: 25,
            enterprise_bps: 10,
            minimum: DEFAULT_MIN_FEE_LAMPORTS,
        }
    }
}

impl FeeSchedule {
    /// Rate for `tier` in basis points.
    pub fn bps(&self, tier: Tier) -> u16 {
        match tier {
            Tier::Free => self.free_bps,
            Tier::Pro => self.pro_bps,
            Tier::Enterprise => self.enterprise_bps,
        }
    }

    /// Rate for a tier given by name. Unknown names pay the free rate.
    pub fn bps_for_name(&self, tier: &str) -> u16 {
        tier.parse::<Tier>()
            .map(|t| self.bps(t))
            .unwrap_or(self.free_bps)
    }

    /// Platform fee for transferring `amount` on `tier`.
    ///
    /// # Example
    /// ```
    /// use agentwallet_econ::FeeSchedule;
    /// use agentwallet_types::Tier;
    ///
    /// let fees = FeeSchedule::default();
    /// assert_eq!(fees.fee(1_000_000_000, Tier::Free), 5_000_000);
    /// assert_eq!(fees.fee(100_000, Tier::Enterprise), 1_000);
    /// assert_eq!(fees.fee(1_000, Tier::Free), 0);
    /// ```
    pub fn fee(&self, amount: Amount, tier: Tier) -> Amount {
        fee_at_rate(amount, self.bps(tier), self.minimum)
    }

    /// Platform fee for a tier given by name.
    pub fn fee_for_name(&self, amount: Amount, tier: &str) -> Amount {
        fee_at_rate(amount, self.bps_for_name(tier), self.minimum)
    }

    /// Reject rates above 100%.
    pub fn validate(&self) -> EconResult<()> {
        for (tier, bps) in [
            ("free", self.free_bps),
            ("pro", self.pro_bps),
            ("enterprise", self.enterprise_bps),
        ] {
            if u64::from(bps) > BPS_DENOMINATOR {
                return Err(EconError::RateTooHigh { tier, bps });
            }
        }
        Ok(())
    }
}

/// Fee at an explicit rate. Computed in u128 so large amounts cannot
/// overflow.
pub fn fee_at_rate(amount: Amount, bps: u16, minimum: Amount) -> Amount {
    if amount <= minimum {
        return 0;
    }
    let proportional = (amount as u128 * bps as u128) / BPS_DENOMINATOR as u128;
    // Rates above 100% can exceed u64
    let proportional = Amount::try_from(proportional).unwrap_or(Amount::MAX);
    proportional.max(minimum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_rates() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.fee(10_000_000, Tier::Free), 50_000);
        assert_eq!(fees.fee(10_000_000, Tier::Pro), 25_000);
        assert_eq!(fees.fee(10_000_000, Tier::Enterprise), 10_000);
    }

    #[test]
    fn test_minimum_boundary() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.fee(500, Tier::Free), 0);
        assert_eq!(fees.fee(1_000_000, Tier::Free), 5_000);
        assert_eq!(fees.fee(999, Tier::Free), 0);
        assert_eq!(fees.fee(1_000, Tier::Free), 0);
        // Proportional fee rounds to 5; the floor applies
        assert_eq!(fees.fee(1_001, Tier::Free), 1_000);
        assert_eq!(fees.fee(0, Tier::Pro), 0);
    }

    #[test]
    fn test_floor_until_proportional_catches_up() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.fee(199_999, Tier::Free), 1_000);
        assert_eq!(fees.fee(200_000, Tier::Free), 1_000);
        assert_eq!(fees.fee(400_000, Tier::Free), 2_000);
    }

    #[test]
    fn test_no_overflow() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.fee(u64::MAX, Tier::Free), u64::MAX / 10_000 * 50 + (u64::MAX % 10_000) * 50 / 10_000);
        assert_eq!(fee_at_rate(u64::MAX, u16::MAX, 0), u64::MAX);
    }

    #[test]
    fn test_unknown_tier_name_uses_free_rate() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.bps_for_name("platinum"), 50);
        assert_eq!(fees.bps_for_name("pro"), 25);
        assert_eq!(fees.fee_for_name(10_000_000, "platinum"), 50_000);
    }

    #[test]
    fn test_custom_schedule() {
        let fees = FeeSchedule {
            pro_bps: 100,
            minimum: 0,
            ..FeeSchedule::default()
        };
        assert_eq!(fees.fee(1_000, Tier::Pro), 10);
        assert_eq!(fees.fee(50, Tier::Pro), 0);
    }

    #[test]
    fn test_validate() {
        assert!(FeeSchedule::default().validate().is_ok());
        let bad = FeeSchedule {
            enterprise_bps: 10_001,
            ..FeeSchedule::default()
        };
        assert_eq!(
            bad.validate(),
            Err(EconError::RateTooHigh {
                tier: "enterprise",
                bps: 10_001
            })
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let fees: FeeSchedule = toml::from_str("pro_bps = 20").unwrap();
        assert_eq!(fees.pro_bps, 20);
        assert_eq!(fees.free_bps, 50);
        assert_eq!(fees.minimum, 1_000);
    }
}
