//! Organizations and pricing tiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pricing tier. Drives the platform fee rate and the wallet cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

string_enum!(Tier {
    Free => "free",
    Pro => "pro",
    Enterprise => "enterprise",
});

impl Tier {
    /// Maximum number of active wallets, or `None` for unlimited.
    pub fn wallet_cap(&self) -> Option<u32> {
        match self {
            Tier::Free => Some(5),
            Tier::Pro => Some(50),
            Tier::Enterprise => None,
        }
    }
}

/// The tenant that owns wallets, policies and every record derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub tier: Tier,
}

impl Organization {
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!("pro".parse::<Tier>().unwrap(), Tier::Pro);
        let err = "platinum".parse::<Tier>().unwrap_err();
        assert_eq!(err.kind, "Tier");
    }

    #[test]
    fn test_wallet_caps() {
        assert_eq!(Tier::Free.wallet_cap(), Some(5));
        assert_eq!(Tier::Enterprise.wallet_cap(), None);
    }
}
