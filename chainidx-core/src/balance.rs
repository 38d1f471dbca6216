use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// Per-address coin balance, split into the locked and unlocked portions.
///
/// An address with no stored record is semantically `{0, 0}`; [`Default`]
/// provides exactly that value so the codec never needs a separate "absent"
/// representation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub locked: Currency,
    pub unlocked: Currency,
}

impl Balance {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Currency {
        self.locked.checked_add(&self.unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_zero() {
        let b = Balance::default();
        assert!(b.locked.is_zero());
        assert!(b.unlocked.is_zero());
    }

    #[test]
    fn missing_record_decodes_to_default() {
        let b: Balance = serde_json::from_str("{}").unwrap();
        assert_eq!(b, Balance::zero());
    }

    #[test]
    fn total_sums_both_portions() {
        let b = Balance {
            locked: Currency::from_u64(3),
            unlocked: Currency::from_u64(4),
        };
        assert_eq!(b.total(), Currency::from_u64(7));
    }
}
