//! Week epochs
//!
//! Epoch 1 is the week starting at 2025-01-01T00:00:00Z. Instants before the
//! reference date map to epoch 0.

use chrono::{DateTime, TimeZone, Utc};

use crate::constants::EPOCH_WINDOW_HOURS;
use crate::types::MintPosition;

/// Start of epoch 1
pub fn epoch_reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Epoch number at the given instant
pub fn epoch_at(now: DateTime<Utc>) -> u32 {
    let elapsed = now.signed_duration_since(epoch_reference());
    if elapsed < chrono::Duration::zero() {
        return 0;
    }
    let window_secs = EPOCH_WINDOW_HOURS * 3600;
    let weeks = elapsed.num_seconds() / window_secs;
    u32::try_from(weeks + 1).unwrap_or(u32::MAX)
}

/// Secondary lookup key for a token in a given epoch
pub fn epoch_key(token_id: &str, epoch: u32) -> String {
    format!("{}-{}", token_id, epoch)
}

/// Seed string whose content address is a token id
pub fn mint_seed(position: MintPosition) -> String {
    format!("{} {}", position.level, position.number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_epoch_at_reference() {
        assert_eq!(epoch_at(epoch_reference()), 1);
    }

    #[test]
    fn test_epoch_within_first_week() {
        let t = epoch_reference() + Duration::days(6) + Duration::hours(23);
        assert_eq!(epoch_at(t), 1);

        let t = epoch_reference() + Duration::days(7) - Duration::seconds(1);
        assert_eq!(epoch_at(t), 1);
    }

    #[test]
    fn test_epoch_rolls_over_after_seven_days() {
        assert_eq!(epoch_at(epoch_reference() + Duration::days(7)), 2);
        assert_eq!(epoch_at(epoch_reference() + Duration::days(28)), 5);
    }

    #[test]
    fn test_epoch_before_reference() {
        assert_eq!(epoch_at(epoch_reference() - Duration::seconds(1)), 0);
        assert_eq!(epoch_at(epoch_reference() - Duration::days(400)), 0);
    }

    #[test]
    fn test_epoch_key_format() {
        assert_eq!(epoch_key("QmToken", 12), "QmToken-12");
    }

    #[test]
    fn test_mint_seed_format() {
        assert_eq!(mint_seed(MintPosition::new(0, 1)), "0 1");
        assert_eq!(mint_seed(MintPosition::new(12, 3400)), "12 3400");
    }
}
