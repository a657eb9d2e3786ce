use chrono::{FixedOffset, NaiveDateTime, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::timestamp::Timestamp;
use crate::week::WeekMode;
use crate::LedgerResult;

/// Widest offset accepted, in minutes either side of UTC.
const MAX_OFFSET_MINUTES: u32 = 18 * 60;
/// Memo lifetime for per-loan figures.
pub const DEFAULT_CACHE_TTL_SECONDS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Offset of the ledger's wall clock from UTC. Weeks start at local
    /// Monday midnight in this zone.
    pub utc_offset_minutes: i32,
    /// Week mode used when a caller does not pass one.
    pub week_mode: WeekMode,
    pub cache_ttl_seconds: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            week_mode: WeekMode::Current,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(LedgerError::ConfigError(format!(
                "utc_offset_minutes must be within ±{MAX_OFFSET_MINUTES}, got {}",
                self.utc_offset_minutes
            )));
        }
        if self.cache_ttl_seconds <= 0 {
            return Err(LedgerError::ConfigError(format!(
                "cache_ttl_seconds must be positive, got {}",
                self.cache_ttl_seconds
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }

    /// Convert a recorded timestamp to ledger wall-clock time.
    pub fn localize(&self, ts: &Timestamp) -> NaiveDateTime {
        ts.to_local(&self.offset())
    }

    pub fn now_local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset()).naive_local()
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.cache_ttl_seconds)
            .unwrap_or_else(|| TimeDelta::seconds(DEFAULT_CACHE_TTL_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_defaults() {
        let cfg = LedgerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache_ttl(), TimeDelta::minutes(5));
        assert_eq!(cfg.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: LedgerConfig =
            serde_json::from_str(r#"{"utc_offset_minutes": -360}"#).unwrap();
        assert_eq!(cfg.week_mode, WeekMode::Current);
        assert_eq!(cfg.cache_ttl_seconds, DEFAULT_CACHE_TTL_SECONDS);
        let local = cfg.localize(&"2025-09-08T03:00:00Z".parse().unwrap());
        assert_eq!(local.hour(), 21);
    }

    #[test]
    fn test_validation_accepts_eighteen_hours_either_side() {
        for minutes in [18 * 60, -18 * 60] {
            let cfg = LedgerConfig {
                utc_offset_minutes: minutes,
                ..Default::default()
            };
            assert!(cfg.validate().is_ok());
            assert_eq!(cfg.offset().local_minus_utc(), minutes * 60);
        }
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let cfg = LedgerConfig {
            utc_offset_minutes: 20 * 60,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LedgerError::ConfigError(_))));

        let cfg = LedgerConfig {
            utc_offset_minutes: i32::MIN,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LedgerError::ConfigError(_))));

        let cfg = LedgerConfig {
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
