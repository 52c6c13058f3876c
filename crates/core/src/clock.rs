//! Timezone-aware wall clock for routing timestamps.
//!
//! Every timestamp the router writes (`ProcessedAt`, `Olusturuldu`,
//! `Guncellendi`) is rendered in one configured IANA zone using
//! [`TIMESTAMP_FORMAT`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::CoreError;

/// Default zone when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Europe/Istanbul";

/// `strftime` pattern for all written timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    /// Build a clock for the named IANA zone (e.g. `Europe/Istanbul`).
    pub fn new(timezone: &str) -> Result<Self, CoreError> {
        let tz: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| CoreError::Config(format!("Unknown timezone '{timezone}'")))?;
        Ok(Self { tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current time rendered in the configured zone.
    pub fn now_str(&self) -> String {
        self.format(Utc::now())
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format(TIMESTAMP_FORMAT).to_string()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Europe::Istanbul,
        }
    }
}
