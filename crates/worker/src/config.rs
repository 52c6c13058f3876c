//! Worker configuration loaded from environment variables.
//!
//! | Env Var                        | Required | Default                        |
//! |--------------------------------|----------|--------------------------------|
//! | `SOURCE_SHEET_ID`              | yes      | --                             |
//! | `TARGET_SHEET_ID`              | yes      | --                             |
//! | `SVC_JSON`                     | yes      | --                             |
//! | `TIMEZONE`                     | no       | `Europe/Istanbul`              |
//! | `ROUTER_INTERVAL_SECONDS`      | no       | `15`                           |
//! | `ROUTER_STARTUP_DELAY_SECONDS` | no       | `0`                            |
//! | `ROUTER_JITTER_SECONDS`        | no       | `0`                            |
//! | `ROUTER_SOURCE_TABLES`         | no       | `MesaiLog,BonusLog,FinansLog`  |
//! | `ROUTER_WINDOW`                | no       | `200`                          |
//! | `ROUTER_INACTIVE_MARKER`       | no       | `Pasif`                        |
//! | `ROUTER_MAX_ATTEMPTS`          | no       | `5`                            |
//! | `ROUTER_RUN_ONCE`              | no       | `false`                        |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ares_core::clock::{Clock, DEFAULT_TIMEZONE};
use ares_core::layout::{DEFAULT_INACTIVE_MARKER, DEFAULT_SOURCE_TABLES, DEFAULT_WINDOW};
use ares_router::RouterConfig;
use ares_sheets::google::ServiceAccountKey;

use crate::scheduler::Schedule;

const DEFAULT_INTERVAL_SECS: u64 = 15;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

pub struct WorkerConfig {
    pub source_sheet_id: String,
    pub target_sheet_id: String,
    pub service_account: ServiceAccountKey,
    pub clock: Clock,
    pub schedule: Schedule,
    pub router: RouterConfig,
    /// Store calls per operation, quota retries included.
    pub max_attempts: u32,
    pub run_once: bool,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("source_sheet_id", &self.source_sheet_id)
            .field("target_sheet_id", &self.target_sheet_id)
            .field("client_email", &self.service_account.client_email)
            .field("timezone", &self.clock.timezone())
            .field("schedule", &self.schedule)
            .field("router", &self.router)
            .field("max_attempts", &self.max_attempts)
            .field("run_once", &self.run_once)
            .finish()
    }
}

impl WorkerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let source_sheet_id = env.required("SOURCE_SHEET_ID")?;
        let target_sheet_id = env.required("TARGET_SHEET_ID")?;

        let raw_key = env.required("SVC_JSON")?;
        let service_account =
            ServiceAccountKey::from_json(&raw_key).map_err(|e| ConfigError::Invalid {
                key: "SVC_JSON",
                expected: "a service account key (JSON)",
                value: e.to_string(),
            })?;

        let timezone = env
            .optional("TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let clock = Clock::new(&timezone).map_err(|_| ConfigError::Invalid {
            key: "TIMEZONE",
            expected: "an IANA time zone name",
            value: timezone.clone(),
        })?;

        let interval: u64 = env.number("ROUTER_INTERVAL_SECONDS", DEFAULT_INTERVAL_SECS)?;
        if interval == 0 {
            return Err(ConfigError::Invalid {
                key: "ROUTER_INTERVAL_SECONDS",
                expected: "at least 1",
                value: interval.to_string(),
            });
        }
        let schedule = Schedule {
            interval: Duration::from_secs(interval),
            startup_delay: Duration::from_secs(env.number("ROUTER_STARTUP_DELAY_SECONDS", 0)?),
            jitter: Duration::from_secs(env.number("ROUTER_JITTER_SECONDS", 0)?),
        };

        let source_tables = match env.optional("ROUTER_SOURCE_TABLES") {
            Some(raw) => {
                let tables = split_list(&raw);
                if tables.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "ROUTER_SOURCE_TABLES",
                        expected: "a comma-separated list of table names",
                        value: raw,
                    });
                }
                tables
            }
            None => DEFAULT_SOURCE_TABLES.iter().map(|s| s.to_string()).collect(),
        };

        let window: u32 = env.number("ROUTER_WINDOW", DEFAULT_WINDOW)?;
        let max_attempts: u32 = env.number("ROUTER_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        for (key, value) in [("ROUTER_WINDOW", window), ("ROUTER_MAX_ATTEMPTS", max_attempts)] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    expected: "at least 1",
                    value: value.to_string(),
                });
            }
        }

        let inactive_marker = env
            .optional("ROUTER_INACTIVE_MARKER")
            .unwrap_or_else(|| DEFAULT_INACTIVE_MARKER.to_string());

        let run_once = env.flag("ROUTER_RUN_ONCE")?;

        Ok(Self {
            source_sheet_id,
            target_sheet_id,
            service_account,
            clock,
            schedule,
            router: RouterConfig {
                source_tables,
                window,
                inactive_marker,
                ..RouterConfig::default()
            },
            max_attempts,
            run_once,
        })
    }
}

/// Typed accessors over a key lookup.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Trimmed value, `None` when unset or blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    /// Numeric value or `default` when unset. A set but blank value is an
    /// error.
    fn number<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        let Some(raw) = (self.0)(key) else {
            return Ok(default);
        };
        raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a non-negative integer",
            value: raw,
        })
    }

    fn flag(&self, key: &'static str) -> Result<bool, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(false);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                expected: "a boolean",
                value: raw,
            }),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_splitting_drops_blanks() {
        assert_eq!(split_list(" MesaiLog, ,BonusLog ,"), vec!["MesaiLog", "BonusLog"]);
        assert!(split_list(" , ").is_empty());
    }
}
