use anyhow::{ensure, Context, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. When absent the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    /// How often the rollup scheduler checks for a new GMT+8 day, in seconds.
    pub rollup_poll_interval_secs: u64,
    /// Migrate every skipped day after a long pause instead of only the last one.
    pub rollup_catch_up: bool,
    /// Number of days of daily averages the comfort engine looks back over.
    pub history_window_days: i64,
    pub simulator_enabled: bool,
    pub seed_properties: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            rollup_poll_interval_secs: parse_poll_interval(&optional(
                "ROLLUP_POLL_INTERVAL_SECS",
                "300",
            ))
            .context("ROLLUP_POLL_INTERVAL_SECS must be a positive integer")?,
            rollup_catch_up: parse_bool(&optional("ROLLUP_CATCH_UP", "false"))
                .context("ROLLUP_CATCH_UP must be a boolean")?,
            history_window_days: parse_window_days(&optional("HISTORY_WINDOW_DAYS", "365"))
                .context("HISTORY_WINDOW_DAYS must be an integer between 1 and 36500")?,
            simulator_enabled: parse_bool(&optional("SIMULATOR_ENABLED", "true"))
                .context("SIMULATOR_ENABLED must be a boolean")?,
            seed_properties: parse_bool(&optional("SEED_PROPERTIES", "true"))
                .context("SEED_PROPERTIES must be a boolean")?,
        })
    }
}

/// Accepts `true/false`, `1/0` and `yes/no`, case-insensitive.
fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow::anyhow!("expected a boolean, got: {other:?}")),
    }
}

const MAX_HISTORY_WINDOW_DAYS: i64 = 36_500;

fn parse_poll_interval(raw: &str) -> Result<u64> {
    let secs: u64 = raw.trim().parse()?;
    ensure!(secs > 0, "poll interval must not be zero");
    Ok(secs)
}

fn parse_window_days(raw: &str) -> Result<i64> {
    let days: i64 = raw.trim().parse()?;
    ensure!(
        (1..=MAX_HISTORY_WINDOW_DAYS).contains(&days),
        "history window out of range: {days}"
    );
    Ok(days)
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for raw in ["true", "TRUE", "1", "yes", " Yes "] {
            assert!(parse_bool(raw).unwrap(), "{raw}");
        }
        for raw in ["false", "False", "0", "no"] {
            assert!(!parse_bool(raw).unwrap(), "{raw}");
        }
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        let err = parse_bool("maybe").unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn poll_interval_must_be_positive() {
        assert_eq!(parse_poll_interval("300").unwrap(), 300);
        assert!(parse_poll_interval("0").is_err());
        assert!(parse_poll_interval("-5").is_err());
        assert!(parse_poll_interval("soon").is_err());
    }

    #[test]
    fn history_window_is_bounded() {
        assert_eq!(parse_window_days("365").unwrap(), 365);
        assert_eq!(parse_window_days("1").unwrap(), 1);
        assert_eq!(parse_window_days("36500").unwrap(), 36_500);
        for raw in ["0", "-1", "36501", "200000000", "9223372036854775807"] {
            let err = parse_window_days(raw).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{raw}");
        }
    }

    #[test]
    fn optional_falls_back_to_default() {
        assert_eq!(optional("COMFORT_SERVICE_SURELY_UNSET_VAR", "42"), "42");
    }
}
