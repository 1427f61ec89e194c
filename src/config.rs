//! Runtime settings shared by the server binary and [crate::AppState].

use std::time::Duration;

use crate::{
    Error, batch_import::DEFAULT_BATCH_SIZE, live::ReconnectPolicy,
    timezone::require_local_offset,
};

/// The timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Etc/UTC";

/// Validated settings for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How many transactions to send per batch during an import.
    pub batch_size: usize,
    /// How long to wait before each attempt to connect to the push hub.
    pub reconnect_policy: ReconnectPolicy,
}

impl AppConfig {
    /// Create a config from raw setting values.
    ///
    /// `reconnect_delays` is a comma-separated list of whole seconds, e.g. "0,2,10,30".
    ///
    /// # Errors
    /// Returns an error if the timezone is unknown, the batch size is zero or
    /// a reconnect delay is not a whole number of seconds.
    pub fn new(local_timezone: &str, batch_size: usize, reconnect_delays: &str) -> Result<Self, Error> {
        require_local_offset(local_timezone)?;

        if batch_size == 0 {
            return Err(Error::InvalidChunkSize);
        }

        let delays = parse_reconnect_delays(reconnect_delays)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            batch_size,
            reconnect_policy: ReconnectPolicy::new(delays),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_timezone: DEFAULT_TIMEZONE.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

/// Parse a comma-separated list of delays in seconds.
///
/// # Errors
/// Returns [Error::InvalidConfig] if the list is empty or an entry is not a
/// non-negative integer.
pub fn parse_reconnect_delays(text: &str) -> Result<Vec<Duration>, Error> {
    let delays = text
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u64>().map(Duration::from_secs).map_err(|error| {
                Error::InvalidConfig(format!("reconnect delay \"{entry}\": {error}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if delays.is_empty() {
        return Err(Error::InvalidConfig(
            "at least one reconnect delay is required".to_owned(),
        ));
    }

    Ok(delays)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{Error, live::ReconnectPolicy};

    use super::{AppConfig, parse_reconnect_delays};

    #[test]
    fn parses_delays_with_whitespace() {
        let delays = parse_reconnect_delays("0, 2,10 ,30").unwrap();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(0),
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_delay() {
        let result = parse_reconnect_delays("0,soon");

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_delays() {
        let result = parse_reconnect_delays(" , ");

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn new_config_keeps_settings() {
        let config = AppConfig::new("Pacific/Auckland", 20, "1,5").unwrap();

        assert_eq!(config.local_timezone, "Pacific/Auckland");
        assert_eq!(config.batch_size, 20);
        assert_eq!(
            config.reconnect_policy,
            ReconnectPolicy::new(vec![Duration::from_secs(1), Duration::from_secs(5)])
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert_eq!(
            AppConfig::new("Etc/UTC", 0, "0"),
            Err(Error::InvalidChunkSize)
        );
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert_eq!(
            AppConfig::new("Mars/Olympus_Mons", 50, "0"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();

        assert_eq!(
            AppConfig::new(&config.local_timezone, config.batch_size, "0,2,10,30"),
            Ok(config)
        );
    }
}
