//! CLI config for the fragment cache.
use std::time::Duration;

/// CLI config for the fragment cache.
#[derive(Debug, Clone, Copy, clap::Parser)]
pub struct FragmentCacheConfig {
    /// Share fragment lists between the segments of one query.
    ///
    /// When disabled, every segment lists the fragments of the data source itself.
    #[clap(
        long = "fragment-cache-enabled",
        env = "FEDGATE_FRAGMENT_CACHE_ENABLED",
        default_value = "true",
        action = clap::ArgAction::Set,
    )]
    pub enabled: bool,

    /// Evict a cached fragment list after it has not been accessed for this long.
    #[clap(
        long = "fragment-cache-idle-expiry",
        env = "FEDGATE_FRAGMENT_CACHE_IDLE_EXPIRY",
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub idle_expiry: Duration,

    /// How often the background task looks for idle fragment lists.
    ///
    /// Idle lists are never served, this only bounds how long they occupy memory.
    #[clap(
        long = "fragment-cache-eviction-interval",
        env = "FEDGATE_FRAGMENT_CACHE_EVICTION_INTERVAL",
        default_value = "1s",
        value_parser = parse_positive_duration,
    )]
    pub eviction_interval: Duration,
}

fn parse_positive_duration(s: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("must be greater than zero".to_owned());
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use parking_lot::Mutex;

    use super::*;

    /// Held by tests that depend on the `FEDGATE_FRAGMENT_CACHE_*` environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 3] = [
        "FEDGATE_FRAGMENT_CACHE_ENABLED",
        "FEDGATE_FRAGMENT_CACHE_IDLE_EXPIRY",
        "FEDGATE_FRAGMENT_CACHE_EVICTION_INTERVAL",
    ];

    #[test]
    fn defaults() {
        let _guard = ENV_LOCK.lock();
        let config = FragmentCacheConfig::try_parse_from(["server"]).unwrap();

        assert!(config.enabled);
        assert_eq!(config.idle_expiry, Duration::from_secs(10));
        assert_eq!(config.eviction_interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides() {
        let config = FragmentCacheConfig::try_parse_from([
            "server",
            "--fragment-cache-enabled",
            "false",
            "--fragment-cache-idle-expiry",
            "1m 30s",
            "--fragment-cache-eviction-interval",
            "250ms",
        ])
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.idle_expiry, Duration::from_secs(90));
        assert_eq!(config.eviction_interval, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values() {
        FragmentCacheConfig::try_parse_from(["server", "--fragment-cache-enabled", "maybe"])
            .unwrap_err();
        FragmentCacheConfig::try_parse_from(["server", "--fragment-cache-idle-expiry", "10"])
            .unwrap_err();
    }

    #[test]
    fn zero_eviction_interval_is_rejected() {
        let err = FragmentCacheConfig::try_parse_from([
            "server",
            "--fragment-cache-eviction-interval",
            "0s",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"), "{err}");

        FragmentCacheConfig::try_parse_from([
            "server",
            "--fragment-cache-eviction-interval",
            "soon",
        ])
        .unwrap_err();
    }

    #[test]
    fn env_overrides() {
        let _guard = ENV_LOCK.lock();
        // SAFETY: every test reading these variables holds ENV_LOCK
        unsafe {
            std::env::set_var("FEDGATE_FRAGMENT_CACHE_ENABLED", "false");
            std::env::set_var("FEDGATE_FRAGMENT_CACHE_IDLE_EXPIRY", "30s");
            std::env::set_var("FEDGATE_FRAGMENT_CACHE_EVICTION_INTERVAL", "5s");
        }

        let from_env = FragmentCacheConfig::try_parse_from(["server"]);
        let flag_wins = FragmentCacheConfig::try_parse_from([
            "server",
            "--fragment-cache-idle-expiry",
            "2s",
        ]);

        unsafe {
            for var in ENV_VARS {
                std::env::remove_var(var);
            }
        }

        let from_env = from_env.unwrap();
        assert!(!from_env.enabled);
        assert_eq!(from_env.idle_expiry, Duration::from_secs(30));
        assert_eq!(from_env.eviction_interval, Duration::from_secs(5));

        let flag_wins = flag_wins.unwrap();
        assert!(!flag_wins.enabled);
        assert_eq!(flag_wins.idle_expiry, Duration::from_secs(2));
    }
}
