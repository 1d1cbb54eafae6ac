//! Bridge configuration, loaded from `INIT_<field>=<value>` strings

use std::{collections::BTreeMap, time::Duration};

use log::{error, info};

use crate::{gatt::profile::DEFAULT_DEVICE_NAME, utils::logging::init_logging};

/// Default bound on the GATT server reset wait
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 300;

/// Configuration for one bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Whether BLE is in use at all. When false, init and advertising are
    /// no-ops.
    pub enabled: bool,
    /// Name the adapter reports while commissionable
    pub device_name: String,
    /// Bound on the GATT server reset wait
    pub reset_timeout_ms: u64,
    /// Maximum log level
    pub log_level: log::LevelFilter,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_name: DEFAULT_DEVICE_NAME.to_owned(),
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            log_level: log::LevelFilter::Info,
        }
    }
}

fn parse_field<T: std::str::FromStr>(flag: &str, value: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    value.parse().unwrap_or_else(|e| {
        error!("Parse failure on '{}': {}", flag, e);
        default
    })
}

impl BridgeConfig {
    /// Parse the flags and bring logging up at the configured level
    pub fn load(raw_flags: Vec<String>) -> Self {
        init_logging(Self::default().log_level);

        let config = Self::parse(raw_flags);
        info!("config loaded: {:?}", config.dump());

        // re-init to respect the log level set by flags
        init_logging(config.log_level);
        config
    }

    /// Build a config from `INIT_<field>=<value>` entries. Malformed or
    /// unknown entries are logged and skipped.
    pub fn parse(flags: Vec<String>) -> Self {
        let mut config = Self::default();

        for flag in flags {
            let values: Vec<&str> = flag.split('=').collect();
            if values.len() != 2 {
                error!("Bad flag {}, must be in <FLAG>=<VALUE> format", flag);
                continue;
            }

            match values[0] {
                "INIT_enabled" => config.enabled = parse_field(&flag, values[1], true),
                "INIT_device_name" => config.device_name = values[1].to_owned(),
                "INIT_reset_timeout_ms" => {
                    config.reset_timeout_ms =
                        parse_field(&flag, values[1], DEFAULT_RESET_TIMEOUT_MS)
                }
                "INIT_log_level" => {
                    config.log_level = parse_field(&flag, values[1], log::LevelFilter::Info)
                }
                _ => error!("Unsaved flag: {} = {}", values[0], values[1]),
            }
        }

        config
    }

    /// Current values, by field name
    pub fn dump(&self) -> BTreeMap<&'static str, String> {
        [
            ("enabled", format!("{}", self.enabled)),
            ("device_name", self.device_name.clone()),
            ("reset_timeout_ms", format!("{}", self.reset_timeout_ms)),
            ("log_level", format!("{}", self.log_level)),
        ]
        .into()
    }

    /// The reset wait as a Duration
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}
