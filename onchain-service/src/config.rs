//! Env-driven `Config`, grounded on `examples/Blockstream-lwk/lwk_app/src/config.rs`'s
//! typed-defaults shape. Required DB settings fail fast (spec.md §7:
//! `ConfigError` is fatal at startup); everything else has a default.

use std::time::Duration;

use onchain_signal::KillSwitchConfig;

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_pool_min: u32,
    pub db_pool_max: u32,

    pub scheduler_interval: Duration,

    pub kill_switch: KillSwitchConfig,

    pub listen_addr: String,
}

fn env_var(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::Config(format!("missing required env var {name}")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {name}: {value:?}"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from process environment, per spec.md §6's
    /// normative env var names. `DB_HOST`/`DB_NAME`/`DB_USER`/`DB_PASSWORD`
    /// are required; everything else defaults.
    pub fn from_env() -> Result<Self, Error> {
        let db_host = env_var("DB_HOST")?;
        let db_name = env_var("DB_NAME")?;
        let db_user = env_var("DB_USER")?;
        let db_password = env_var("DB_PASSWORD")?;
        let db_port = parse_env_or("DB_PORT", 5432u16)?;
        let db_pool_min = parse_env_or("DB_POOL_MIN", 2u32)?;
        let db_pool_max = parse_env_or("DB_POOL_MAX", 10u32)?;

        let scheduler_interval_secs = parse_env_or("SCHEDULER_INTERVAL", 300u64)?;

        let mut kill_switch = KillSwitchConfig::default();
        kill_switch.min_confidence = parse_env_or("MIN_CONFIDENCE", kill_switch.min_confidence)?;
        kill_switch.stability_threshold =
            parse_env_or("STABILITY_THRESHOLD", kill_switch.stability_threshold)?;
        kill_switch.completeness_threshold = parse_env_or(
            "COMPLETENESS_THRESHOLD",
            kill_switch.completeness_threshold,
        )?;
        let max_data_age_hours: i64 = parse_env_or("MAX_DATA_AGE_HOURS", 2i64)?;
        kill_switch.max_data_age_seconds = max_data_age_hours * 3600;

        Ok(Config {
            db_host,
            db_port,
            db_name,
            db_user,
            db_password,
            db_pool_min,
            db_pool_max,
            scheduler_interval: Duration::from_secs(scheduler_interval_secs),
            kill_switch,
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }
}
