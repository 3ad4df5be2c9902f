//! Runtime configuration read from `INVESTMENT_WEB_*` environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::identity::SessionPolicy;

pub const ENV_BIND: &str = "INVESTMENT_WEB_BIND";
pub const ENV_HTTP_PORT: &str = "INVESTMENT_WEB_HTTP_PORT";
pub const ENV_SESSION_TTL_SECS: &str = "INVESTMENT_WEB_SESSION_TTL_SECS";
pub const ENV_REMEMBER_DAYS: &str = "INVESTMENT_WEB_REMEMBER_DAYS";
pub const ENV_SWEEP_SECS: &str = "INVESTMENT_WEB_SWEEP_SECS";
pub const ENV_SECURE_COOKIES: &str = "INVESTMENT_WEB_SECURE_COOKIES";
pub const ENV_CSRF: &str = "INVESTMENT_WEB_CSRF";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}': {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub http_port: u16,
    /// Lifetime of a session when "remember me" was not ticked.
    pub session_ttl: Duration,
    /// Lifetime of a remembered session; also the cookie Max-Age.
    pub remember_ttl: Duration,
    /// Interval of the expired-session sweeper. `None` disables it.
    pub sweep_interval: Option<Duration>,
    pub secure_cookies: bool,
    pub csrf_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 5000,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            remember_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            sweep_interval: Some(Duration::from_secs(60)),
            secure_cookies: false,
            csrf_enabled: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(v) = lookup(ENV_BIND) {
            cfg.bind = parse(ENV_BIND, &v)?;
        }
        if let Some(v) = lookup(ENV_HTTP_PORT) {
            cfg.http_port = parse(ENV_HTTP_PORT, &v)?;
        }
        if let Some(v) = lookup(ENV_SESSION_TTL_SECS) {
            let secs: u64 = parse(ENV_SESSION_TTL_SECS, &v)?;
            if secs == 0 {
                return Err(invalid(ENV_SESSION_TTL_SECS, &v, "must be greater than zero"));
            }
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup(ENV_REMEMBER_DAYS) {
            let days: u64 = parse(ENV_REMEMBER_DAYS, &v)?;
            if days == 0 {
                return Err(invalid(ENV_REMEMBER_DAYS, &v, "must be greater than zero"));
            }
            cfg.remember_ttl = Duration::from_secs(days * 24 * 60 * 60);
        }
        if let Some(v) = lookup(ENV_SWEEP_SECS) {
            let secs: u64 = parse(ENV_SWEEP_SECS, &v)?;
            cfg.sweep_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = lookup(ENV_SECURE_COOKIES) {
            cfg.secure_cookies = parse_flag(ENV_SECURE_COOKIES, &v)?;
        }
        if let Some(v) = lookup(ENV_CSRF) {
            cfg.csrf_enabled = parse_flag(ENV_CSRF, &v)?;
        }
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.http_port)
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy { ttl: self.session_ttl, remember_ttl: self.remember_ttl }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.to_string() }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| invalid(key, value, e))
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}
