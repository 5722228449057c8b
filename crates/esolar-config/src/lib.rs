//! Shared configuration for the esolar CLI.
//!
//! TOML profiles, password resolution (env + keyring + plaintext) and
//! translation to `esolar_core::PortalConfig`. The CLI layers its flag
//! overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use esolar_core::{
    Credentials, LoginPolicy, ModuleVariant, PortalConfig, Provider, Scheme, TlsMode,
    TransportConfig,
};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "esolar";

/// Env var consulted for the password when the profile names none.
pub const PASSWORD_ENV: &str = "ESOLAR_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account/plant profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Upper bound for one fetch cycle in seconds.
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout: u64,

    /// `esolar watch` interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            cycle_timeout: default_cycle_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_cycle_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    300
}

/// One account and plant on one portal deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Preset deployment: "saj" or "greenheiss". Ignored when
    /// `provider_host` is set.
    pub provider: Option<String>,

    /// Custom portal host, e.g. "fop.saj-electric.com".
    pub provider_host: Option<String>,

    /// Application path under the host, e.g. "saj" or "cloud".
    pub provider_path: Option<String>,

    /// `false` talks plain HTTP to a custom host.
    pub use_tls: Option<bool>,

    /// `false` accepts any certificate.
    pub verify_tls: Option<bool>,

    /// Extra CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    pub username: String,

    /// Password (plaintext; prefer the keyring or an env var).
    pub password: Option<String>,

    /// Env var holding the password.
    pub password_env: Option<String>,

    /// "base" (or "none"), "h1" or "saj_sec".
    pub variant: Option<String>,

    #[serde(default)]
    pub plant_index: usize,

    /// Override of `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Override of `defaults.cycle_timeout`.
    pub cycle_timeout: Option<u64>,

    /// Serve the cached reading for fetches sooner than this.
    pub min_refresh_secs: Option<u64>,

    /// Submit the login form on every cycle (the default) instead of
    /// reusing the session.
    pub relogin_each_cycle: Option<bool>,

    /// Serve the last good reading on transient failures for this long.
    pub stale_grace_secs: Option<u64>,

    /// Only report these fields.
    pub fields: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "esolar", "esolar").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("esolar");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under `ESOLAR_*`
/// env vars (`ESOLAR_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ESOLAR_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Providers ───────────────────────────────────────────────────────

/// Built-in deployments by name.
pub fn provider_preset(name: &str) -> Option<Provider> {
    match name.trim().to_ascii_lowercase().as_str() {
        "saj" => Some(Provider::saj()),
        "greenheiss" => Some(Provider::greenheiss()),
        _ => None,
    }
}

/// The deployment a profile points at.
pub fn resolve_provider(profile: &Profile) -> Result<Provider, ConfigError> {
    let verify = profile.verify_tls.unwrap_or(true);

    if let Some(ref host) = profile.provider_host {
        if host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "provider_host".into(),
                reason: "must not be empty".into(),
            });
        }
        let scheme = if profile.use_tls.unwrap_or(true) {
            Scheme::Https
        } else {
            Scheme::Http
        };
        let path = profile.provider_path.as_deref().unwrap_or_default();
        return Ok(Provider::new(host.as_str(), path, scheme, verify));
    }

    let name = profile.provider.as_deref().unwrap_or("saj");
    let preset = provider_preset(name).ok_or_else(|| ConfigError::Validation {
        field: "provider".into(),
        reason: format!("expected 'saj' or 'greenheiss', got '{name}'"),
    })?;
    Ok(Provider::new(
        preset.host(),
        preset.path(),
        preset.scheme(),
        verify,
    ))
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the profile's password: `password_env`, then
/// `ESOLAR_PASSWORD`, then the system keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        |name| keyring_password(name).ok().flatten(),
    )
}

/// [`resolve_password`] with the env and keyring lookups supplied.
pub fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    if let Some(ref var) = profile.password_env {
        if let Some(pw) = env(var) {
            return Ok(SecretString::from(pw));
        }
        debug!(var, "password env var not set");
    }

    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

fn keyring_password(profile_name: &str) -> Result<Option<String>, ConfigError> {
    match keyring_entry(profile_name)?.get_password() {
        Ok(pw) => Ok(Some(pw)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

pub fn parse_variant(raw: Option<&str>) -> Result<ModuleVariant, ConfigError> {
    match raw {
        None => Ok(ModuleVariant::default()),
        Some(s) => s.trim().parse().map_err(|_| ConfigError::Validation {
            field: "variant".into(),
            reason: format!("expected 'none', 'base', 'h1' or 'saj_sec', got '{s}'"),
        }),
    }
}

/// Build a `PortalConfig` from a profile, resolving its password.
pub fn profile_to_portal_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PortalConfig, ConfigError> {
    let password = resolve_password(profile, profile_name)?;
    build_portal_config(profile, defaults, password)
}

/// Build a `PortalConfig` from a profile and an already resolved password.
pub fn build_portal_config(
    profile: &Profile,
    defaults: &Defaults,
    password: SecretString,
) -> Result<PortalConfig, ConfigError> {
    if profile.username.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "username".into(),
            reason: "must not be empty".into(),
        });
    }

    let provider = resolve_provider(profile)?;
    let credentials = Credentials::from_secret(profile.username.trim(), password);

    let transport = TransportConfig {
        tls: profile
            .ca_cert
            .clone()
            .map_or(TlsMode::System, TlsMode::CustomCa),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        ..TransportConfig::default()
    };

    let mut config = PortalConfig::new(provider, credentials);
    config.variant = parse_variant(profile.variant.as_deref())?;
    config.plant_index = profile.plant_index;
    config.transport = transport;
    config.cycle_timeout =
        Duration::from_secs(profile.cycle_timeout.unwrap_or(defaults.cycle_timeout));
    config.min_refresh_interval = Duration::from_secs(profile.min_refresh_secs.unwrap_or(0));
    config.login_policy = if profile.relogin_each_cycle.unwrap_or(true) {
        LoginPolicy::EachCycle
    } else {
        LoginPolicy::WhenInvalidated
    };
    config.stale_grace = profile.stale_grace_secs.map(Duration::from_secs);
    config.fields.clone_from(&profile.fields);

    Ok(config)
}
