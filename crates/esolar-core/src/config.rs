// ── Runtime portal configuration ──
//
// These types describe *what* to fetch and *how often*. They carry
// credential data and tuning, but never touch disk. The CLI builds a
// `PortalConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use esolar_api::{Credentials, Provider, TransportConfig};

use crate::field::FieldModule;

/// Which optional hardware the plant has, and therefore which extra calls
/// the fetch cycle makes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModuleVariant {
    /// Inverters only.
    #[default]
    #[serde(alias = "none")]
    #[strum(to_string = "base", serialize = "none")]
    Base,
    /// H1 hybrid inverter with battery storage.
    H1,
    /// SEC energy meter module.
    SajSec,
}

impl ModuleVariant {
    /// Field modules whose fields a snapshot of this variant carries.
    pub fn modules(self) -> &'static [FieldModule] {
        match self {
            Self::Base => &[FieldModule::Base],
            Self::H1 => &[FieldModule::Base, FieldModule::H1],
            Self::SajSec => &[FieldModule::Base, FieldModule::Sec],
        }
    }

    pub fn is_h1(self) -> bool {
        self == Self::H1
    }

    pub fn is_sec(self) -> bool {
        self == Self::SajSec
    }
}

/// When the session logs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginPolicy {
    /// Submit the login form at the start of every cycle.
    #[default]
    EachCycle,
    /// Log in once and reuse the session until something invalidates it.
    WhenInvalidated,
}

/// Configuration for polling one plant of one account.
///
/// Built by the CLI, passed to [`Portal`](crate::Portal); core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub provider: Provider,
    pub credentials: Credentials,
    /// Extra hardware modules on the plant.
    pub variant: ModuleVariant,
    /// Position of the plant in the account's plant list.
    pub plant_index: usize,
    /// Transport tuning (user agent, request timeout, custom CA).
    pub transport: TransportConfig,
    /// Upper bound for a whole fetch cycle.
    pub cycle_timeout: Duration,
    /// Cycles requested sooner than this after a good one return the cached
    /// snapshot. Zero disables throttling.
    pub min_refresh_interval: Duration,
    pub login_policy: LoginPolicy,
    /// How long after its fetch a snapshot may still be served when a cycle
    /// fails with a transport or API error. `None` never serves stale data.
    pub stale_grace: Option<Duration>,
    /// Restrict the snapshot to these field keys. `None` keeps every field
    /// of the variant.
    pub fields: Option<Vec<String>>,
}

impl PortalConfig {
    pub fn new(provider: Provider, credentials: Credentials) -> Self {
        Self {
            provider,
            credentials,
            variant: ModuleVariant::default(),
            plant_index: 0,
            transport: TransportConfig::default(),
            cycle_timeout: Duration::from_secs(10),
            min_refresh_interval: Duration::ZERO,
            login_policy: LoginPolicy::default(),
            stale_grace: None,
            fields: None,
        }
    }

    /// Account identity as shown to users: `username@host`.
    pub fn account_id(&self) -> String {
        format!("{}@{}", self.credentials.username, self.provider.host())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn variant_parsing_accepts_legacy_none() {
        assert_eq!(ModuleVariant::from_str("none").unwrap(), ModuleVariant::Base);
        assert_eq!(ModuleVariant::from_str("base").unwrap(), ModuleVariant::Base);
        assert_eq!(ModuleVariant::from_str("H1").unwrap(), ModuleVariant::H1);
        assert_eq!(ModuleVariant::from_str("saj_sec").unwrap(), ModuleVariant::SajSec);
        assert!(ModuleVariant::from_str("h2").is_err());
    }

    #[test]
    fn variant_display_round_trips() {
        assert_eq!(ModuleVariant::Base.to_string(), "base");
        assert_eq!(ModuleVariant::SajSec.to_string(), "saj_sec");
    }

    #[test]
    fn variant_modules() {
        assert_eq!(ModuleVariant::Base.modules(), &[FieldModule::Base]);
        assert!(ModuleVariant::H1.modules().contains(&FieldModule::H1));
        assert!(!ModuleVariant::H1.modules().contains(&FieldModule::Sec));
    }

    #[test]
    fn account_id_uses_host() {
        let cfg = PortalConfig::new(Provider::greenheiss(), Credentials::new("me", "pw"));
        assert_eq!(cfg.account_id(), "me@greenheiss-portal.saj-electric.com");
    }
}
