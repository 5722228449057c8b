//! Command handlers and the profile → `PortalConfig` plumbing they share.

pub mod config_cmd;
pub mod fetch;
pub mod fields;
pub mod login;
pub mod watch;

use esolar_config::{Config, Profile};
use esolar_core::{Portal, PortalConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file named by `--config`, or the canonical one.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(esolar_config::config_path);
    Ok(esolar_config::load_config_from(&path)?)
}

/// The active profile with CLI flag overrides applied.
///
/// Without a matching profile, flags alone may describe the account as
/// long as `--username` is given.
pub fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let (name, mut profile) = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => (name.to_owned(), profile.clone()),
        Err(_) if global.username.is_some() => (
            global.profile.clone().unwrap_or_else(|| "default".into()),
            Profile::default(),
        ),
        Err(_) => {
            if let Some(ref name) = global.profile {
                if !cfg.profiles.is_empty() {
                    return Err(CliError::ProfileNotFound {
                        name: name.clone(),
                        available: cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
                    });
                }
            }
            let path = global
                .config
                .clone()
                .unwrap_or_else(esolar_config::config_path);
            return Err(CliError::NoConfig {
                path: path.display().to_string(),
            });
        }
    };

    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if let Some(ref provider) = global.provider {
        profile.provider = Some(provider.clone());
        profile.provider_host = None;
    }
    if let Some(ref host) = global.host {
        profile.provider_host = Some(host.clone());
        profile.provider_path = global.path.clone();
        profile.use_tls = Some(!global.http);
    }
    if global.insecure {
        profile.verify_tls = Some(false);
    }
    if let Some(ref variant) = global.variant {
        profile.variant = Some(variant.clone());
    }
    if let Some(index) = global.plant_index {
        profile.plant_index = index;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok((name, profile))
}

/// Build a ready `Portal` for the active profile.
pub fn build_portal(
    global: &GlobalOpts,
    fields: Option<Vec<String>>,
) -> Result<(Portal, String), CliError> {
    let cfg = load_config(global)?;
    let (name, profile) = active_profile(global, &cfg)?;
    let mut portal_config: PortalConfig =
        esolar_config::profile_to_portal_config(&profile, &name, &cfg.defaults)?;
    if fields.is_some() {
        portal_config.fields = fields;
    }

    tracing::debug!(
        profile = %name,
        account = %portal_config.account_id(),
        variant = %portal_config.variant,
        "portal configured"
    );

    let portal = Portal::new(portal_config).map_err(|e| CliError::from_core(e, &name))?;
    Ok((portal, name))
}
