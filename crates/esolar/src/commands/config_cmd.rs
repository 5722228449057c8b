//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use esolar_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(esolar_config::config_path)
}

fn save(cfg: &Config, global: &GlobalOpts) -> Result<PathBuf, CliError> {
    let path = config_file(global);
    esolar_config::save_config_to(cfg, &path)?;
    Ok(path)
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn available(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn parse_flag<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let mut cfg = super::load_config(global)?;
            for profile in cfg.profiles.values_mut() {
                if profile.password.is_some() {
                    profile.password = Some("********".into());
                }
            }
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<{e}>")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = super::load_config(global)?;
            let name = profile_name(global, &cfg);
            let profile = cfg.profiles.entry(name.clone()).or_default();
            set_key(profile, &key, value)?;
            save(&cfg, global)?;
            eprintln!("✓ Set {key} on profile '{name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = super::load_config(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: esolar config init");
            } else {
                let lines: Vec<String> = cfg
                    .profiles
                    .keys()
                    .map(|name| {
                        if name == default {
                            format!("{name} *")
                        } else {
                            name.clone()
                        }
                    })
                    .collect();
                output::print_output(&lines.join("\n"), global.quiet);
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = super::load_config(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save(&cfg, global)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = super::load_config(global)?;
            let name = profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }
            let password = rpassword::prompt_password(format!("Password for '{name}': "))
                .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "cannot be empty".into(),
                });
            }
            esolar_config::store_password(&name, &password)?;
            eprintln!("✓ Password for '{name}' stored in system keyring");
            Ok(())
        }
    }
}

fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "username" => profile.username = value,
        "provider" => {
            if esolar_config::provider_preset(&value).is_none() {
                return Err(CliError::Validation {
                    field: "provider".into(),
                    reason: "must be 'saj' or 'greenheiss'".into(),
                });
            }
            profile.provider = Some(value);
        }
        "provider_host" => profile.provider_host = Some(value),
        "provider_path" => profile.provider_path = Some(value),
        "use_tls" => profile.use_tls = Some(parse_flag("use_tls", &value, "'true' or 'false'")?),
        "verify_tls" => {
            profile.verify_tls = Some(parse_flag("verify_tls", &value, "'true' or 'false'")?);
        }
        "ca_cert" => profile.ca_cert = Some(value.into()),
        "password_env" => profile.password_env = Some(value),
        "variant" => {
            esolar_config::parse_variant(Some(&value))?;
            profile.variant = Some(value);
        }
        "plant_index" => profile.plant_index = parse_flag("plant_index", &value, "a number")?,
        "timeout" => profile.timeout = Some(parse_flag("timeout", &value, "a number (seconds)")?),
        "cycle_timeout" => {
            profile.cycle_timeout =
                Some(parse_flag("cycle_timeout", &value, "a number (seconds)")?);
        }
        "min_refresh_secs" => {
            profile.min_refresh_secs =
                Some(parse_flag("min_refresh_secs", &value, "a number (seconds)")?);
        }
        "relogin_each_cycle" => {
            profile.relogin_each_cycle =
                Some(parse_flag("relogin_each_cycle", &value, "'true' or 'false'")?);
        }
        "stale_grace_secs" => {
            profile.stale_grace_secs =
                Some(parse_flag("stale_grace_secs", &value, "a number (seconds)")?);
        }
        "fields" => {
            profile.fields = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: username, provider, \
                     provider_host, provider_path, use_tls, verify_tls, ca_cert, password_env, \
                     variant, plant_index, timeout, cycle_timeout, min_refresh_secs, \
                     relogin_each_cycle, stale_grace_secs, fields"
                ),
            });
        }
    }
    Ok(())
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_file(global);
    eprintln!("esolar configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = super::load_config(global).unwrap_or_default();

    let name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let portals = &["SAJ (fop.saj-electric.com)", "Greenheiss", "Custom host"];
    let portal = Select::new()
        .with_prompt("Portal")
        .items(portals)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile::default();
    match portal {
        0 => profile.provider = Some("saj".into()),
        1 => profile.provider = Some("greenheiss".into()),
        _ => {
            let host: String = Input::new()
                .with_prompt("Portal host")
                .interact_text()
                .map_err(prompt_err)?;
            let app_path: String = Input::new()
                .with_prompt("Application path")
                .default("saj".into())
                .interact_text()
                .map_err(prompt_err)?;
            profile.provider_host = Some(host);
            profile.provider_path = Some(app_path);
        }
    }

    profile.username = Input::new()
        .with_prompt("Username (email)")
        .interact_text()
        .map_err(prompt_err)?;

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if profile.username.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let variants = &["Inverters only", "H1 hybrid with battery", "SEC meter module"];
    let variant = Select::new()
        .with_prompt("Plant hardware")
        .items(variants)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    profile.variant = Some(match variant {
        1 => "h1".into(),
        2 => "saj_sec".into(),
        _ => "base".into(),
    });

    let keyring = Confirm::new()
        .with_prompt("Store the password in the system keyring?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;
    if keyring {
        esolar_config::store_password(&name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
    } else {
        profile.password = Some(password);
    }

    cfg.profiles.insert(name.clone(), profile);
    cfg.default_profile = Some(name.clone());
    let path = save(&cfg, global)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {name}");
    eprintln!("\n  Test it: esolar login");
    Ok(())
}
