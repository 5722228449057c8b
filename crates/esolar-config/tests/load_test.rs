#![allow(clippy::unwrap_used)]
// Config file loading and saving against temp files.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use esolar_config::{
    Config, ConfigError, Profile, build_portal_config, load_config_from, save_config_to,
};
use esolar_core::ModuleVariant;

const SAMPLE: &str = r#"
default_profile = "roof"

[defaults]
output = "json"
poll_interval = 120

[profiles.roof]
provider = "greenheiss"
username = "owner@example.com"
password_env = "ROOF_PW"
variant = "h1"
min_refresh_secs = 60

[profiles.barn]
provider_host = "portal.example.com"
provider_path = "/saj/"
username = "barn@example.com"
plant_index = 2
variant = "saj_sec"
fields = ["homeLoadPower", "exportPower"]
"#;

#[test]
fn test_load_profiles_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let cfg = load_config_from(&path).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("roof"));
    assert_eq!(cfg.defaults.output, "json");
    assert_eq!(cfg.defaults.poll_interval, 120);
    // Untouched defaults survive the merge.
    assert_eq!(cfg.defaults.timeout, 30);
    assert_eq!(cfg.defaults.cycle_timeout, 10);

    let (name, roof) = cfg.profile(None).unwrap();
    assert_eq!(name, "roof");
    assert_eq!(roof.provider.as_deref(), Some("greenheiss"));
    assert_eq!(roof.password_env.as_deref(), Some("ROOF_PW"));
    assert_eq!(roof.plant_index, 0);

    let (_, barn) = cfg.profile(Some("barn")).unwrap();
    let portal = build_portal_config(barn, &cfg.defaults, SecretString::from("pw")).unwrap();
    assert_eq!(portal.provider.host(), "portal.example.com");
    assert_eq!(portal.provider.path(), "saj");
    assert_eq!(portal.variant, ModuleVariant::SajSec);
    assert_eq!(portal.plant_index, 2);
    assert_eq!(portal.cycle_timeout, Duration::from_secs(10));
    assert_eq!(
        portal.fields,
        Some(vec!["homeLoadPower".to_owned(), "exportPower".to_owned()])
    );

    assert!(matches!(
        cfg.profile(Some("shed")),
        Err(ConfigError::UnknownProfile { profile }) if profile == "shed"
    ));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.output, "table");
    assert!(cfg.profiles.is_empty());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "default".into(),
        Profile {
            username: "owner@example.com".into(),
            variant: Some("h1".into()),
            stale_grace_secs: Some(600),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let (_, profile) = loaded.profile(None).unwrap();
    assert_eq!(profile.username, "owner@example.com");
    assert_eq!(profile.variant.as_deref(), Some("h1"));
    assert_eq!(profile.stale_grace_secs, Some(600));
    assert_eq!(profile.password, None);
}

#[test]
fn test_invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.roof\nusername = 1").unwrap();

    assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
}
