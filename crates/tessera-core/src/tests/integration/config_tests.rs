#![cfg(test)]

use std::fs;

use tempfile::tempdir;

use super::common::{new_trace, setup_host, TokenIssuer};
use crate::kernel::bootstrap::HostSettings;
use crate::plugin_system::lifecycle::LifecycleState;

#[tokio::test]
async fn test_plugin_config_file_overrides_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("auth.json"), r#"{ "issuer": "example.org" }"#).unwrap();

    let trace = new_trace();
    let host = setup_host(HostSettings::default().with_base_dir(temp_dir.path()), &trace);
    let report = host.start().await.unwrap();

    let issuer = report.host.services.get::<TokenIssuer>().unwrap();
    assert_eq!(issuer.issuer, "example.org");
    // core's defaults were materialized, auth's file left alone
    assert!(config_dir.join("core.json").is_file());
    assert_eq!(
        fs::read_to_string(config_dir.join("auth.json")).unwrap(),
        r#"{ "issuer": "example.org" }"#
    );
}

#[tokio::test]
async fn test_broken_config_fails_plugin_at_service_registration() {
    let temp_dir = tempdir().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("auth.json"), "{ broken").unwrap();

    let trace = new_trace();
    let host = setup_host(HostSettings::default().with_base_dir(temp_dir.path()), &trace);
    let report = host.start().await.unwrap();

    assert_eq!(report.activated, vec!["core"]);
    match report.lifecycle.state("auth") {
        Some(LifecycleState::Failed(reason)) => {
            assert!(reason.contains("register_services"), "reason: {}", reason)
        }
        other => panic!("unexpected state: {:?}", other),
    }
    // billing is downstream of auth and fails on the missing service
    match report.lifecycle.state("billing") {
        Some(LifecycleState::Failed(reason)) => {
            assert!(reason.contains("token issuer"), "reason: {}", reason)
        }
        other => panic!("unexpected state: {:?}", other),
    }
    assert!(!trace.lock().unwrap().contains(&"auth:services".to_string()));
}

#[tokio::test]
async fn test_custom_config_dir_from_settings_file() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("tessera.json");
    fs::write(
        &settings_path,
        format!(
            r#"{{ "base_dir": {:?}, "config_dir": "etc", "write_default_configs": false }}"#,
            temp_dir.path().display().to_string()
        ),
    )
    .unwrap();
    fs::create_dir_all(temp_dir.path().join("etc")).unwrap();
    fs::write(temp_dir.path().join("etc").join("core.json"), r#"{ "epoch": 42 }"#).unwrap();

    let settings = HostSettings::from_file(&settings_path).unwrap();
    assert_eq!(settings.config_dir(), temp_dir.path().join("etc"));

    let trace = new_trace();
    let report = setup_host(settings, &trace).start().await.unwrap();
    assert_eq!(report.host.services.get::<TokenIssuer>().unwrap().epoch, 42);
    assert!(!temp_dir.path().join("config").exists());
}
