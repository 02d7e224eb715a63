#![cfg(test)]

use serde_json::json;
use tempfile::tempdir;

use super::common::{new_trace, setup_host, AuthPlugin, BillingPlugin, CorePlugin, Ledger, TokenIssuer};
use crate::host::{Method, Request};
use crate::kernel::bootstrap::{HostSettings, PluginHost};
use crate::plugin_system::lifecycle::LifecycleState;
use crate::plugin_system::resolver::ResolutionResult;
use crate::storage::StaticConfigSource;

#[tokio::test]
async fn test_core_auth_billing_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let trace = new_trace();
    let host = setup_host(HostSettings::default().with_base_dir(temp_dir.path()), &trace);

    let report = host.start().await.expect("load attempt");

    assert_eq!(report.plan.order, vec!["core", "auth", "billing"]);
    assert_eq!(report.activated, vec!["core", "auth", "billing"]);
    assert!(report.is_clean());
    for name in ["core", "auth", "billing"] {
        assert_eq!(report.lifecycle.state(name), Some(&LifecycleState::Active));
    }

    let trace = trace.lock().unwrap();
    assert_eq!(
        *trace,
        vec![
            "core:services",
            "core:pipeline",
            "core:routes",
            "auth:services",
            "auth:pipeline",
            "auth:routes",
            "billing:services",
            "billing:pipeline",
            "billing:routes",
        ]
    );
}

#[tokio::test]
async fn test_dependents_resolve_services_of_their_dependencies() {
    let temp_dir = tempdir().unwrap();
    let trace = new_trace();
    let host = setup_host(HostSettings::default().with_base_dir(temp_dir.path()), &trace);

    let report = host.start().await.unwrap();
    let services = &report.host.services;

    let issuer = services.get::<TokenIssuer>().unwrap();
    assert_eq!(issuer.issuer, "tessera");
    assert_eq!(issuer.epoch, 1000);

    let ledger = services.get::<Ledger>().unwrap();
    assert_eq!(ledger.path, temp_dir.path().join("data").join("billing").join("ledger.db"));
    assert_eq!(ledger.issuer, "tessera");
}

#[tokio::test]
async fn test_routes_and_management_groups() {
    let trace = new_trace();
    let host = setup_host(HostSettings::default(), &trace);
    let report = host.start_with(&StaticConfigSource::new()).await.unwrap();
    let served = &report.host;

    // core does not use auto prefixing
    assert_eq!(served.handle(&Request::get("/version")).status, 200);
    assert_eq!(served.handle(&Request::get("/core/version")).status, 404);

    // auth and billing do
    assert_eq!(
        served.handle(&Request::new(Method::Post, "/auth/token")).body,
        json!({ "token": "t-1" })
    );
    assert_eq!(served.handle(&Request::get("/billing/invoices")).status, 200);

    // Default management handlers for core and billing, custom ones for auth
    for name in ["core", "billing"] {
        let response = served.handle(&Request::get(&format!("/manage/{}", name)));
        assert_eq!(response.body["status"], json!("Not Applicable"), "{}", name);
    }
    assert_eq!(
        served.handle(&Request::get("/manage/auth")).body,
        json!({ "status": "ok", "sessions": 0 })
    );
    let revoke = Request::new(Method::Post, "/manage/auth/revoke").with_body(json!("t-1"));
    assert_eq!(served.handle(&revoke).body, json!({ "revoked": "t-1" }));

    assert_eq!(served.pipeline.layer_names(), vec!["request-id"]);
}

#[tokio::test]
async fn test_core_out_of_range_takes_dependents_down() {
    let trace = new_trace();
    let mut host = PluginHost::new(HostSettings::default());
    host.register_plugin(std::sync::Arc::new(CorePlugin::new("2.0.0", trace.clone())))
        .unwrap();
    host.register_plugin(std::sync::Arc::new(AuthPlugin::new("[1.0,2.0)", trace.clone())))
        .unwrap();
    host.register_plugin(std::sync::Arc::new(BillingPlugin::new(trace.clone())))
        .unwrap();

    let report = host.start_with(&StaticConfigSource::new()).await.unwrap();
    assert_eq!(report.activated, vec!["core"]);
    assert!(matches!(
        report.plan.result("auth"),
        Some(ResolutionResult::RejectedVersionMismatch { .. })
    ));
    assert!(matches!(
        report.plan.result("billing"),
        Some(ResolutionResult::RejectedMissingDependency { .. })
    ));
    assert!(!trace.lock().unwrap().iter().any(|entry| entry.starts_with("auth:")));
}

#[tokio::test]
async fn test_missing_service_fails_only_the_dependent() {
    // billing without auth: stage one rejects it before any callback runs
    let trace = new_trace();
    let mut host = PluginHost::new(HostSettings::default());
    host.register_plugin(std::sync::Arc::new(CorePlugin::new("1.5.0", trace.clone())))
        .unwrap();
    host.register_plugin(std::sync::Arc::new(BillingPlugin::new(trace.clone())))
        .unwrap();

    let report = host.start_with(&StaticConfigSource::new()).await.unwrap();
    assert_eq!(report.activated, vec!["core"]);
    assert_eq!(report.failed().len(), 1);
    assert!(report.failed()[0].1.contains("auth"));
}

#[tokio::test]
async fn test_repeated_load_attempts_are_deterministic() {
    let trace = new_trace();
    let host = setup_host(HostSettings::default(), &trace);
    let first = host.start_with(&StaticConfigSource::new()).await.unwrap();
    let second = host.start_with(&StaticConfigSource::new()).await.unwrap();
    assert_eq!(first.plan, second.plan);
    assert_eq!(first.activated, second.activated);
    assert_eq!(first.lifecycle, second.lifecycle);
}
