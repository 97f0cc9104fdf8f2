//! End-to-end install runs against a dry-run engine.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use plugsmith::config::InstallConfig;
use plugsmith::engine::DryRunEngineClient;
use plugsmith::plugins::PluginManager;
use plugsmith::{ErrorStatus, PlugsmithError};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn crm_plugin() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "plugin.json",
        r#"{"id":"crm","name":"CRM","version":"2.1.0","author":"ops","license":"MIT",
            "variables":{"region":"eu","seats":5}}"#,
    );
    write(root, "entities/manifest.json", r#"{"target":"entities"}"#);
    write(root, "entities/customers.json", r#"{"id":"customers","pluginScoped":true}"#);

    write(
        root,
        "customers/manifest.json",
        r#"{"target":"customers","dependencies":["roles","roles"]}"#,
    );
    write(
        root,
        "customers/seed.json",
        r#"[{"name":"acme","region":"{{region}}"}, 7, {"name":"globex","seats":"{{seats}}"}]"#,
    );

    write(
        root,
        "roles/manifest.json",
        r#"{"target":"roles","variables":{"tier":"gold"}}"#,
    );
    write(root, "roles/admin.json", r#"{"name":"admin","tier":"{{tier}}","region":"{{region}}"}"#);
    tmp
}

#[tokio::test]
async fn installs_in_dependency_order() {
    let tmp = crm_plugin();
    let client = Arc::new(DryRunEngineClient::new());
    let manager = PluginManager::new(client.clone(), InstallConfig::default());

    let report = manager.install(tmp.path()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.inserted, 5);
    assert_eq!(report.skipped, 1);

    let records = client.records().await;
    let targets: Vec<_> = records.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(
        targets,
        vec!["entities", "roles", "customers", "customers", "plugins"]
    );

    // manifest variables fill what plugin variables leave unresolved
    assert_eq!(
        records[1].1,
        json!({"name": "admin", "tier": "gold", "region": "eu"})
    );
    assert_eq!(records[2].1, json!({"name": "acme", "region": "eu"}));
    // whole-string placeholders keep the variable's type
    assert_eq!(records[3].1, json!({"name": "globex", "seats": 5}));

    let metadata = &records[4].1;
    assert_eq!(metadata["id"], "crm");
    assert_eq!(metadata["version"], "2.1.0");
    assert!(metadata["installed_at"].is_string());
}

#[tokio::test]
async fn missing_dependency_is_rejected_before_install() {
    let tmp = crm_plugin();
    write(
        tmp.path(),
        "orders/manifest.json",
        r#"{"target":"orders","dependencies":["invoices"]}"#,
    );
    write(tmp.path(), "orders/o.json", "{}");

    let client = Arc::new(DryRunEngineClient::new());
    let manager = PluginManager::new(client.clone(), InstallConfig::default());
    let err = manager.install(tmp.path()).await.unwrap_err();

    match &err {
        PlugsmithError::MissingDependency {
            missing,
            referencer,
        } => {
            assert_eq!(missing, "invoices");
            assert_eq!(referencer, "orders");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.status(), ErrorStatus::InputValidation);
    assert!(client.records().await.is_empty());
}

#[tokio::test]
async fn bad_file_does_not_stop_the_rest() {
    let tmp = crm_plugin();
    write(tmp.path(), "roles/broken.json", "{not json");
    write(tmp.path(), "roles/scalar.json", "42");

    let client = Arc::new(DryRunEngineClient::new());
    let manager = PluginManager::new(client.clone(), InstallConfig::default());
    let report = manager.install(tmp.path()).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.target == "roles"));
    assert_eq!(report.inserted, 5);

    let summary = report.to_string();
    assert!(summary.contains("2 failed"));
}

#[tokio::test]
async fn validate_reports_structure_without_records() {
    let tmp = crm_plugin();
    let client = Arc::new(DryRunEngineClient::new());
    let settings = InstallConfig {
        strict: true,
        ..InstallConfig::default()
    };
    let manager = PluginManager::new(client.clone(), settings);

    let wrapper = manager.validate(tmp.path()).await.unwrap();

    assert_eq!(wrapper.id(), "crm");
    assert_eq!(wrapper.content_map.len(), 3);
    assert_eq!(wrapper.file_count(), 3);
    assert_eq!(
        wrapper.get("customers").unwrap().dependencies().to_vec(),
        vec!["roles".to_string()]
    );
    assert!(client.records().await.is_empty());
}
