//! Integration tests for locating a merged property source.

use rcloadenv::auth::StaticToken;
use rcloadenv::client::RuntimeConfigClient;
use rcloadenv::error::RuntimeConfigError;
use rcloadenv::locator::{PROPERTY_SOURCE_NAME, RuntimeConfigLocator, StaticEnvironment};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn locator(server: &MockServer) -> RuntimeConfigLocator {
    let client = RuntimeConfigClient::builder()
        .with_api_root(format!("{}/v1beta1/", server.uri()))
        .with_credentials(StaticToken::new("test-token"))
        .build()
        .unwrap();
    RuntimeConfigLocator::new(client).with_project_id("my-project")
}

async fn mount_config(server: &MockServer, config_name: &str, variables: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/v1beta1/projects/my-project/configs/{}/variables",
            config_name
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "variables": variables })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_profile_wins_on_collision() {
    let server = MockServer::start().await;
    mount_config(
        &server,
        "billing_dev",
        json!([
            {"name": "projects/my-project/configs/billing_dev/variables/db_host", "text": "dev-db"},
            {"name": "projects/my-project/configs/billing_dev/variables/debug", "text": "true"}
        ]),
    )
    .await;
    mount_config(
        &server,
        "billing_common",
        json!([
            {"name": "projects/my-project/configs/billing_common/variables/db_host", "text": "common-db"},
            {"name": "projects/my-project/configs/billing_common/variables/port", "text": "8080"}
        ]),
    )
    .await;

    let env = StaticEnvironment::new()
        .with_property("application.name", "billing")
        .with_profiles(["dev", "common"]);

    let source = locator(&server).locate(&env).await.unwrap();

    assert_eq!(source.name(), PROPERTY_SOURCE_NAME);
    assert_eq!(source.len(), 3);
    assert_eq!(source.get("db_host"), Some("dev-db"));
    assert_eq!(source.get("debug"), Some("true"));
    assert_eq!(source.get("port"), Some("8080"));
}

#[tokio::test]
async fn test_failing_profile_contributes_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta1/projects/my-project/configs/billing_dev/variables"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;
    mount_config(
        &server,
        "billing_common",
        json!([
            {"name": "projects/my-project/configs/billing_common/variables/port", "text": "8080"}
        ]),
    )
    .await;

    let env = StaticEnvironment::new()
        .with_property("application.name", "billing")
        .with_profiles(["dev", "common"]);

    let source = locator(&server).locate(&env).await.unwrap();

    assert_eq!(source.len(), 1);
    assert_eq!(source.get("port"), Some("8080"));
}

#[tokio::test]
async fn test_no_profiles_makes_no_requests() {
    let server = MockServer::start().await;

    Mock::given(path_regex(".*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let env = StaticEnvironment::new().with_property("application.name", "billing");
    let source = locator(&server).locate(&env).await.unwrap();

    assert!(source.is_empty());
}

#[tokio::test]
async fn test_missing_project_fails_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(path_regex(".*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = RuntimeConfigClient::builder()
        .with_api_root(format!("{}/v1beta1/", server.uri()))
        .with_credentials(StaticToken::new("test-token"))
        .build()
        .unwrap();
    let locator = RuntimeConfigLocator::new(client).with_env_lookup(|_| None);

    let env = StaticEnvironment::new()
        .with_property("application.name", "billing")
        .with_profiles(["dev"]);

    let err = locator.locate(&env).await.unwrap_err();
    assert!(matches!(err, RuntimeConfigError::MissingProjectId));
}

#[derive(Debug, Deserialize, PartialEq)]
struct AppConfig {
    db_host: String,
    port: u16,
    timeout_secs: u32,
}

#[tokio::test]
async fn test_bootstrap_file_and_layering() {
    let server = MockServer::start().await;
    mount_config(
        &server,
        "billing_prod",
        json!([
            {"name": "projects/my-project/configs/billing_prod/variables/db_host", "text": "prod-db"},
            {"name": "projects/my-project/configs/billing_prod/variables/port", "value": "OTQ0Mw=="}
        ]),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let bootstrap_path = temp_dir.path().join("bootstrap.yaml");
    fs::write(
        &bootstrap_path,
        r#"
application:
  name: billing
profiles:
  active:
    - prod
"#,
    )
    .unwrap();

    let bootstrap = config::Config::builder()
        .add_source(config::File::from(bootstrap_path.as_path()))
        .build()
        .unwrap();

    let runtime = locator(&server).locate(&bootstrap).await.unwrap();

    let settings: AppConfig = config::Config::builder()
        .set_default("db_host", "localhost")
        .unwrap()
        .set_default("timeout_secs", 30)
        .unwrap()
        .add_source(runtime)
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(
        settings,
        AppConfig {
            db_host: "prod-db".to_string(),
            port: 9443,
            timeout_secs: 30,
        }
    );
}

#[tokio::test]
async fn test_missing_application_name_in_bootstrap() {
    let server = MockServer::start().await;
    let bootstrap = config::Config::builder()
        .set_override("profiles.active", "dev")
        .unwrap()
        .build()
        .unwrap();

    let err = locator(&server).locate(&bootstrap).await.unwrap_err();
    assert!(err.is_misconfiguration());
}
