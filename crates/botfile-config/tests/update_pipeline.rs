use std::fs;
use std::path::{Path, PathBuf};

use assert_json_diff::assert_json_eq;
use botfile_config::patcher::{APP_INSIGHTS, ENDPOINT, GENERIC};
use botfile_config::{
    ArgumentSet, BotFileError, Document, DocumentStore, FileStore, OverlaySource, SecretKey,
    Service, ServiceField, UpdateRequest, VariantDescriptor, run_update,
};
use serde_json::{Value, json};
use tempfile::TempDir;

fn fixture() -> Value {
    json!({
        "name": "echo",
        "description": "",
        "services": [
            {
                "type": "endpoint",
                "id": "1",
                "name": "production",
                "appId": "",
                "appPassword": "pw-1",
                "endpoint": "https://x.test/api"
            },
            {
                "type": "appInsights",
                "id": "2",
                "name": "telemetry",
                "tenantId": "tenant",
                "subscriptionId": "sub",
                "resourceGroup": "rg",
                "serviceName": "echo-insights",
                "instrumentationKey": "ikey",
                "applicationId": "app",
                "apiKeys": {"read": "r-1"}
            },
            {
                "type": "generic",
                "id": "3",
                "name": "docs",
                "url": "https://docs.test",
                "configuration": {"a": "1"}
            },
            {
                "type": "luis",
                "id": "4",
                "appId": "luis-app"
            }
        ],
        "padlock": "",
        "version": "2.0"
    })
}

/// Keys in the order msbot itself writes them
fn msbot_fixture() -> Value {
    json!({
        "name": "echo",
        "services": [
            {
                "type": "endpoint",
                "name": "production",
                "endpoint": "https://x.test/api",
                "appId": "",
                "appPassword": "pw-1",
                "id": "1"
            },
            {
                "name": "docs",
                "type": "generic",
                "url": "https://docs.test",
                "configuration": {"z": "26", "a": "1"},
                "id": "3"
            },
            {
                "type": "appInsights",
                "tenantId": "tenant",
                "subscriptionId": "sub",
                "resourceGroup": "rg",
                "serviceName": "echo-insights",
                "name": "telemetry",
                "instrumentationKey": "ikey",
                "applicationId": "app",
                "apiKeys": {},
                "id": "2"
            }
        ],
        "description": "",
        "padlock": "",
        "version": "2.0"
    })
}

fn write_bot(dir: &Path, value: &Value) -> PathBuf {
    let path = dir.join("echo.bot");
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn request(dir: &Path, variant: &'static VariantDescriptor, flags: ArgumentSet) -> UpdateRequest {
    UpdateRequest {
        variant,
        bot: None,
        working_dir: dir.to_path_buf(),
        secret: None,
        flags,
        overlay: None,
    }
}

fn service_json(service: &Service) -> Value {
    serde_json::to_value(service).unwrap()
}

fn stored_service(path: &Path, index: usize) -> Value {
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    doc["services"][index].clone()
}

#[tokio::test]
async fn endpoint_name_update_scenario() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());

    let flags = ArgumentSet::new()
        .with("endpoint", "https://x.test/api")
        .with("name", "Prod");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();

    assert!(outcome.persisted);
    assert_eq!(outcome.path, path);

    let mut expected = fixture()["services"][0].clone();
    expected["name"] = json!("Prod");
    assert_json_eq!(service_json(&outcome.service), expected.clone());
    assert_json_eq!(stored_service(&path, 0), expected);
}

#[tokio::test]
async fn endpoint_not_found_scenario() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let before = fs::read_to_string(&path).unwrap();

    let flags = ArgumentSet::new().with("endpoint", "https://not-present.test");
    let err = run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap_err();

    assert!(matches!(err, BotFileError::ServiceNotFound { .. }));
    assert_eq!(
        err.to_string(),
        "Endpoint Service https://not-present.test was not found"
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn repeated_update_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let flags = ArgumentSet::new()
        .with("serviceName", "echo-insights")
        .with("instrumentationKey", "new-key")
        .with("keys", r#"{"write": "w-1"}"#);

    let first = run_update(
        &FileStore::new(),
        request(dir.path(), &APP_INSIGHTS, flags.clone()),
    )
    .await
    .unwrap();
    let after_first = stored_service(&path, 1);

    let second = run_update(&FileStore::new(), request(dir.path(), &APP_INSIGHTS, flags))
        .await
        .unwrap();

    assert_eq!(
        first.service.to_pretty_json().unwrap(),
        second.service.to_pretty_json().unwrap()
    );
    assert_json_eq!(stored_service(&path, 1), after_first);
    assert_eq!(after_first["apiKeys"], json!({"write": "w-1"}));
}

#[tokio::test]
async fn empty_values_respect_presence_rules() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());

    let flags = ArgumentSet::new()
        .with("endpoint", "https://x.test/api")
        .with("name", "")
        .with("appPassword", "")
        .with("appId", "");
    run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();

    let stored = stored_service(&path, 0);
    assert_eq!(stored["name"], json!(""));
    assert_eq!(stored["appPassword"], json!("pw-1"));
    assert_eq!(stored["appId"], json!(""));
}

#[tokio::test]
async fn only_first_duplicate_is_patched() {
    let dir = TempDir::new().unwrap();
    let mut doc = fixture();
    let duplicate = doc["services"][0].clone();
    doc["services"].as_array_mut().unwrap().push(duplicate);
    let path = write_bot(dir.path(), &doc);

    let flags = ArgumentSet::new()
        .with("endpoint", "https://x.test/api")
        .with("name", "renamed");
    run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();

    assert_eq!(stored_service(&path, 0)["name"], json!("renamed"));
    assert_eq!(stored_service(&path, 4)["name"], json!("production"));
}

#[tokio::test]
async fn generic_mapping_is_replaced_not_merged() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());

    let flags = ArgumentSet::new()
        .with("url", "https://docs.test")
        .with("keys", r#"{"b": "2"}"#);
    let outcome = run_update(&FileStore::new(), request(dir.path(), &GENERIC, flags))
        .await
        .unwrap();

    assert!(outcome.persisted);
    assert_eq!(stored_service(&path, 2)["configuration"], json!({"b": "2"}));
}

#[tokio::test]
async fn generic_without_keys_is_not_saved() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let before = fs::read_to_string(&path).unwrap();

    let flags = ArgumentSet::new()
        .with("url", "https://docs.test")
        .with("name", "renamed");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &GENERIC, flags))
        .await
        .unwrap();

    assert!(!outcome.persisted);
    assert_eq!(outcome.service.name(), Some("docs"));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn discriminator_only_patch_round_trips_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let before = fs::read_to_string(&path).unwrap();

    let flags = ArgumentSet::new().with("endpoint", "https://x.test/api");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();

    assert!(outcome.updated.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn msbot_ordered_document_round_trips_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &msbot_fixture());
    let before = fs::read_to_string(&path).unwrap();

    let flags = ArgumentSet::new().with("endpoint", "https://x.test/api");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();
    assert!(outcome.persisted);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);

    let flags = ArgumentSet::new()
        .with("url", "https://docs.test")
        .with("keys", r#"{"z": "26", "a": "1"}"#);
    let outcome = run_update(&FileStore::new(), request(dir.path(), &GENERIC, flags))
        .await
        .unwrap();
    assert!(outcome.persisted);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn msbot_ordered_entry_keeps_key_order_when_patched() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &msbot_fixture());

    let flags = ArgumentSet::new()
        .with("endpoint", "https://x.test/api")
        .with("name", "Prod");
    run_update(&FileStore::new(), request(dir.path(), &ENDPOINT, flags))
        .await
        .unwrap();

    let mut expected = msbot_fixture();
    expected["services"][0]["name"] = json!("Prod");
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        serde_json::to_string_pretty(&expected).unwrap()
    );
}

#[tokio::test]
async fn empty_keys_leave_app_insights_keys_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());

    let flags = ArgumentSet::new()
        .with("serviceName", "echo-insights")
        .with("name", "renamed")
        .with("keys", "");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &APP_INSIGHTS, flags))
        .await
        .unwrap();

    assert!(outcome.persisted);
    assert_eq!(outcome.updated, vec![ServiceField::Name]);
    let stored = stored_service(&path, 1);
    assert_eq!(stored["name"], json!("renamed"));
    assert_eq!(stored["apiKeys"], json!({"read": "r-1"}));
}

#[tokio::test]
async fn empty_keys_do_not_persist_generic() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let before = fs::read_to_string(&path).unwrap();

    let flags = ArgumentSet::new()
        .with("url", "https://docs.test")
        .with("name", "renamed")
        .with("keys", "");
    let outcome = run_update(&FileStore::new(), request(dir.path(), &GENERIC, flags))
        .await
        .unwrap();

    assert!(!outcome.persisted);
    assert_eq!(outcome.service.name(), Some("docs"));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn malformed_secret_fails_at_load_for_plaintext_document() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let before = fs::read_to_string(&path).unwrap();

    let mut req = request(
        dir.path(),
        &ENDPOINT,
        ArgumentSet::new().with("endpoint", "https://nope.test"),
    );
    req.secret = Some("garbage!".into());
    let err = run_update(&FileStore::new(), req).await.unwrap_err();

    assert!(matches!(err, BotFileError::BadSecret(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn sealed_document_round_trips_modulo_resealing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo.bot");
    let secret = SecretKey::generate();
    let store = FileStore::new();

    let document = Document::from_json(&fixture().to_string()).unwrap();
    store.save(&document, &path, Some(&secret)).await.unwrap();
    let sealed_before = fs::read_to_string(&path).unwrap();
    assert!(!sealed_before.contains("pw-1"));

    let mut req = request(
        dir.path(),
        &ENDPOINT,
        ArgumentSet::new().with("endpoint", "https://x.test/api"),
    );
    req.secret = Some(secret.clone());
    let outcome = run_update(&store, req).await.unwrap();

    // output carries the unsealed entry
    assert_eq!(service_json(&outcome.service)["appPassword"], json!("pw-1"));

    let sealed_after = fs::read_to_string(&path).unwrap();
    assert_ne!(sealed_after, sealed_before);

    let reloaded = store.load(&path, Some(&secret)).await.unwrap();
    assert_eq!(reloaded.services, document.services);
    assert_eq!(reloaded.name, document.name);
}

#[tokio::test]
async fn wrong_secret_aborts_before_any_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo.bot");
    let store = FileStore::new();
    let document = Document::from_json(&fixture().to_string()).unwrap();
    store
        .save(&document, &path, Some(&SecretKey::generate()))
        .await
        .unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let mut req = request(
        dir.path(),
        &ENDPOINT,
        ArgumentSet::new()
            .with("endpoint", "https://x.test/api")
            .with("name", "x"),
    );
    req.secret = Some(SecretKey::generate());
    let err = run_update(&store, req).await.unwrap_err();

    assert!(matches!(err, BotFileError::BadSecret(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn input_file_overlay_supplies_arguments() {
    let dir = TempDir::new().unwrap();
    let path = write_bot(dir.path(), &fixture());
    let input = dir.path().join("args.json");
    fs::write(
        &input,
        r#"{"endpoint": "https://x.test/api", "appPassword": "pw-2"}"#,
    )
    .unwrap();

    let mut req = request(
        dir.path(),
        &ENDPOINT,
        ArgumentSet::new().with("name", "from-flag"),
    );
    req.bot = Some(path.clone());
    req.overlay = Some(OverlaySource::File(input));
    run_update(&FileStore::new(), req).await.unwrap();

    let stored = stored_service(&path, 0);
    assert_eq!(stored["name"], json!("from-flag"));
    assert_eq!(stored["appPassword"], json!("pw-2"));
}

#[tokio::test]
async fn invalid_endpoint_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_bot(dir.path(), &fixture());

    let err = run_update(
        &FileStore::new(),
        request(
            dir.path(),
            &ENDPOINT,
            ArgumentSet::new().with("endpoint", "x.test/api"),
        ),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "--endpoint x.test/api is not a valid url");
}

#[tokio::test]
async fn missing_discriminator_is_reported() {
    let dir = TempDir::new().unwrap();
    write_bot(dir.path(), &fixture());

    let err = run_update(
        &FileStore::new(),
        request(dir.path(), &APP_INSIGHTS, ArgumentSet::new().with("name", "x")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BotFileError::MissingArgument(_)));
}

#[tokio::test]
async fn no_bot_file_in_directory() {
    let dir = TempDir::new().unwrap();
    let err = run_update(
        &FileStore::new(),
        request(
            dir.path(),
            &GENERIC,
            ArgumentSet::new().with("url", "https://docs.test"),
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BotFileError::ConfigNotFound(_)));
}
