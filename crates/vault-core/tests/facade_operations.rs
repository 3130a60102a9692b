mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{Harness, PRINCIPAL};
use secrecy::{ExposeSecret, SecretString};
use vaultpair_adapter_memory::StaticCredentialFactory;
use vaultpair_common::{CHANGED_BY_TAG, FINGERPRINT_TAG, content_fingerprint};
use vaultpair_core::{CancellationToken, ListProgress, health_status};
use vaultpair_errors::VaultError;
use vaultpair_ports::{CertificateImport, CertificatePolicy, JsonWebKey};

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

#[tokio::test]
async fn test_get_fails_over_to_secondary() {
    let harness = Harness::new();
    harness.west.put_secret("db-password", "from-west");
    let facade = harness.both().await;

    let record = facade
        .get_secret("db-password", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.value.expose_secret(), "from-west");
    assert_eq!(harness.east.call_count(), 1);
    assert_eq!(harness.west.call_count(), 1);
}

#[tokio::test]
async fn test_get_failing_everywhere_names_both_regions_primary_first() {
    let harness = Harness::new();
    harness.west.fail_all(503);
    let facade = harness.both().await;

    let err = facade
        .get_secret("db-password", None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::RegionAccess { .. }));
    let attempts = err.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].target, harness.east.address());
    assert!(attempts[0].error.is_not_found());
    assert_eq!(attempts[1].target, harness.west.address());
    assert!(matches!(attempts[1].error, VaultError::ExternalService(_)));
}

#[tokio::test]
async fn test_get_specific_version() {
    let harness = Harness::new();
    let first = harness.east.put_secret("db-password", "v1");
    harness.east.put_secret("db-password", "v2");
    let facade = harness.both().await;

    let record = facade
        .get_secret(
            "db-password",
            first.version.as_deref(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(record.value.expose_secret(), "v1");
}

#[tokio::test]
async fn test_set_reports_divergence_then_succeeds_after_secondary_recovers() {
    let harness = Harness::new();
    harness.west.fail_writes(503);
    let facade = harness.both().await;
    let cancel = CancellationToken::new();

    let err = facade
        .set_secret("db-password", &secret("hunter2"), None, None, &cancel)
        .await
        .unwrap_err();
    match &err {
        VaultError::WriteConsistency {
            failures,
            succeeded,
            ..
        } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].target, harness.west.address());
            assert_eq!(succeeded, &vec![harness.east.address().to_string()]);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(harness.west.stored_secret("db-password").is_none());

    harness.west.heal();
    let record = facade
        .set_secret("db-password", &secret("hunter2"), None, None, &cancel)
        .await
        .unwrap();

    assert!(record.id.starts_with(harness.east.address()));
    assert!(harness.west.stored_secret("db-password").is_some());
}

#[tokio::test]
async fn test_set_attaches_fingerprint_and_principal_tags() {
    let harness = Harness::new();
    let facade = harness.both().await;
    let cancel = CancellationToken::new();
    let mut tags = HashMap::new();
    tags.insert("owner".to_string(), "payments".to_string());

    assert!(facade.authenticated_principal().is_none());

    let first = facade
        .set_secret(
            "db-password",
            &secret("hunter2"),
            Some(tags),
            Some("text/plain".to_string()),
            &cancel,
        )
        .await
        .unwrap();
    let second = facade
        .set_secret("other-password", &secret("hunter2"), None, None, &cancel)
        .await
        .unwrap();

    assert_eq!(
        first.tags.get(FINGERPRINT_TAG),
        Some(&content_fingerprint(b"hunter2"))
    );
    assert_eq!(first.tags.get(FINGERPRINT_TAG), second.tags.get(FINGERPRINT_TAG));
    assert_eq!(first.tags.get(CHANGED_BY_TAG).map(String::as_str), Some(PRINCIPAL));
    assert_eq!(first.tags.get("owner").map(String::as_str), Some("payments"));
    assert_eq!(first.content_type.as_deref(), Some("text/plain"));
    assert_eq!(facade.authenticated_principal(), Some(PRINCIPAL));

    let mirrored = harness.west.stored_secret("db-password").unwrap();
    assert_eq!(mirrored.tags, first.tags);
}

#[tokio::test]
async fn test_list_reports_progress_for_every_item_from_one_region() {
    let harness = Harness::new();
    harness.east.set_page_size(3);
    for index in 0..7 {
        harness.east.put_secret(&format!("secret-{}", index), "value");
    }
    harness.west.put_secret("west-only", "value");
    let facade = harness.both().await;

    let seen = Mutex::new(Vec::new());
    let progress: ListProgress<'_> = &|count: usize| seen.lock().unwrap().push(count);

    let items = facade
        .list_secrets(0, Some(progress), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(items.len(), 7);
    assert_eq!(*seen.lock().unwrap(), (1..=7).collect::<Vec<_>>());
    assert_eq!(harness.west.call_count(), 0);
    // Seven items in pages of three.
    assert_eq!(harness.east.call_count(), 3);
}

#[tokio::test]
async fn test_list_secondary_region() {
    let harness = Harness::new();
    harness.west.put_secret("west-only", "value");
    let facade = harness.both().await;

    let items = facade
        .list_secrets(1, None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "west-only");
}

#[tokio::test]
async fn test_list_unconfigured_region_is_rejected_before_io() {
    let harness = Harness::new();
    let facade = harness.connect(&["contoso-east"]).await;

    let err = facade
        .list_secrets(1, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VaultError::RegionIndexOutOfRange {
            index: 1,
            configured: 1
        }
    ));
    assert_eq!(harness.east.call_count(), 0);
}

#[tokio::test]
async fn test_list_versions() {
    let harness = Harness::new();
    harness.east.set_page_size(1);
    for value in ["v1", "v2", "v3"] {
        harness.east.put_secret("db-password", value);
    }
    let facade = harness.both().await;

    let versions = facade
        .list_secret_versions("db-password", 0, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(versions.len(), 3);
    assert!(versions.iter().all(|v| v.name == "db-password"));
}

#[tokio::test]
async fn test_delete_returns_primary_record_after_polling() {
    let harness = Harness::new();
    harness.east.put_secret("db-password", "v1");
    harness.west.put_secret("db-password", "v1");
    harness.east.set_delete_polls(2);
    let facade = harness.both().await;

    let deleted = facade
        .delete_secret("db-password", &CancellationToken::new())
        .await
        .unwrap();

    assert!(deleted.record.id.starts_with(harness.east.address()));
    assert!(deleted.scheduled_purge_date.is_some());
    assert_eq!(
        deleted.recovery_id.as_deref(),
        Some("https://contoso-east.vault.azure.net/deletedsecrets/db-password")
    );
    assert_eq!(harness.east.delete_poll_count(), 3);
    assert_eq!(harness.west.delete_poll_count(), 0);
    assert!(harness.west.deleted_secret("db-password").is_some());
}

#[tokio::test]
async fn test_delete_fails_when_secondary_cannot_start() {
    let harness = Harness::new();
    harness.east.put_secret("db-password", "v1");
    harness.west.put_secret("db-password", "v1");
    harness.west.fail_writes(403);
    let facade = harness.both().await;

    let err = facade
        .delete_secret("db-password", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        VaultError::WriteConsistency { failures, .. } => {
            assert!(matches!(failures[0].error, VaultError::Forbidden(_)));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_fan_out_write() {
    let harness = Harness::new();
    let facade = harness.both().await;
    harness.west.set_latency(Duration::from_secs(60));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = facade
        .set_secret("db-password", &secret("hunter2"), None, None, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(harness.west.stored_secret("db-password").is_none());
}

#[tokio::test]
async fn test_already_cancelled_token_short_circuits() {
    let harness = Harness::new();
    harness.east.put_secret("db-password", "v1");
    let facade = harness.both().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = facade
        .get_secret("db-password", None, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(harness.east.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_principal_established_once_under_concurrent_writes() {
    let harness = Harness::with_factory(
        StaticCredentialFactory::new(PRINCIPAL).with_principal_delay(Duration::from_millis(50)),
    );
    let facade = Arc::new(harness.both().await);

    let mut handles = Vec::new();
    for index in 0..8 {
        let facade = Arc::clone(&facade);
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let name = format!("secret-{}", index);
            if index % 2 == 0 {
                facade
                    .set_secret(&name, &secret("value"), None, None, &cancel)
                    .await
                    .map(|record| record.tags)
            } else {
                let key = JsonWebKey {
                    kty: "oct".to_string(),
                    k: Some(vec![index as u8; 32]),
                    ..Default::default()
                };
                facade
                    .set_key(&name, &key, None, &cancel)
                    .await
                    .map(|record| record.tags)
            }
        }));
    }

    for handle in handles {
        let tags = handle.await.unwrap().unwrap();
        assert_eq!(tags.get(CHANGED_BY_TAG).map(String::as_str), Some(PRINCIPAL));
    }
    assert_eq!(harness.factory.principal_lookups(), 1);
    assert_eq!(facade.authenticated_principal(), Some(PRINCIPAL));
}

#[tokio::test]
async fn test_key_round_trip_hides_private_material() {
    let harness = Harness::new();
    let facade = harness.both().await;
    let cancel = CancellationToken::new();
    let key = JsonWebKey {
        kty: "RSA".to_string(),
        n: Some(vec![0xc0, 0xff, 0xee]),
        e: Some(vec![1, 0, 1]),
        d: Some(vec![0x5e, 0xc7]),
        ..Default::default()
    };

    let written = facade.set_key("signing", &key, None, &cancel).await.unwrap();
    assert!(written.key.d.is_none());
    assert_eq!(
        written.tags.get(FINGERPRINT_TAG),
        Some(&content_fingerprint(&fingerprint_input(&key)))
    );

    let read = facade.get_key("signing", None, &cancel).await.unwrap();
    assert_eq!(read.key.n, key.n);

    let listed = facade.list_keys(1, None, &cancel).await.unwrap();
    assert_eq!(listed.len(), 1);

    let versions = facade
        .list_key_versions("signing", 0, &cancel)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);

    let deleted = facade.delete_key("signing", &cancel).await.unwrap();
    assert_eq!(deleted.record.name, "signing");
}

fn fingerprint_input(key: &JsonWebKey) -> Vec<u8> {
    use vaultpair_ports::WriteValue;
    key.fingerprint_bytes().into_owned()
}

#[tokio::test]
async fn test_certificate_operations() {
    let harness = Harness::new();
    let facade = harness.both().await;
    let cancel = CancellationToken::new();
    let import = CertificateImport::new(b"-----BEGIN CERTIFICATE-----".to_vec()).with_policy(
        CertificatePolicy {
            subject: Some("CN=api.contoso.com".to_string()),
            content_type: Some("application/x-pem-file".to_string()),
            ..Default::default()
        },
    );

    let written = facade
        .set_certificate("api-tls", &import, None, None, &cancel)
        .await
        .unwrap();
    assert_eq!(
        written.tags.get(FINGERPRINT_TAG),
        Some(&content_fingerprint(b"-----BEGIN CERTIFICATE-----"))
    );
    assert_eq!(written.content_type.as_deref(), Some("application/x-pem-file"));
    assert!(harness.west.stored_certificate("api-tls").is_some());

    harness.east.fail_all(500);
    let read = facade
        .get_certificate("api-tls", None, &cancel)
        .await
        .unwrap();
    assert!(read.id.starts_with(harness.west.address()));
    harness.east.heal();

    let listed = facade.list_certificates(0, None, &cancel).await.unwrap();
    assert_eq!(listed.len(), 1);
    let versions = facade
        .list_certificate_versions("api-tls", 1, &cancel)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);

    let deleted = facade
        .delete_certificate("api-tls", &cancel)
        .await
        .unwrap();
    assert!(deleted.record.policy.is_some());
}

#[tokio::test]
async fn test_health_reports_each_region() {
    let harness = Harness::new();
    harness.west.fail_all(503);
    let facade = harness.both().await;

    let regions = facade
        .check_health(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(regions.len(), 2);
    assert!(regions[0].accessible);
    assert_eq!(regions[0].region, harness.east.address());
    assert!(!regions[1].accessible);

    let status = health_status(&regions);
    assert!(!status.healthy);
    assert_eq!(status.healthy_count(), 1);
}

#[tokio::test]
async fn test_single_region_set_and_delete() {
    let harness = Harness::new();
    let facade = harness.connect(&["contoso-east"]).await;
    let cancel = CancellationToken::new();

    let written = facade
        .set_secret("db-password", &secret("hunter2"), None, None, &cancel)
        .await
        .unwrap();
    assert!(written.id.starts_with(harness.east.address()));
    assert_eq!(
        written.tags.get(FINGERPRINT_TAG),
        Some(&content_fingerprint(b"hunter2"))
    );

    let deleted = facade.delete_secret("db-password", &cancel).await.unwrap();
    assert_eq!(deleted.record.id, written.id);
    assert!(harness.east.deleted_secret("db-password").is_some());
    assert_eq!(harness.west.call_count(), 0);
}

#[tokio::test]
async fn test_delete_reports_primary_poll_failure() {
    let harness = Harness::new();
    harness.east.put_secret("db-password", "v1");
    harness.west.put_secret("db-password", "v1");
    harness.east.set_delete_polls(1);
    harness.east.fail_delete_polls(503);
    let facade = harness.both().await;

    let err = facade
        .delete_secret("db-password", &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        VaultError::WriteConsistency {
            operation,
            failures,
            succeeded,
            ..
        } => {
            assert_eq!(operation, "delete");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].target, harness.east.address());
            assert!(matches!(failures[0].error, VaultError::ExternalService(_)));
            assert_eq!(succeeded, &vec![harness.west.address().to_string()]);
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(harness.east.delete_poll_count(), 1);
    assert_eq!(harness.west.delete_poll_count(), 0);
}
