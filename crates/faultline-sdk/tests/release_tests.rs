//! Integration tests for releasing versions to services and unbinding them

mod common;

use common::{filters, release_request, target_request, Fixture, NAMESPACE, SERVICES};
use faultline_core::{RuleVersion, ServiceRef};
use faultline_sdk::{ReleaseRequest, ResultCode, RuleRequest, ServiceTarget};

// ============================================================================
// Release
// ============================================================================

#[tokio::test]
async fn test_release_binds_version() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("rel").await;
    let v1 = fixture.create_version(&master, "v1").await;

    let response = fixture.release(&v1, SERVICES[0]).await;
    assert_eq!(response.code, ResultCode::ExecuteSuccess, "{}", response.info);
    let release = response.responses[0].data.clone().unwrap();
    assert_eq!(release.rule, v1.key());
    assert_eq!(release.service, ServiceRef::new(SERVICES[0], NAMESPACE));

    let versions = fixture
        .service
        .get_versions(&filters(&[("id", master.id.as_str())]))
        .await;
    assert_eq!(versions.size, 1);
    assert_eq!(
        versions.items[0].services,
        vec![ServiceRef::new(SERVICES[0], NAMESPACE)]
    );
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("idem").await;
    let v1 = fixture.create_version(&master, "v1").await;

    assert!(fixture.release(&v1, SERVICES[0]).await.responses[0].data.is_some());
    let again = fixture.release(&v1, SERVICES[0]).await;
    assert_eq!(again.code, ResultCode::ExecuteSuccess);
    assert!(again.responses[0].data.is_none());

    let history = fixture
        .service
        .get_release_history(&filters(&[("id", master.id.as_str())]))
        .await;
    assert_eq!(history.amount, 1);
}

#[tokio::test]
async fn test_release_master_rejected() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("head").await;

    let response = fixture.release(&master, SERVICES[0]).await;
    assert_eq!(response.code, ResultCode::InvalidRuleVersion);
}

#[tokio::test]
async fn test_release_unknown_service() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("lonely").await;
    let v1 = fixture.create_version(&master, "v1").await;

    let response = fixture.release(&v1, "NoSuchService").await;
    assert_eq!(response.code, ResultCode::NotFoundService);

    let request = ReleaseRequest::new(ServiceTarget::default(), target_request(&v1));
    let response = fixture.service.release_rules(&[request]).await;
    assert_eq!(response.code, ResultCode::InvalidParameter);
}

#[tokio::test]
async fn test_release_service_registered_later() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("late").await;
    let v1 = fixture.create_version(&master, "v1").await;

    assert_eq!(
        fixture.release(&v1, "Newcomer").await.code,
        ResultCode::NotFoundService
    );
    fixture.directory.register(ServiceRef::new("Newcomer", NAMESPACE));
    assert_eq!(
        fixture.release(&v1, "Newcomer").await.code,
        ResultCode::ExecuteSuccess
    );
}

#[tokio::test]
async fn test_release_unknown_version() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("missingVersion").await;

    let request = ReleaseRequest::new(
        ServiceTarget::new(SERVICES[0], NAMESPACE),
        RuleRequest::by_id(&master.id)
            .with_version("v404")
            .with_token(&master.token),
    );
    let response = fixture.service.release_rules(&[request]).await;
    assert_eq!(response.code, ResultCode::NotFoundResource);
}

#[tokio::test]
async fn test_release_wrong_token() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("secured").await;
    fixture.create_version(&master, "v1").await;

    let request = ReleaseRequest::new(
        ServiceTarget::new(SERVICES[0], NAMESPACE),
        RuleRequest::by_id(&master.id)
            .with_version("v1")
            .with_token("forged"),
    );
    let response = fixture.service.release_rules(&[request]).await;
    assert_eq!(response.code, ResultCode::Unauthorized);
}

#[tokio::test]
async fn test_release_to_many_services() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("wide").await;
    let v1 = fixture.create_version(&master, "v1").await;

    let requests: Vec<_> = SERVICES
        .iter()
        .map(|service| release_request(&v1, service))
        .collect();
    let response = fixture.service.release_rules(&requests).await;
    assert_eq!(response.code, ResultCode::ExecuteSuccess);
    assert_eq!(response.size, 3);

    let history = fixture
        .service
        .get_release_history(&filters(&[("id", master.id.as_str()), ("version", "v1")]))
        .await;
    assert_eq!(history.amount, 3);
    assert!(history.items.iter().all(|item| item.rule.token.is_empty()));
}

// ============================================================================
// Unbind
// ============================================================================

#[tokio::test]
async fn test_unbind_removes_binding() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("unbind").await;
    let v1 = fixture.create_version(&master, "v1").await;
    fixture.release(&v1, SERVICES[0]).await;

    let response = fixture.unbind(&v1, SERVICES[0]).await;
    assert_eq!(response.code, ResultCode::ExecuteSuccess);

    let bound = fixture
        .service
        .resolve_for_service(&ServiceRef::new(SERVICES[0], NAMESPACE))
        .await
        .unwrap();
    assert!(bound.is_empty());
}

#[tokio::test]
async fn test_unbind_never_bound_succeeds() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("neverBound").await;
    let v1 = fixture.create_version(&master, "v1").await;

    let response = fixture.unbind(&v1, SERVICES[1]).await;
    assert_eq!(response.code, ResultCode::ExecuteSuccess);
}

#[tokio::test]
async fn test_unbind_master_not_found() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("unbindHead").await;

    let response = fixture.unbind(&master, SERVICES[0]).await;
    assert_eq!(response.code, ResultCode::NotFoundResource);
}

#[tokio::test]
async fn test_unbind_unknown_service() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("unbindGhost").await;
    let v1 = fixture.create_version(&master, "v1").await;

    let response = fixture.unbind(&v1, "Ghost").await;
    assert_eq!(response.code, ResultCode::NotFoundService);
}

#[tokio::test]
async fn test_unbind_deleted_version_not_found() {
    let fixture = Fixture::new().await;
    let master = fixture.create_rule("unbindDeleted").await;
    let v1 = fixture.create_version(&master, "v1").await;
    fixture
        .service
        .delete_rules(&[target_request(&v1)])
        .await;

    let response = fixture.unbind(&v1, SERVICES[0]).await;
    assert_eq!(response.code, ResultCode::NotFoundResource);
}

// ============================================================================
// Lookups by service
// ============================================================================

#[tokio::test]
async fn test_get_by_service_lists_released_versions() {
    let fixture = Fixture::new().await;
    let first = fixture.create_rule("first").await;
    let second = fixture.create_rule("second").await;
    let first_v1 = fixture.create_version(&first, "v1").await;
    let second_v1 = fixture.create_version(&second, "v1").await;
    let second_v2 = fixture.create_version(&second, "v2").await;

    fixture.release(&first_v1, SERVICES[0]).await;
    fixture.release(&second_v1, SERVICES[0]).await;
    fixture.release(&second_v2, SERVICES[1]).await;

    let released = fixture
        .service
        .get_by_service(&filters(&[("service", SERVICES[0]), ("namespace", NAMESPACE)]))
        .await;
    assert_eq!(released.code, ResultCode::ExecuteSuccess);
    assert_eq!(released.amount, 2);
    let mut keys: Vec<_> = released.items.iter().map(|item| item.rule.key()).collect();
    keys.sort();
    let mut expected = vec![first_v1.key(), second_v1.key()];
    expected.sort();
    assert_eq!(keys, expected);

    let keys = fixture
        .service
        .resolve_for_service(&ServiceRef::new(SERVICES[1], NAMESPACE))
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].version, RuleVersion::tagged("v2"));

    let none = fixture
        .service
        .resolve_for_service(&ServiceRef::new(SERVICES[2], NAMESPACE))
        .await
        .unwrap();
    assert!(none.is_empty());
}
