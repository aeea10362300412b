//! Unit tests for the rule and release model

use faultline_core::{
    BindingKey, CbPolicy, CbRule, CircuitBreakerRule, DestinationSet, ErrorRateConfig, Release,
    RuleKey, RuleVersion, RuleWithServices, ServiceRef,
};

fn rule_json(version: &str) -> String {
    format!(
        r#"{{
            "id": "0f3c",
            "version": "{version}",
            "name": "testCbRule",
            "namespace": "Test",
            "owners": "polaris",
            "revision": "r-1",
            "created_at": "2024-01-01T00:00:00Z",
            "modified_at": "2024-01-01T00:00:00Z"
        }}"#
    )
}

#[test]
fn test_rule_defaults_from_minimal_json() -> anyhow::Result<()> {
    let rule: CircuitBreakerRule = serde_json::from_str(&rule_json("master"))?;

    assert!(rule.is_master());
    assert!(rule.enabled);
    assert!(!rule.deleted);
    assert!(rule.inbounds.is_empty());
    assert!(rule.token.is_empty());
    assert_eq!(rule.key(), RuleKey::master("0f3c"));
    Ok(())
}

#[test]
fn test_rule_version_round_trips_through_json() -> anyhow::Result<()> {
    let rule: CircuitBreakerRule = serde_json::from_str(&rule_json("1.0.0"))?;
    assert_eq!(rule.version, RuleVersion::tagged("1.0.0"));

    let value = serde_json::to_value(&rule)?;
    assert_eq!(value["version"], "1.0.0");
    Ok(())
}

#[test]
fn test_release_key_identifies_binding() {
    let rule = RuleKey::new("0f3c", RuleVersion::tagged("v1"));
    let service = ServiceRef::new("TestService1", "Test");
    let release = Release::new(rule.clone(), service.clone(), chrono::Utc::now());

    assert_eq!(release.key(), BindingKey { rule, service });
    assert_eq!(release.service.to_string(), "Test/TestService1");
}

#[test]
fn test_rule_with_services_serialization() -> anyhow::Result<()> {
    let mut rule: CircuitBreakerRule = serde_json::from_str(&rule_json("v1"))?;
    rule.inbounds = vec![CbRule {
        sources: vec![],
        destinations: vec![DestinationSet {
            policy: CbPolicy {
                error_rate: Some(ErrorRateConfig {
                    enable: true,
                    request_volume_threshold: 10,
                    error_rate_to_open: 50,
                }),
                ..Default::default()
            },
            ..Default::default()
        }],
    }];

    let item = RuleWithServices {
        rule,
        services: vec![ServiceRef::new("svc", "Test")],
    };
    let value = serde_json::to_value(&item)?;

    assert_eq!(value["services"][0]["name"], "svc");
    assert_eq!(
        value["rule"]["inbounds"][0]["destinations"][0]["policy"]["error_rate"]["error_rate_to_open"],
        50
    );
    Ok(())
}
