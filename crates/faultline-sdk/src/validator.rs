//! Request validation
//!
//! Pure functions: no I/O and no side effects. Each `validate_*` entry point
//! turns a raw request into the typed input its operation needs, or reports
//! the first offending field.

use faultline_core::{CbRule, MatchKind, MatchString, RuleVersion, ServiceRef};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ValidationError;
use crate::request::{RuleAddress, RuleRequest, ServiceTarget};

pub const MAX_NAME_LENGTH: usize = 128;
pub const MAX_OWNERS_LENGTH: usize = 1024;
pub const MAX_BUSINESS_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;

type ValidationResult<T> = std::result::Result<T, ValidationError>;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-Za-z\-._:]+$").expect("static pattern compiles"))
}

/// Content of a new master row
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub name: String,
    pub namespace: String,
    pub owners: String,
    pub business: String,
    pub description: String,
    pub enabled: bool,
    pub inbounds: Vec<CbRule>,
    pub outbounds: Vec<CbRule>,
}

/// An existing rule version plus the credential presented for it
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTarget {
    pub address: RuleAddress,
    pub version: RuleVersion,
    pub token: String,
}

/// Fields an update asks to change; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulePatch {
    pub owners: Option<String>,
    pub business: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub inbounds: Option<Vec<CbRule>>,
    pub outbounds: Option<Vec<CbRule>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTarget {
    pub target: RuleTarget,
    pub patch: RulePatch,
}

fn non_empty<'a>(field: &str, value: Option<&'a str>) -> ValidationResult<&'a str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::missing(field)),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("exceeds {} characters", max),
        ));
    }
    Ok(())
}

/// Name or namespace: `[0-9A-Za-z-._:]`, at most 128 characters
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    check_length(field, value, MAX_NAME_LENGTH)?;
    if !name_pattern().is_match(value) {
        return Err(ValidationError::new(
            field,
            "only letters, digits and -._: are allowed",
        ));
    }
    Ok(())
}

fn check_match(field: &str, matcher: &MatchString) -> ValidationResult<()> {
    if matcher.kind == MatchKind::Regex {
        Regex::new(&matcher.value)
            .map_err(|e| ValidationError::new(field, format!("bad regex: {}", e)))?;
    }
    Ok(())
}

fn check_percentage(field: &str, value: u32) -> ValidationResult<()> {
    if !(1..=100).contains(&value) {
        return Err(ValidationError::new(field, "must be between 1 and 100"));
    }
    Ok(())
}

/// Policy content: regex matchers compile, enabled thresholds are in range
pub fn validate_rules(field: &str, rules: &[CbRule]) -> ValidationResult<()> {
    for rule in rules {
        for source in &rule.sources {
            for matcher in source.labels.values() {
                check_match(field, matcher)?;
            }
        }
        for destination in &rule.destinations {
            if let Some(method) = &destination.method {
                check_match(field, method)?;
            }
            let policy = &destination.policy;
            if let Some(error_rate) = policy.error_rate.as_ref().filter(|c| c.enable) {
                check_percentage("error_rate_to_open", error_rate.error_rate_to_open)?;
            }
            if let Some(consecutive) = policy.consecutive.as_ref().filter(|c| c.enable) {
                if consecutive.consecutive_error_to_open == 0 {
                    return Err(ValidationError::new(
                        "consecutive_error_to_open",
                        "must be greater than 0",
                    ));
                }
            }
            if let Some(slow_rate) = policy.slow_rate.as_ref().filter(|c| c.enable) {
                check_percentage("slow_rate_to_open", slow_rate.slow_rate_to_open)?;
                if slow_rate.max_rt_ms == 0 {
                    return Err(ValidationError::new("max_rt_ms", "must be greater than 0"));
                }
            }
        }
    }
    Ok(())
}

fn validate_descriptive(request: &RuleRequest) -> ValidationResult<()> {
    if let Some(business) = &request.business {
        check_length("business", business, MAX_BUSINESS_LENGTH)?;
    }
    if let Some(description) = &request.description {
        check_length("description", description, MAX_DESCRIPTION_LENGTH)?;
    }
    if let Some(inbounds) = &request.inbounds {
        validate_rules("inbounds", inbounds)?;
    }
    if let Some(outbounds) = &request.outbounds {
        validate_rules("outbounds", outbounds)?;
    }
    Ok(())
}

fn validate_owners(owners: &str) -> ValidationResult<()> {
    if owners.trim().is_empty() {
        return Err(ValidationError::new("owners", "must not be empty"));
    }
    check_length("owners", owners, MAX_OWNERS_LENGTH)
}

/// Resolve how the request addresses its rule: id first, then name+namespace
pub fn validate_address(request: &RuleRequest) -> ValidationResult<RuleAddress> {
    if let Some(id) = request.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(RuleAddress::Id(id.to_string()));
    }

    match (
        request.name.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        request.namespace.as_deref().map(str::trim).filter(|v| !v.is_empty()),
    ) {
        (Some(name), Some(namespace)) => Ok(RuleAddress::Name {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }),
        _ => Err(ValidationError::new(
            "id",
            "either id or name and namespace are required",
        )),
    }
}

fn validate_token(request: &RuleRequest) -> ValidationResult<String> {
    non_empty("token", request.token.as_deref()).map(str::to_string)
}

/// Create: name, namespace and owners required; version empty or master
pub fn validate_create(request: &RuleRequest) -> ValidationResult<RuleDraft> {
    let name = non_empty("name", request.name.as_deref())?;
    let namespace = non_empty("namespace", request.namespace.as_deref())?;
    validate_name("name", name)?;
    validate_name("namespace", namespace)?;

    let owners = non_empty("owners", request.owners.as_deref())?;
    validate_owners(owners)?;

    if let Some(version) = request.version.as_deref().and_then(RuleVersion::parse) {
        if !version.is_master() {
            return Err(ValidationError::new(
                "version",
                "not allowed to create non-master version directly",
            ));
        }
    }
    validate_descriptive(request)?;

    Ok(RuleDraft {
        name: name.to_string(),
        namespace: namespace.to_string(),
        owners: owners.to_string(),
        business: request.business.clone().unwrap_or_default(),
        description: request.description.clone().unwrap_or_default(),
        enabled: request.enabled.unwrap_or(true),
        inbounds: request.inbounds.clone().unwrap_or_default(),
        outbounds: request.outbounds.clone().unwrap_or_default(),
    })
}

/// Create-version: version, addressing and token required
///
/// A `"master"` version passes here; the store rejects it as an invalid
/// version so the caller sees the version-class error code.
pub fn validate_create_version(request: &RuleRequest) -> ValidationResult<RuleTarget> {
    let version = request
        .version
        .as_deref()
        .and_then(RuleVersion::parse)
        .ok_or_else(|| ValidationError::missing("version"))?;
    if let RuleVersion::Tagged(tag) = &version {
        check_length("version", tag, MAX_NAME_LENGTH)?;
    }

    Ok(RuleTarget {
        address: validate_address(request)?,
        version,
        token: validate_token(request)?,
    })
}

/// Update: addressing and token required; owners, if present, non-empty
///
/// The version defaults to master. A non-master version passes here and is
/// rejected by the store as not editable.
pub fn validate_update(request: &RuleRequest) -> ValidationResult<UpdateTarget> {
    let address = validate_address(request)?;
    let token = validate_token(request)?;
    if let Some(owners) = &request.owners {
        validate_owners(owners)?;
    }
    validate_descriptive(request)?;

    Ok(UpdateTarget {
        target: RuleTarget {
            address,
            version: RuleVersion::parse_or_master(request.version.as_deref()),
            token,
        },
        patch: RulePatch {
            owners: request.owners.clone(),
            business: request.business.clone(),
            description: request.description.clone(),
            enabled: request.enabled,
            inbounds: request.inbounds.clone(),
            outbounds: request.outbounds.clone(),
        },
    })
}

/// Delete, release and unbind: addressing and token required, version defaults to master
pub fn validate_target(request: &RuleRequest) -> ValidationResult<RuleTarget> {
    Ok(RuleTarget {
        address: validate_address(request)?,
        version: RuleVersion::parse_or_master(request.version.as_deref()),
        token: validate_token(request)?,
    })
}

pub fn validate_service(service: &ServiceTarget) -> ValidationResult<ServiceRef> {
    let name = non_empty("service", service.name.as_deref())?;
    let namespace = non_empty("service_namespace", service.namespace.as_deref())?;
    Ok(ServiceRef::new(name, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::{CbPolicy, DestinationSet, ErrorRateConfig, SlowRateConfig};

    fn create_request() -> RuleRequest {
        RuleRequest {
            name: Some("testCbRule".to_string()),
            namespace: Some("Test".to_string()),
            owners: Some("polaris".to_string()),
            ..Default::default()
        }
    }

    fn rule_with_policy(policy: CbPolicy) -> CbRule {
        CbRule {
            sources: vec![],
            destinations: vec![DestinationSet {
                policy,
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_create_defaults() {
        let draft = validate_create(&create_request()).unwrap();
        assert_eq!(draft.name, "testCbRule");
        assert!(draft.enabled);
        assert!(draft.inbounds.is_empty());
    }

    #[test]
    fn test_create_requires_fields() {
        for field in ["name", "namespace", "owners"] {
            let mut request = create_request();
            match field {
                "name" => request.name = None,
                "namespace" => request.namespace = Some("  ".to_string()),
                _ => request.owners = Some(String::new()),
            }
            let err = validate_create(&request).unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn test_create_rejects_non_master_version() {
        let request = create_request().with_version("1.0.0");
        assert_eq!(validate_create(&request).unwrap_err().field, "version");

        assert!(validate_create(&create_request().with_version("master")).is_ok());
        assert!(validate_create(&create_request().with_version("")).is_ok());
    }

    #[test]
    fn test_name_format() {
        assert!(validate_name("name", "svc-a.b_c:1").is_ok());
        assert!(validate_name("name", "bad name").is_err());
        assert!(validate_name("name", &"a".repeat(129)).is_err());
    }

    #[test]
    fn test_length_limits() {
        let mut request = create_request();
        request.business = Some("b".repeat(65));
        assert_eq!(validate_create(&request).unwrap_err().field, "business");

        let mut request = create_request();
        request.owners = Some("o".repeat(1025));
        assert_eq!(validate_create(&request).unwrap_err().field, "owners");
    }

    #[test]
    fn test_policy_ranges() {
        let bad = rule_with_policy(CbPolicy {
            error_rate: Some(ErrorRateConfig {
                enable: true,
                request_volume_threshold: 10,
                error_rate_to_open: 0,
            }),
            ..Default::default()
        });
        assert!(validate_rules("inbounds", &[bad]).is_err());

        let disabled = rule_with_policy(CbPolicy {
            slow_rate: Some(SlowRateConfig {
                enable: false,
                max_rt_ms: 0,
                slow_rate_to_open: 0,
            }),
            ..Default::default()
        });
        assert!(validate_rules("inbounds", &[disabled]).is_ok());
    }

    #[test]
    fn test_bad_regex_matcher() {
        let mut rule = rule_with_policy(CbPolicy::default());
        rule.destinations[0].method = Some(MatchString::regex("(unclosed"));
        assert!(validate_rules("outbounds", &[rule]).is_err());
    }

    #[test]
    fn test_address_prefers_id() {
        let mut request = RuleRequest::by_name("cb", "Test");
        assert_eq!(
            validate_address(&request).unwrap(),
            RuleAddress::Name {
                name: "cb".to_string(),
                namespace: "Test".to_string()
            }
        );

        request.id = Some("r1".to_string());
        assert_eq!(
            validate_address(&request).unwrap(),
            RuleAddress::Id("r1".to_string())
        );

        assert!(validate_address(&RuleRequest::default()).is_err());
    }

    #[test]
    fn test_create_version_requires_version_and_token() {
        let request = RuleRequest::by_id("r1").with_token("t");
        assert_eq!(validate_create_version(&request).unwrap_err().field, "version");

        let request = RuleRequest::by_id("r1").with_version("v1");
        assert_eq!(validate_create_version(&request).unwrap_err().field, "token");

        let target = validate_create_version(&RuleRequest::by_id("r1").with_version("v1").with_token("t")).unwrap();
        assert_eq!(target.version, RuleVersion::tagged("v1"));
    }

    #[test]
    fn test_update_owners_present_but_empty() {
        let request = RuleRequest::by_id("r1").with_token("t").with_owners("");
        assert_eq!(validate_update(&request).unwrap_err().field, "owners");

        let update = validate_update(&RuleRequest::by_id("r1").with_token("t")).unwrap();
        assert!(update.target.version.is_master());
        assert_eq!(update.patch, RulePatch::default());
    }

    #[test]
    fn test_target_version_defaults_to_master() {
        let target = validate_target(&RuleRequest::by_id("r1").with_token("t")).unwrap();
        assert!(target.version.is_master());

        let target =
            validate_target(&RuleRequest::by_id("r1").with_token("t").with_version("v2")).unwrap();
        assert_eq!(target.version, RuleVersion::tagged("v2"));
    }

    #[test]
    fn test_service_required() {
        assert!(validate_service(&ServiceTarget::default()).is_err());
        assert_eq!(
            validate_service(&ServiceTarget::new("svc", "Test")).unwrap(),
            ServiceRef::new("svc", "Test")
        );
    }
}
